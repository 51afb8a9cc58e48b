//! Table Loader Module
//! Reads the semicolon-delimited disease/cost files and the pollution CSV
//! using Polars, then normalizes names and numeric fields.

use crate::data::month::{Month, INDEX_COLUMN, KEY_COLUMN};
use log::{debug, info, warn};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DISEASE_COLUMN: &str = "Doença";
pub const MALE_COLUMN: &str = "Masculino";
pub const FEMALE_COLUMN: &str = "Feminino";
pub const TOTAL_COLUMN: &str = "Total";
pub const COST_COLUMN: &str = "Custo Médio";

const DISEASE_SCHEMA: [&str; 4] = [DISEASE_COLUMN, MALE_COLUMN, FEMALE_COLUMN, TOTAL_COLUMN];
const COST_SCHEMA: [&str; 2] = [DISEASE_COLUMN, COST_COLUMN];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("file '{}' not found", .0.display())]
    FileNotFound(PathBuf),
    #[error("file '{}' is empty", .0.display())]
    Empty(PathBuf),
    #[error("failed to read CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("'{}' has {found} columns, expected {expected}", path.display())]
    SchemaMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("column '{column}' missing from '{}'", path.display())]
    MissingColumn { column: String, path: PathBuf },
}

/// One row of a monthly disease file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseRecord {
    pub disease: String,
    pub male: i64,
    pub female: i64,
    /// Total as given by the source, not necessarily male + female.
    pub total: i64,
}

impl DiseaseRecord {
    /// Male + female, shown next to the source total.
    pub fn computed_total(&self) -> i64 {
        self.male + self.female
    }
}

/// Disease records of a single month, in file order.
#[derive(Debug, Clone)]
pub struct DiseaseTable {
    pub month: Month,
    pub records: Vec<DiseaseRecord>,
    pub dropped_rows: usize,
}

impl DiseaseTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Columns: Doença, Masculino, Feminino, Total.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let names: Vec<&str> = self.records.iter().map(|r| r.disease.as_str()).collect();
        let male: Vec<i64> = self.records.iter().map(|r| r.male).collect();
        let female: Vec<i64> = self.records.iter().map(|r| r.female).collect();
        let total: Vec<i64> = self.records.iter().map(|r| r.total).collect();

        DataFrame::new(vec![
            Column::new(DISEASE_COLUMN.into(), names),
            Column::new(MALE_COLUMN.into(), male),
            Column::new(FEMALE_COLUMN.into(), female),
            Column::new(TOTAL_COLUMN.into(), total),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostRecord {
    pub disease: String,
    pub average_cost: f64,
}

/// Average hospitalization cost per disease for one month.
#[derive(Debug, Clone)]
pub struct CostTable {
    pub month: Month,
    pub records: Vec<CostRecord>,
    pub dropped_rows: usize,
}

impl CostTable {
    /// Columns: Doença, <month display name>.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let names: Vec<&str> = self.records.iter().map(|r| r.disease.as_str()).collect();
        let costs: Vec<f64> = self.records.iter().map(|r| r.average_cost).collect();

        DataFrame::new(vec![
            Column::new(DISEASE_COLUMN.into(), names),
            Column::new(self.month.display_name().into(), costs),
        ])
    }
}

/// One row of the pollution file.
#[derive(Debug, Clone, PartialEq)]
pub struct PollutionRecord {
    pub month: Month,
    pub pollutants: BTreeMap<String, f64>,
    pub climate: BTreeMap<String, f64>,
}

impl PollutionRecord {
    /// Reading of a pollutant or climate variable, if present in this row.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.pollutants
            .get(name)
            .or_else(|| self.climate.get(name))
            .copied()
    }
}

/// Pollution readings sorted by calendar month.
///
/// The frame keeps the lowercase `Mes` key, a `Mes_num` index and every
/// known pollutant/climate column found in the file as Float64.
#[derive(Debug, Clone)]
pub struct PollutionTable {
    df: DataFrame,
    pollutants: Vec<String>,
    climate: Vec<String>,
}

impl PollutionTable {
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Known pollutant columns present in the file, in configured order.
    pub fn pollutants(&self) -> &[String] {
        &self.pollutants
    }

    /// Known climate columns present in the file, in configured order.
    pub fn climate_variables(&self) -> &[String] {
        &self.climate
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.pollutants.iter().chain(self.climate.iter()).any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn months(&self) -> Vec<Month> {
        self.df
            .column(INDEX_COLUMN)
            .ok()
            .and_then(|col| col.i32().ok())
            .map(|ca| ca.into_iter().flatten().filter_map(Month::from_index).collect())
            .unwrap_or_default()
    }

    /// Raw values of a numeric column, one per row; `None` for nulls.
    pub fn column_values(&self, name: &str) -> Option<Vec<Option<f64>>> {
        if !self.has_column(name) {
            return None;
        }
        let ca = self.df.column(name).ok()?.f64().ok()?;
        Some(ca.into_iter().collect())
    }

    pub fn records(&self) -> Vec<PollutionRecord> {
        let months = self.months();
        let read = |names: &[String]| -> Vec<Vec<Option<f64>>> {
            names
                .iter()
                .map(|n| self.column_values(n).unwrap_or_default())
                .collect()
        };
        let pollutant_values = read(&self.pollutants);
        let climate_values = read(&self.climate);

        let collect_row = |names: &[String], values: &[Vec<Option<f64>>], row: usize| {
            names
                .iter()
                .zip(values)
                .filter_map(|(name, col)| col.get(row).copied().flatten().map(|v| (name.clone(), v)))
                .collect::<BTreeMap<_, _>>()
        };

        months
            .into_iter()
            .enumerate()
            .map(|(row, month)| PollutionRecord {
                month,
                pollutants: collect_row(&self.pollutants, &pollutant_values, row),
                climate: collect_row(&self.climate, &climate_values, row),
            })
            .collect()
    }
}

/// Parse a decimal that may use a comma as separator ("12,5" -> 12.5).
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a non-negative case count. Integral decimals ("12.0") are accepted.
pub fn parse_count(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return (value >= 0).then_some(value);
    }
    parse_decimal(trimmed)
        .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= i64::MAX as f64)
        .map(|v| v as i64)
}

/// Loads the dashboard input files.
pub struct TableLoader;

impl TableLoader {
    /// Load a monthly disease file (`Doença;Masculino;Feminino;Total`, no header).
    pub fn load_disease(path: &Path, month: Month) -> Result<DiseaseTable, LoadError> {
        let raw = Self::read_semicolon_file(path, &DISEASE_SCHEMA)?;
        let cells = Self::string_columns(&raw, DISEASE_SCHEMA.len())?;

        let mut records = Vec::with_capacity(raw.height());
        let mut dropped_rows = 0;

        for row in 0..raw.height() {
            let cell = |c: usize| cells[c].get(row).unwrap_or("");
            let disease = cell(0).trim();
            let parsed = (
                parse_count(cell(1)),
                parse_count(cell(2)),
                parse_count(cell(3)),
            );

            match parsed {
                (Some(male), Some(female), Some(total)) if !disease.is_empty() => {
                    records.push(DiseaseRecord {
                        disease: disease.to_string(),
                        male,
                        female,
                        total,
                    });
                }
                _ => dropped_rows += 1,
            }
        }

        if dropped_rows > 0 {
            warn!(
                "{}: dropped {} row(s) with unparsable counts",
                path.display(),
                dropped_rows
            );
        }
        info!(
            "Loaded {} disease rows for {} from {}",
            records.len(),
            month,
            path.display()
        );

        Ok(DiseaseTable {
            month,
            records,
            dropped_rows,
        })
    }

    /// Load a monthly cost file (`Doença;Custo Médio`, no header).
    pub fn load_cost(path: &Path, month: Month) -> Result<CostTable, LoadError> {
        let raw = Self::read_semicolon_file(path, &COST_SCHEMA)?;
        let cells = Self::string_columns(&raw, COST_SCHEMA.len())?;

        let mut records = Vec::with_capacity(raw.height());
        let mut dropped_rows = 0;

        for row in 0..raw.height() {
            let disease = cells[0].get(row).unwrap_or("").trim();
            let cost = cells[1].get(row).and_then(parse_decimal);

            match cost {
                Some(average_cost) if !disease.is_empty() => records.push(CostRecord {
                    disease: disease.to_string(),
                    average_cost,
                }),
                _ => dropped_rows += 1,
            }
        }

        if dropped_rows > 0 {
            debug!(
                "{}: dropped {} row(s) with unparsable cost",
                path.display(),
                dropped_rows
            );
        }

        Ok(CostTable {
            month,
            records,
            dropped_rows,
        })
    }

    /// Load the comma-delimited pollution file (header row required).
    pub fn load_pollution(
        path: &Path,
        pollutant_columns: &[String],
        climate_columns: &[String],
    ) -> Result<PollutionTable, LoadError> {
        Self::ensure_readable(path)?;

        let mut raw = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        let trimmed: Vec<String> = raw
            .get_column_names()
            .iter()
            .map(|name| name.trim().to_string())
            .collect();
        raw.set_column_names(trimmed.iter().map(|s| s.as_str()))?;

        let month_col = raw
            .column(KEY_COLUMN)
            .map_err(|_| LoadError::MissingColumn {
                column: KEY_COLUMN.to_string(),
                path: path.to_path_buf(),
            })?
            .cast(&DataType::String)?;

        let months: Vec<Option<Month>> = month_col
            .str()?
            .into_iter()
            .map(|value| value.and_then(Month::from_key))
            .collect();

        let unknown = months.iter().filter(|m| m.is_none()).count();
        if unknown > 0 {
            warn!(
                "{}: ignoring {} row(s) with a month outside {:?}",
                path.display(),
                unknown,
                Month::ALL.map(|m| m.key())
            );
        }

        let mask: BooleanChunked = months.iter().map(|m| m.is_some()).collect();
        let kept: Vec<Month> = months.into_iter().flatten().collect();

        let mut df = raw.filter(&mask)?;
        df.with_column(Column::new(
            KEY_COLUMN.into(),
            kept.iter().map(|m| m.key()).collect::<Vec<_>>(),
        ))?;
        df.with_column(Column::new(
            INDEX_COLUMN.into(),
            kept.iter().map(|m| m.index()).collect::<Vec<_>>(),
        ))?;

        let present = |wanted: &[String]| -> Vec<String> {
            wanted
                .iter()
                .filter(|name| trimmed.iter().any(|t| t == *name))
                .cloned()
                .collect()
        };
        let pollutants = present(pollutant_columns);
        let climate = present(climate_columns);

        for name in pollutants.iter().chain(climate.iter()) {
            let values = df.column(name)?.cast(&DataType::Float64)?;
            df.with_column(values)?;
        }

        let missing: Vec<&String> = pollutant_columns
            .iter()
            .chain(climate_columns.iter())
            .filter(|name| !trimmed.contains(name))
            .collect();
        if !missing.is_empty() {
            warn!("{}: columns not found: {:?}", path.display(), missing);
        }

        let df = df.sort(
            [INDEX_COLUMN],
            SortMultipleOptions::default().with_maintain_order(true),
        )?;

        info!(
            "Loaded {} pollution rows ({} pollutants, {} climate variables) from {}",
            df.height(),
            pollutants.len(),
            climate.len(),
            path.display()
        );

        Ok(PollutionTable {
            df,
            pollutants,
            climate,
        })
    }

    fn ensure_readable(path: &Path) -> Result<(), LoadError> {
        let metadata =
            std::fs::metadata(path).map_err(|_| LoadError::FileNotFound(path.to_path_buf()))?;
        if !metadata.is_file() {
            return Err(LoadError::FileNotFound(path.to_path_buf()));
        }
        if metadata.len() == 0 {
            return Err(LoadError::Empty(path.to_path_buf()));
        }
        Ok(())
    }

    /// Read a header-less `;` file with every cell as text.
    fn read_semicolon_file(path: &Path, schema: &[&str]) -> Result<DataFrame, LoadError> {
        Self::ensure_readable(path)?;

        let df = CsvReadOptions::default()
            .with_has_header(false)
            .with_infer_schema_length(Some(0))
            .map_parse_options(|opts| opts.with_separator(b';'))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        if df.width() < schema.len() {
            return Err(LoadError::SchemaMismatch {
                path: path.to_path_buf(),
                expected: schema.len(),
                found: df.width(),
            });
        }
        debug!(
            "{}: read {} rows x {} columns",
            path.display(),
            df.height(),
            df.width()
        );
        Ok(df)
    }

    /// First `n` columns as text chunked arrays.
    fn string_columns(df: &DataFrame, n: usize) -> Result<Vec<StringChunked>, LoadError> {
        df.get_columns()
            .iter()
            .take(n)
            .map(|col| Ok(col.cast(&DataType::String)?.str()?.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fixture(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn pollution_columns() -> (Vec<String>, Vec<String>) {
        (
            vec!["Ozônio".to_string(), "Dióxido de Enxofre".to_string()],
            vec!["Temperatura".to_string()],
        )
    }

    #[test]
    fn test_parse_decimal_accepts_comma() {
        assert_eq!(parse_decimal("12,5"), Some(12.5));
        assert_eq!(parse_decimal(" 3.25 "), Some(3.25));
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("nan"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(" 42 "), Some(42));
        assert_eq!(parse_count("7,0"), Some(7));
        assert_eq!(parse_count("7,5"), None);
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("x"), None);
    }

    #[test]
    fn test_load_disease_trims_names_and_drops_bad_rows() {
        let file = write_fixture("  Gripe ;4;6;10\nDengue;2;3;5\nCovid;x;1;2\n Asma;1;1;3\n");
        let table = TableLoader::load_disease(file.path(), Month::January).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.dropped_rows, 1);
        let names: Vec<&str> = table.records.iter().map(|r| r.disease.as_str()).collect();
        assert_eq!(names, vec!["Gripe", "Dengue", "Asma"]);
        assert!(names.iter().all(|n| n.trim() == *n));

        // Total comes from the file, not from male + female.
        let asma = &table.records[2];
        assert_eq!(asma.total, 3);
        assert_eq!(asma.computed_total(), 2);
    }

    #[test]
    fn test_load_disease_frame_has_schema_columns() {
        let file = write_fixture("Gripe;4;6;10\n");
        let table = TableLoader::load_disease(file.path(), Month::February).unwrap();
        let df = table.to_frame().unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, DISEASE_SCHEMA.map(String::from).to_vec());
    }

    #[test]
    fn test_load_disease_missing_file() {
        let err = TableLoader::load_disease(Path::new("does/not/exist.txt"), Month::March)
            .unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound(_)));
    }

    #[test]
    fn test_load_disease_schema_mismatch() {
        let file = write_fixture("Gripe;4\nDengue;2\n");
        let err = TableLoader::load_disease(file.path(), Month::January).unwrap_err();
        assert!(matches!(
            err,
            LoadError::SchemaMismatch {
                expected: 4,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_load_cost_with_decimal_comma() {
        let file = write_fixture("Gripe;1234,56\nDengue ;abc\nCovid;99.5\n");
        let table = TableLoader::load_cost(file.path(), Month::January).unwrap();

        assert_eq!(table.dropped_rows, 1);
        assert_eq!(
            table.records,
            vec![
                CostRecord {
                    disease: "Gripe".to_string(),
                    average_cost: 1234.56
                },
                CostRecord {
                    disease: "Covid".to_string(),
                    average_cost: 99.5
                },
            ]
        );
        let df = table.to_frame().unwrap();
        assert!(df.column("Janeiro").is_ok());
    }

    #[test]
    fn test_load_pollution_sorts_and_filters_months() {
        let file = write_fixture(
            "Mes,Ozônio,Dióxido de Enxofre,Temperatura\n\
             março,30,1.5,27\n\
             Janeiro,20,2.5,29\n\
             abril,99,9,9\n\
             fevereiro,25,2,28\n",
        );
        let (pollutants, climate) = pollution_columns();
        let table = TableLoader::load_pollution(file.path(), &pollutants, &climate).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.months(),
            vec![Month::January, Month::February, Month::March]
        );
        assert_eq!(
            table.column_values("Ozônio").unwrap(),
            vec![Some(20.0), Some(25.0), Some(30.0)]
        );

        let records = table.records();
        assert_eq!(records[0].pollutants["Dióxido de Enxofre"], 2.5);
        assert_eq!(records[2].climate["Temperatura"], 27.0);
    }

    #[test]
    fn test_load_pollution_reports_only_present_columns() {
        let file = write_fixture("Mes,Ozônio\njaneiro,20\n");
        let (pollutants, climate) = pollution_columns();
        let table = TableLoader::load_pollution(file.path(), &pollutants, &climate).unwrap();

        assert_eq!(table.pollutants(), &["Ozônio".to_string()]);
        assert!(table.climate_variables().is_empty());
        assert!(!table.has_column("Temperatura"));
        assert!(table.column_values("Temperatura").is_none());
    }

    #[test]
    fn test_load_pollution_requires_month_column() {
        let file = write_fixture("Mês,Ozônio\njaneiro,20\n");
        let (pollutants, climate) = pollution_columns();
        let err = TableLoader::load_pollution(file.path(), &pollutants, &climate).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "Mes"));
    }

    #[test]
    fn test_load_empty_file() {
        let file = write_fixture("");
        let err = TableLoader::load_cost(file.path(), Month::January).unwrap_err();
        assert!(matches!(err, LoadError::Empty(_)));
    }
}
