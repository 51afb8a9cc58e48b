//! Monthly Aggregator Module
//! Combines per-month disease tables into one long-form table and derives
//! per-disease totals, rankings, monthly summaries and the cost comparison.

use crate::data::loader::{
    CostTable, DiseaseRecord, DiseaseTable, DISEASE_COLUMN, FEMALE_COLUMN, MALE_COLUMN,
    TOTAL_COLUMN,
};
use crate::data::month::{Month, DISPLAY_COLUMN};
use log::{debug, info};
use polars::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

/// Summed Total per month.
pub const MONTH_TOTAL_COLUMN: &str = "Total de Casos de Doença";

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("no monthly table was loaded")]
    NoData,
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Sex reported as most affected in a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn label(self) -> &'static str {
        match self {
            Sex::Male => MALE_COLUMN,
            Sex::Female => FEMALE_COLUMN,
        }
    }
}

/// Short per-month analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthSummary {
    pub month: Month,
    pub top_diseases: Vec<String>,
    pub male_cases: i64,
    pub female_cases: i64,
    pub difference: i64,
    pub majority: Sex,
}

impl MonthSummary {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!(
                "As {} doenças com maior número de casos são: {}.",
                self.top_diseases.len(),
                self.top_diseases.join(", ")
            ),
            format!(
                "O sexo mais afetado foi: {}, com uma diferença de {} casos.",
                self.majority.label(),
                self.difference
            ),
        ]
    }
}

/// All loaded months stacked, with a `Mês` column on every row.
#[derive(Debug, Clone)]
pub struct LongFormTable {
    df: DataFrame,
}

impl LongFormTable {
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }
}

/// Average cost per disease and month, restricted to diseases present in
/// every loaded month.
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    pub months: Vec<Month>,
    pub diseases: Vec<String>,
    /// `costs[m][d]` is the cost of `diseases[d]` in `months[m]`.
    pub costs: Vec<Vec<f64>>,
}

impl CostMatrix {
    pub fn cost(&self, month: Month, disease: &str) -> Option<f64> {
        let m = self.months.iter().position(|x| *x == month)?;
        let d = self.diseases.iter().position(|x| x == disease)?;
        self.costs.get(m)?.get(d).copied()
    }
}

/// Group-by and ranking operations over monthly disease tables.
pub struct MonthlyAggregator;

impl MonthlyAggregator {
    /// Stack the monthly tables, tagging each row with its month.
    pub fn combine(tables: &[DiseaseTable]) -> Result<LongFormTable, AggregateError> {
        if tables.is_empty() {
            return Err(AggregateError::NoData);
        }

        let frames = tables
            .iter()
            .map(|table| {
                Ok(table
                    .to_frame()?
                    .lazy()
                    .with_column(lit(table.month.display_name()).alias(DISPLAY_COLUMN)))
            })
            .collect::<PolarsResult<Vec<LazyFrame>>>()?;

        let df = concat(frames, UnionArgs::default())?.collect()?;
        info!("Combined {} months into {} rows", tables.len(), df.height());
        Ok(LongFormTable { df })
    }

    /// Masculino/Feminino/Total summed per disease, in first-appearance order.
    pub fn totals_by_disease(long: &LongFormTable) -> Result<Vec<DiseaseRecord>, AggregateError> {
        let df = Self::disease_totals_lazy(long).collect()?;
        Self::records_from_frame(&df)
    }

    /// The `k` diseases with the highest summed Total. Ties keep the order in
    /// which diseases first appear.
    pub fn top_k(long: &LongFormTable, k: usize) -> Result<Vec<DiseaseRecord>, AggregateError> {
        let df = Self::disease_totals_lazy(long)
            .sort(
                [TOTAL_COLUMN],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_maintain_order(true),
            )
            .limit(k as IdxSize)
            .collect()?;
        Self::records_from_frame(&df)
    }

    /// Columns: Mês, Total de Casos de Doença.
    pub fn monthly_totals(long: &LongFormTable) -> Result<DataFrame, AggregateError> {
        let df = long
            .df
            .clone()
            .lazy()
            .group_by_stable([col(DISPLAY_COLUMN)])
            .agg([col(TOTAL_COLUMN).sum().alias(MONTH_TOTAL_COLUMN)])
            .collect()?;
        debug!("Monthly totals:\n{}", df);
        Ok(df)
    }

    /// Top diseases and sex balance for a single month.
    pub fn summarize_month(table: &DiseaseTable, top_n: usize) -> MonthSummary {
        let mut ranked: Vec<&DiseaseRecord> = table.records.iter().collect();
        // `sort_by` is stable: equal totals stay in file order.
        ranked.sort_by(|a, b| b.total.cmp(&a.total));

        let male_cases: i64 = table.records.iter().map(|r| r.male).sum();
        let female_cases: i64 = table.records.iter().map(|r| r.female).sum();
        // Female wins ties.
        let majority = if male_cases > female_cases {
            Sex::Male
        } else {
            Sex::Female
        };

        MonthSummary {
            month: table.month,
            top_diseases: ranked
                .into_iter()
                .take(top_n)
                .map(|r| r.disease.clone())
                .collect(),
            male_cases,
            female_cases,
            difference: (male_cases - female_cases).abs(),
            majority,
        }
    }

    /// Inner-join the monthly cost tables on disease name.
    pub fn merge_costs(tables: &[CostTable]) -> Result<CostMatrix, AggregateError> {
        let (first, rest) = tables.split_first().ok_or(AggregateError::NoData)?;

        let mut merged = first.to_frame()?.lazy();
        for table in rest {
            merged = merged.join(
                table.to_frame()?.lazy(),
                [col(DISEASE_COLUMN)],
                [col(DISEASE_COLUMN)],
                JoinArgs::new(JoinType::Inner),
            );
        }
        let df = merged.collect()?;

        // Join output order is not guaranteed; restore the first file's order.
        let first_seen: HashMap<&str, usize> = first
            .records
            .iter()
            .enumerate()
            .rev()
            .map(|(i, r)| (r.disease.as_str(), i))
            .collect();

        let diseases = df.column(DISEASE_COLUMN)?.str()?;
        let mut order: Vec<usize> = (0..df.height()).collect();
        order.sort_by_key(|&row| {
            diseases
                .get(row)
                .and_then(|d| first_seen.get(d).copied())
                .unwrap_or(usize::MAX)
        });

        let months: Vec<Month> = tables.iter().map(|t| t.month).collect();
        let mut costs = Vec::with_capacity(months.len());
        for month in &months {
            let values = df.column(month.display_name())?.f64()?;
            costs.push(
                order
                    .iter()
                    .map(|&row| values.get(row).unwrap_or(f64::NAN))
                    .collect(),
            );
        }

        let matrix = CostMatrix {
            diseases: order
                .iter()
                .map(|&row| diseases.get(row).unwrap_or_default().to_string())
                .collect(),
            months,
            costs,
        };
        info!(
            "Cost comparison: {} disease(s) present in all {} month(s)",
            matrix.diseases.len(),
            matrix.months.len()
        );
        Ok(matrix)
    }

    fn disease_totals_lazy(long: &LongFormTable) -> LazyFrame {
        long.df
            .clone()
            .lazy()
            .group_by_stable([col(DISEASE_COLUMN)])
            .agg([
                col(MALE_COLUMN).sum(),
                col(FEMALE_COLUMN).sum(),
                col(TOTAL_COLUMN).sum(),
            ])
    }

    fn records_from_frame(df: &DataFrame) -> Result<Vec<DiseaseRecord>, AggregateError> {
        let names = df.column(DISEASE_COLUMN)?.str()?;
        let male = df.column(MALE_COLUMN)?.i64()?;
        let female = df.column(FEMALE_COLUMN)?.i64()?;
        let total = df.column(TOTAL_COLUMN)?.i64()?;

        Ok((0..df.height())
            .filter_map(|i| {
                Some(DiseaseRecord {
                    disease: names.get(i)?.to_string(),
                    male: male.get(i)?,
                    female: female.get(i)?,
                    total: total.get(i)?,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::CostRecord;

    fn record(name: &str, male: i64, female: i64, total: i64) -> DiseaseRecord {
        DiseaseRecord {
            disease: name.to_string(),
            male,
            female,
            total,
        }
    }

    fn table(month: Month, records: Vec<DiseaseRecord>) -> DiseaseTable {
        DiseaseTable {
            month,
            records,
            dropped_rows: 0,
        }
    }

    fn costs(month: Month, names: &[&str]) -> CostTable {
        CostTable {
            month,
            records: names
                .iter()
                .enumerate()
                .map(|(i, n)| CostRecord {
                    disease: n.to_string(),
                    average_cost: 100.0 * (i + 1) as f64 + month.index() as f64,
                })
                .collect(),
            dropped_rows: 0,
        }
    }

    fn quarter() -> Vec<DiseaseTable> {
        vec![
            table(
                Month::January,
                vec![record("Gripe", 6, 4, 10), record("Dengue", 2, 3, 5)],
            ),
            table(
                Month::February,
                vec![record("Gripe", 4, 4, 8), record("Dengue", 3, 4, 7)],
            ),
            table(
                Month::March,
                vec![record("Gripe", 3, 3, 6), record("Dengue", 5, 4, 9)],
            ),
        ]
    }

    #[test]
    fn test_combine_tags_rows_with_month() {
        let long = MonthlyAggregator::combine(&quarter()).unwrap();
        assert_eq!(long.df.height(), 6);

        let months: Vec<&str> = long
            .df
            .column(DISPLAY_COLUMN)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(
            months,
            vec!["Janeiro", "Janeiro", "Fevereiro", "Fevereiro", "Março", "Março"]
        );
    }

    #[test]
    fn test_combine_without_tables() {
        assert!(matches!(
            MonthlyAggregator::combine(&[]),
            Err(AggregateError::NoData)
        ));
    }

    #[test]
    fn test_totals_by_disease() {
        let long = MonthlyAggregator::combine(&quarter()).unwrap();
        let totals = MonthlyAggregator::totals_by_disease(&long).unwrap();
        assert_eq!(
            totals,
            vec![record("Gripe", 13, 11, 24), record("Dengue", 10, 11, 21)]
        );
    }

    #[test]
    fn test_top_k_is_stable_for_ties() {
        let tables = vec![
            table(
                Month::January,
                vec![
                    record("Asma", 1, 1, 3),
                    record("Gripe", 5, 5, 10),
                    record("Covid", 1, 1, 3),
                    record("Dengue", 2, 2, 3),
                    record("Zika", 1, 0, 1),
                    record("Sarampo", 0, 0, 0),
                ],
            ),
            table(Month::February, vec![record("Zika", 1, 1, 2)]),
        ];
        let long = MonthlyAggregator::combine(&tables).unwrap();
        let top: Vec<String> = MonthlyAggregator::top_k(&long, 5)
            .unwrap()
            .into_iter()
            .map(|r| r.disease)
            .collect();

        assert_eq!(top, vec!["Gripe", "Asma", "Covid", "Dengue", "Zika"]);
    }

    #[test]
    fn test_monthly_totals() {
        let long = MonthlyAggregator::combine(&quarter()).unwrap();
        let df = MonthlyAggregator::monthly_totals(&long).unwrap();
        let totals: Vec<i64> = df
            .column(MONTH_TOTAL_COLUMN)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(totals, vec![15, 15, 15]);
    }

    #[test]
    fn test_summarize_month() {
        let jan = table(
            Month::January,
            vec![
                record("Gripe", 6, 4, 10),
                record("Dengue", 2, 3, 5),
                record("Asma", 1, 1, 5),
                record("Covid", 9, 0, 9),
            ],
        );
        let summary = MonthlyAggregator::summarize_month(&jan, 3);

        assert_eq!(summary.top_diseases, vec!["Gripe", "Covid", "Dengue"]);
        assert_eq!(summary.male_cases, 18);
        assert_eq!(summary.female_cases, 8);
        assert_eq!(summary.difference, 10);
        assert_eq!(summary.majority, Sex::Male);
        assert!(summary.lines()[1].contains("Masculino"));
    }

    #[test]
    fn test_summarize_month_tie_goes_to_female() {
        let feb = table(
            Month::February,
            vec![record("Gripe", 3, 2, 5), record("Dengue", 2, 3, 5)],
        );
        let summary = MonthlyAggregator::summarize_month(&feb, 3);
        assert_eq!(summary.difference, 0);
        assert_eq!(summary.majority, Sex::Female);
    }

    #[test]
    fn test_merge_costs_keeps_diseases_in_every_month() {
        let tables = vec![
            costs(Month::January, &["Gripe", "Dengue"]),
            costs(Month::February, &["Dengue", "Covid"]),
            costs(Month::March, &["Dengue"]),
        ];
        let matrix = MonthlyAggregator::merge_costs(&tables).unwrap();

        assert_eq!(matrix.diseases, vec!["Dengue"]);
        assert_eq!(
            matrix.months,
            vec![Month::January, Month::February, Month::March]
        );
        assert_eq!(matrix.cost(Month::January, "Dengue"), Some(201.0));
        assert_eq!(matrix.cost(Month::February, "Dengue"), Some(102.0));
        assert_eq!(matrix.cost(Month::March, "Dengue"), Some(103.0));
    }

    #[test]
    fn test_merge_costs_keeps_first_month_order() {
        let tables = vec![
            costs(Month::January, &["Gripe", "Asma", "Dengue"]),
            costs(Month::February, &["Dengue", "Gripe", "Asma"]),
        ];
        let matrix = MonthlyAggregator::merge_costs(&tables).unwrap();
        assert_eq!(matrix.diseases, vec!["Gripe", "Asma", "Dengue"]);
    }

    #[test]
    fn test_merge_costs_without_tables() {
        assert!(matches!(
            MonthlyAggregator::merge_costs(&[]),
            Err(AggregateError::NoData)
        ));
    }
}
