//! Chart Builder Module
//! Turns aggregated tables into chart models (series, labels, colors).
//! Drawing lives in `plotter`; nothing here touches the UI.

use crate::data::{
    CombinedMonthlyView, CostMatrix, DiseaseRecord, DiseaseTable, Month, PollutionTable,
    FEMALE_COLUMN, MALE_COLUMN, MONTH_TOTAL_COLUMN,
};
use crate::stats::regression::{self, LinearFit, RegressionError};
use crate::stats::{CorrelationMatrix, StatsCalculator};
use egui::Color32;
use log::warn;
use std::sync::Once;

pub const MALE_COLOR: Color32 = Color32::from_rgb(24, 154, 180); // #189AB4
pub const FEMALE_COLOR: Color32 = Color32::from_rgb(253, 73, 160); // #FD49A0
pub const COMPUTED_TOTAL_COLOR: Color32 = Color32::from_rgb(250, 208, 44); // #FAD02C
pub const DISEASE_TOTAL_COLOR: Color32 = Color32::from_rgb(31, 119, 180); // #1f77b4
pub const POLLUTANT_COLOR: Color32 = Color32::from_rgb(214, 39, 40); // #d62728

pub const COMPUTED_TOTAL_LABEL: &str = "Total Calculado";

pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(231, 76, 60),  // Red
    Color32::from_rgb(46, 204, 113), // Green
    Color32::from_rgb(155, 89, 182), // Purple
    Color32::from_rgb(243, 156, 18), // Orange
    Color32::from_rgb(26, 188, 156), // Teal
    Color32::from_rgb(233, 30, 99),  // Pink
    Color32::from_rgb(0, 188, 212),  // Cyan
    Color32::from_rgb(255, 87, 34),  // Deep Orange
    Color32::from_rgb(121, 85, 72),  // Brown
    Color32::from_rgb(96, 125, 139), // Blue Grey
];

static TRENDLINE_UNAVAILABLE: Once = Once::new();

pub fn month_color(month: Month) -> Color32 {
    match month {
        Month::January => Color32::from_rgb(76, 114, 176), // #4c72b0
        Month::February => Color32::from_rgb(85, 168, 104), // #55a868
        Month::March => Color32::from_rgb(196, 78, 82),    // #c44e52
    }
}

/// One bar per category; `colors` is parallel to `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub name: String,
    pub values: Vec<f64>,
    pub colors: Vec<Color32>,
}

impl BarSeries {
    fn uniform(name: &str, values: Vec<f64>, color: Color32) -> Self {
        let colors = vec![color; values.len()];
        Self {
            name: name.to_string(),
            values,
            colors,
        }
    }
}

/// Bar chart; several series are drawn side by side per category.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub categories: Vec<String>,
    pub series: Vec<BarSeries>,
    pub x_label: String,
    pub y_label: String,
    pub show_legend: bool,
    pub show_values: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub name: String,
    pub color: Color32,
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub series: Vec<LineSeries>,
    /// Fixed x tick labels (value, text).
    pub x_ticks: Vec<(f64, String)>,
    pub x_label: String,
    pub y_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    pub title: String,
    pub matrix: CorrelationMatrix,
}

/// Monthly disease totals (bars) against a pollutant average (line).
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonChart {
    pub title: String,
    pub bars: BarChart,
    pub line: LineChart,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trendline {
    Fitted(LinearFit),
    /// Regression support is not compiled in.
    Unavailable,
    /// Regression ran but the data does not admit a fit.
    NotFitted(RegressionError),
}

/// Scatter of raw points, with a trendline when one could be fitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<[f64; 2]>,
    pub trendline: Trendline,
}

impl ScatterChart {
    pub fn fit(&self) -> Option<&LinearFit> {
        match &self.trendline {
            Trendline::Fitted(fit) => Some(fit),
            _ => None,
        }
    }
}

fn month_ticks() -> Vec<(f64, String)> {
    Month::ALL
        .iter()
        .map(|m| (m.index() as f64, m.key().to_string()))
        .collect()
}

/// Builds chart models from dashboard tables.
pub struct ChartBuilder;

impl ChartBuilder {
    /// Cases per disease split by sex, plus male + female.
    pub fn cases_by_sex(table: &DiseaseTable) -> BarChart {
        let column = |f: fn(&DiseaseRecord) -> i64| -> Vec<f64> {
            table.records.iter().map(|r| f(r) as f64).collect()
        };

        BarChart {
            title: format!("Casos por Sexo - {}", table.month),
            categories: table.records.iter().map(|r| r.disease.clone()).collect(),
            series: vec![
                BarSeries::uniform(MALE_COLUMN, column(|r| r.male), MALE_COLOR),
                BarSeries::uniform(FEMALE_COLUMN, column(|r| r.female), FEMALE_COLOR),
                BarSeries::uniform(
                    COMPUTED_TOTAL_LABEL,
                    column(DiseaseRecord::computed_total),
                    COMPUTED_TOTAL_COLOR,
                ),
            ],
            x_label: "Doença".to_string(),
            y_label: "Número de Casos".to_string(),
            show_legend: true,
            show_values: false,
        }
    }

    /// Ranked diseases, one color per disease.
    pub fn top_diseases(top: &[DiseaseRecord]) -> BarChart {
        BarChart {
            title: format!("Top {} Doenças Mais Frequentes no Trimestre", top.len()),
            categories: top.iter().map(|r| r.disease.clone()).collect(),
            series: vec![BarSeries {
                name: "Total".to_string(),
                values: top.iter().map(|r| r.total as f64).collect(),
                colors: (0..top.len()).map(|i| PALETTE[i % PALETTE.len()]).collect(),
            }],
            x_label: "Doença".to_string(),
            y_label: "Total".to_string(),
            show_legend: false,
            show_values: true,
        }
    }

    /// Average cost per disease, one series per month.
    pub fn cost_comparison(matrix: &CostMatrix) -> BarChart {
        BarChart {
            title: "Comparativo de Custo Médio por Doença".to_string(),
            categories: matrix.diseases.clone(),
            series: matrix
                .months
                .iter()
                .zip(matrix.costs.iter())
                .map(|(month, costs)| {
                    BarSeries::uniform(month.display_name(), costs.clone(), month_color(*month))
                })
                .collect(),
            x_label: "Doença".to_string(),
            y_label: "Custo Médio (R$)".to_string(),
            show_legend: true,
            show_values: false,
        }
    }

    /// Pollutant readings over the months, one line per pollutant present.
    pub fn pollutant_lines(pollution: &PollutionTable, names: &[String], title: &str) -> LineChart {
        let records = pollution.records();
        let series = names
            .iter()
            .enumerate()
            .filter(|(_, name)| pollution.has_column(name))
            .map(|(i, name)| LineSeries {
                name: name.clone(),
                color: PALETTE[i % PALETTE.len()],
                points: records
                    .iter()
                    .filter_map(|r| r.value(name).map(|v| [r.month.index() as f64, v]))
                    .collect(),
            })
            .collect();

        LineChart {
            title: title.to_string(),
            series,
            x_ticks: month_ticks(),
            x_label: "Mês".to_string(),
            y_label: "Concentração (ppb)".to_string(),
        }
    }

    /// Correlation heatmap across the analysis columns present in the table.
    pub fn correlation_heatmap(pollution: &PollutionTable, columns: &[String]) -> Heatmap {
        let data: Vec<(String, Vec<Option<f64>>)> = columns
            .iter()
            .filter_map(|name| Some((name.clone(), pollution.column_values(name)?)))
            .collect();

        Heatmap {
            title: "Correlação entre Poluentes e Variáveis Climáticas".to_string(),
            matrix: StatsCalculator::correlation_matrix(&data),
        }
    }

    /// Monthly disease totals next to the monthly average of `pollutant`.
    pub fn disease_vs_pollutant(view: &CombinedMonthlyView, pollutant: &str) -> Option<ComparisonChart> {
        let values = view.series(pollutant)?;
        let months = view.months();

        let bars = BarChart {
            title: String::new(),
            categories: months.iter().map(|m| m.display_name().to_string()).collect(),
            series: vec![BarSeries::uniform(
                MONTH_TOTAL_COLUMN,
                view.disease_totals(),
                DISEASE_TOTAL_COLOR,
            )],
            x_label: "Mês".to_string(),
            y_label: MONTH_TOTAL_COLUMN.to_string(),
            show_legend: true,
            show_values: false,
        };

        let line = LineChart {
            title: String::new(),
            series: vec![LineSeries {
                name: format!("{} Médio (ppb)", pollutant),
                color: POLLUTANT_COLOR,
                points: values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| [i as f64, *v])
                    .collect(),
            }],
            x_ticks: months
                .iter()
                .enumerate()
                .map(|(i, m)| (i as f64, m.display_name().to_string()))
                .collect(),
            x_label: "Mês".to_string(),
            y_label: format!("{} Médio (ppb)", pollutant),
        };

        Some(ComparisonChart {
            title: format!(
                "Comparativo: Total de Casos de Doença vs. {} Médio",
                pollutant
            ),
            bars,
            line,
        })
    }

    /// Scatter of disease totals against `pollutant`, with an OLS trendline
    /// when regression support is available.
    pub fn pollutant_scatter(view: &CombinedMonthlyView, pollutant: &str) -> Option<ScatterChart> {
        let xs = view.series(pollutant)?;
        let ys = view.disease_totals();
        let points: Vec<[f64; 2]> = xs
            .iter()
            .zip(ys.iter())
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|(x, y)| [*x, *y])
            .collect();

        let (fit_x, fit_y): (Vec<f64>, Vec<f64>) = points.iter().map(|p| (p[0], p[1])).unzip();
        let trendline = match regression::fit_ols(&fit_x, &fit_y) {
            Ok(fit) => Trendline::Fitted(fit),
            Err(RegressionError::Unavailable) => {
                TRENDLINE_UNAVAILABLE.call_once(|| {
                    warn!("Regression support not compiled in; scatter drawn without trendline")
                });
                Trendline::Unavailable
            }
            Err(err) => Trendline::NotFitted(err),
        };

        Some(ScatterChart {
            title: format!("Dispersão: Total de Casos vs. {}", pollutant),
            x_label: format!("Concentração de {}", pollutant),
            y_label: MONTH_TOTAL_COLUMN.to_string(),
            points,
            trendline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CostTable, MonthlyAggregator, TableLoader};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn record(name: &str, male: i64, female: i64, total: i64) -> DiseaseRecord {
        DiseaseRecord {
            disease: name.to_string(),
            male,
            female,
            total,
        }
    }

    fn pollution(contents: &str) -> (NamedTempFile, PollutionTable) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        let table = TableLoader::load_pollution(
            file.path(),
            &["Ozônio".to_string(), "Dióxido de Enxofre".to_string()],
            &["Temperatura".to_string()],
        )
        .unwrap();
        (file, table)
    }

    #[test]
    fn test_cases_by_sex_uses_computed_total() {
        let table = DiseaseTable {
            month: Month::February,
            records: vec![record("Gripe", 4, 5, 12), record("Dengue", 1, 2, 3)],
            dropped_rows: 0,
        };
        let chart = ChartBuilder::cases_by_sex(&table);

        assert_eq!(chart.title, "Casos por Sexo - Fevereiro");
        assert_eq!(chart.categories, vec!["Gripe", "Dengue"]);
        let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Masculino", "Feminino", "Total Calculado"]);
        assert_eq!(chart.series[2].values, vec![9.0, 3.0]);
        assert_eq!(chart.series[0].colors, vec![MALE_COLOR, MALE_COLOR]);
    }

    #[test]
    fn test_top_diseases_colors_each_bar() {
        let chart = ChartBuilder::top_diseases(&[record("Gripe", 1, 1, 24), record("Dengue", 1, 1, 21)]);
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].values, vec![24.0, 21.0]);
        assert_eq!(chart.series[0].colors, vec![PALETTE[0], PALETTE[1]]);
        assert!(!chart.show_legend);
        assert!(chart.show_values);
    }

    #[test]
    fn test_cost_comparison_series_per_month() {
        let tables: Vec<CostTable> = Month::ALL
            .iter()
            .map(|m| {
                let mut file = NamedTempFile::new().unwrap();
                writeln!(file, "Dengue;{},0", m.index() * 10).unwrap();
                file.flush().unwrap();
                TableLoader::load_cost(file.path(), *m).unwrap()
            })
            .collect();
        let matrix = MonthlyAggregator::merge_costs(&tables).unwrap();
        let chart = ChartBuilder::cost_comparison(&matrix);

        assert_eq!(chart.series.len(), 3);
        assert_eq!(chart.series[2].name, "Março");
        assert_eq!(chart.series[2].values, vec![30.0]);
        assert_eq!(chart.series[0].colors[0], month_color(Month::January));
        assert_eq!(chart.y_label, "Custo Médio (R$)");
    }

    #[test]
    fn test_pollutant_lines_skip_missing_columns() {
        let (_file, table) = pollution("Mes,Ozônio,Temperatura\nfevereiro,25,28\njaneiro,20,30\n");
        let chart = ChartBuilder::pollutant_lines(
            &table,
            &["Ozônio".to_string(), "Dióxido de Enxofre".to_string()],
            "Evolução",
        );

        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].points, vec![[1.0, 20.0], [2.0, 25.0]]);
        assert_eq!(chart.x_ticks[2], (3.0, "março".to_string()));
    }

    #[test]
    fn test_correlation_heatmap_over_present_columns() {
        let (_file, table) = pollution(
            "Mes,Ozônio,Dióxido de Enxofre,Temperatura\n\
             janeiro,20,1,30\n\
             fevereiro,25,2,28\n\
             março,30,3,26\n",
        );
        let heatmap = ChartBuilder::correlation_heatmap(
            &table,
            &[
                "Ozônio".to_string(),
                "Temperatura".to_string(),
                "Umidade Relativa".to_string(),
            ],
        );

        assert_eq!(heatmap.matrix.labels, vec!["Ozônio", "Temperatura"]);
        let r = heatmap.matrix.get("Ozônio", "Temperatura").unwrap();
        assert!((r + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_scatter_and_comparison_from_view() {
        let tables: Vec<DiseaseTable> = [(Month::January, 15), (Month::February, 14), (Month::March, 19)]
            .iter()
            .map(|(m, total)| DiseaseTable {
                month: *m,
                records: vec![record("Gripe", 0, 0, *total)],
                dropped_rows: 0,
            })
            .collect();
        let long = MonthlyAggregator::combine(&tables).unwrap();
        let (_file, table) = pollution("Mes,Ozônio\njaneiro,20\nfevereiro,25\nmarço,30\n");
        let view = crate::data::CrossJoinEngine::combine(
            Some(&long),
            Some(&table),
            &["Ozônio".to_string()],
        )
        .unwrap();

        let scatter = ChartBuilder::pollutant_scatter(&view, "Ozônio").unwrap();
        assert_eq!(scatter.points, vec![[20.0, 15.0], [25.0, 14.0], [30.0, 19.0]]);
        if regression::is_available() {
            let fit = scatter.fit().unwrap();
            assert!((fit.slope - 0.4).abs() < 1e-9);
        } else {
            assert_eq!(scatter.trendline, Trendline::Unavailable);
        }

        let comparison = ChartBuilder::disease_vs_pollutant(&view, "Ozônio").unwrap();
        assert_eq!(
            comparison.bars.categories,
            vec!["Janeiro", "Fevereiro", "Março"]
        );
        assert_eq!(comparison.bars.series[0].values, vec![15.0, 14.0, 19.0]);
        assert_eq!(comparison.line.series[0].points[2], [2.0, 30.0]);

        assert!(ChartBuilder::pollutant_scatter(&view, "Monóxido de Carbono").is_none());
    }
}
