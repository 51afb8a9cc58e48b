//! Dashboard assembly
//! Loads every input once, then builds each section in a fixed order.
//! A failing section records its error and the next one still runs.

use crate::charts::{
    BarChart, ChartBuilder, ComparisonChart, Heatmap, LineChart, ScatterChart, Trendline,
};
use crate::config::DashboardConfig;
use crate::data::{
    AggregateError, CombinedMonthlyView, CostTable, CrossJoinEngine, DiseaseTable, JoinError,
    LoadError, LongFormTable, Month, MonthSummary, MonthlyAggregator, PollutionTable,
    TableLoader, MONTH_TOTAL_COLUMN,
};
use crate::stats::{CorrelationResult, StatsCalculator, StatsError};
use anyhow::anyhow;
use log::{error, info, warn};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Error, Debug)]
pub enum SectionError {
    #[error("{0}")]
    Load(String),
    #[error("O arquivo '{}' não foi encontrado.", .0.display())]
    MissingFile(PathBuf),
    #[error("{0}")]
    InsufficientData(String),
    #[error("Ocorreu um erro inesperado: {0:#}")]
    Unexpected(anyhow::Error),
}

impl SectionError {
    pub fn severity(&self) -> Severity {
        match self {
            SectionError::Load(_) => Severity::Warning,
            SectionError::InsufficientData(_) => Severity::Info,
            SectionError::MissingFile(_) | SectionError::Unexpected(_) => Severity::Error,
        }
    }

    fn from_load(err: &LoadError) -> Self {
        match err {
            LoadError::FileNotFound(path) => SectionError::MissingFile(path.clone()),
            other => SectionError::Load(other.to_string()),
        }
    }

    fn unexpected<E>(context: &'static str) -> impl FnOnce(E) -> SectionError
    where
        E: Into<anyhow::Error>,
    {
        move |err| SectionError::Unexpected(err.into().context(context))
    }
}

impl SectionError {
    fn from_aggregate(err: &AggregateError) -> Self {
        match err {
            AggregateError::NoData => SectionError::InsufficientData(
                "Nenhum arquivo de doenças foi carregado.".to_string(),
            ),
            AggregateError::Polars(e) => SectionError::Unexpected(
                anyhow!("{}", e).context("aggregating monthly disease tables"),
            ),
        }
    }
}

impl From<AggregateError> for SectionError {
    fn from(err: AggregateError) -> Self {
        SectionError::from_aggregate(&err)
    }
}

/// Short message shown under a section title.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
}

impl Notice {
    fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            text: text.into(),
        }
    }

    fn info(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            text: text.into(),
        }
    }
}

/// Pearson correlation between disease totals and one pollutant, with the
/// scatter it is drawn over.
#[derive(Debug, Clone)]
pub struct CorrelationView {
    pub pollutant: String,
    pub correlation: Result<CorrelationResult, StatsError>,
    pub scatter: ScatterChart,
}

impl CorrelationView {
    pub fn message(&self) -> String {
        match &self.correlation {
            Ok(result) => {
                let mut text = format!(
                    "O coeficiente de correlação de Pearson entre o {} e {} é: {:.2}",
                    MONTH_TOTAL_COLUMN, self.pollutant, result.coefficient
                );
                if let Some(p) = result.p_value {
                    text.push_str(&format!(" (p = {:.3}, n = {})", p, result.n));
                }
                if result.is_significant() {
                    text.push_str(", significativa ao nível de 5%");
                }
                text
            }
            Err(StatsError::ZeroVariance) => format!(
                "Correlação indefinida entre o {} e {}: uma das séries não varia entre os meses.",
                MONTH_TOTAL_COLUMN, self.pollutant
            ),
            Err(err) => format!("Correlação indefinida: {}", err),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SectionBody {
    MonthCases {
        chart: BarChart,
        summary: MonthSummary,
    },
    Bars {
        chart: BarChart,
        caption: Option<String>,
    },
    Lines(LineChart),
    Heatmap(Heatmap),
    Comparison(ComparisonChart),
    Correlation(CorrelationView),
}

#[derive(Debug)]
pub struct Section {
    pub title: String,
    pub outcome: Result<SectionBody, SectionError>,
    pub notices: Vec<Notice>,
}

impl Section {
    fn new(title: impl Into<String>, outcome: Result<SectionBody, SectionError>) -> Self {
        let title = title.into();
        if let Err(err) = &outcome {
            match err.severity() {
                Severity::Error => error!("{}: {}", title, err),
                Severity::Warning => warn!("{}: {}", title, err),
                Severity::Info => info!("{}: {}", title, err),
            }
        }
        Self {
            title,
            outcome,
            notices: Vec::new(),
        }
    }

    fn with_notices(mut self, notices: Vec<Notice>) -> Self {
        self.notices = notices;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Inputs loaded once per data folder; every section reads from here.
pub struct Dashboard {
    config: DashboardConfig,
    diseases: Vec<(Month, Result<DiseaseTable, LoadError>)>,
    costs: Vec<(Month, Result<CostTable, LoadError>)>,
    pollution: Result<PollutionTable, LoadError>,
    long: Result<LongFormTable, AggregateError>,
    combined: Result<CombinedMonthlyView, JoinError>,
    sections: Vec<Section>,
    selected_pollutant: Option<String>,
}

impl Dashboard {
    pub fn build(config: DashboardConfig) -> Self {
        info!("Building dashboard from {}", config.data_dir.display());

        let diseases: Vec<_> = config
            .months
            .iter()
            .map(|src| {
                let path = config.resolve(&src.disease_file);
                (src.month, TableLoader::load_disease(&path, src.month))
            })
            .collect();
        let costs: Vec<_> = config
            .months
            .iter()
            .map(|src| {
                let path = config.resolve(&src.cost_file);
                (src.month, TableLoader::load_cost(&path, src.month))
            })
            .collect();
        let pollution = TableLoader::load_pollution(
            &config.pollution_path(),
            &config.pollutants,
            &config.climate_variables,
        );

        for (month, err) in diseases.iter().filter_map(|(m, r)| r.as_ref().err().map(|e| (m, e))) {
            warn!("Disease data for {} unavailable: {}", month, err);
        }
        for (month, err) in costs.iter().filter_map(|(m, r)| r.as_ref().err().map(|e| (m, e))) {
            warn!("Cost data for {} unavailable: {}", month, err);
        }
        if let Err(err) = &pollution {
            warn!("Pollution data unavailable: {}", err);
        }

        let loaded: Vec<DiseaseTable> = diseases
            .iter()
            .filter_map(|(_, result)| result.as_ref().ok().cloned())
            .collect();
        let long = MonthlyAggregator::combine(&loaded);
        if let Err(err @ AggregateError::Polars(_)) = &long {
            error!("Failed to combine monthly disease tables: {}", err);
        }
        if let Ok(table) = &pollution {
            info!(
                "Pollution table: {} row(s), pollutants {:?}, climate {:?}",
                table.len(),
                table.pollutants(),
                table.climate_variables()
            );
        }

        let combined = CrossJoinEngine::combine(
            long.as_ref().ok(),
            pollution.as_ref().ok(),
            &config.pollutants,
        );

        let mut dashboard = Self {
            config,
            diseases,
            costs,
            pollution,
            long,
            combined,
            sections: Vec::new(),
            selected_pollutant: None,
        };
        dashboard.selected_pollutant = dashboard.pollutant_options().first().cloned();
        dashboard.sections = dashboard.build_sections();
        dashboard
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn selected_pollutant(&self) -> Option<&str> {
        self.selected_pollutant.as_deref()
    }

    /// Pollutants offered by the selector: configured ones found in the file.
    pub fn pollutant_options(&self) -> Vec<String> {
        match &self.combined {
            Ok(view) => view.pollutants().to_vec(),
            Err(_) => Vec::new(),
        }
    }

    /// Months whose disease file loaded.
    pub fn loaded_months(&self) -> Vec<Month> {
        self.diseases
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(m, _)| *m)
            .collect()
    }

    /// One-line load summary for the status area.
    pub fn status(&self) -> String {
        let loaded = self.loaded_months().len();
        let pollution = if self.pollution.is_ok() {
            "poluição carregada"
        } else {
            "poluição indisponível"
        };
        format!(
            "{}/{} meses de doenças carregados, {}",
            loaded,
            self.diseases.len(),
            pollution
        )
    }

    /// Recompute the correlation section for a new pollutant.
    pub fn select_pollutant(&mut self, pollutant: &str) {
        if self.selected_pollutant.as_deref() == Some(pollutant) {
            return;
        }
        info!("Correlation pollutant changed to {}", pollutant);
        self.selected_pollutant = Some(pollutant.to_string());
        let section = self.correlation_section();
        if let Some(last) = self.sections.last_mut() {
            *last = section;
        }
    }

    fn build_sections(&self) -> Vec<Section> {
        let mut sections: Vec<Section> = self
            .diseases
            .iter()
            .map(|(month, result)| self.month_section(*month, result))
            .collect();

        sections.push(self.top_diseases_section());
        sections.push(self.cost_section());
        sections.push(self.reference_line_section());
        sections.push(self.main_pollutants_section());
        sections.push(self.heatmap_section());
        sections.push(self.comparison_section());
        sections.push(self.correlation_section());

        let failed = sections.iter().filter(|s| !s.is_ok()).count();
        info!(
            "Dashboard ready: {} section(s), {} without chart",
            sections.len(),
            failed
        );
        sections
    }

    fn month_section(&self, month: Month, result: &Result<DiseaseTable, LoadError>) -> Section {
        let title = format!("Análise de Casos - {}", month);
        let table = match result {
            Ok(table) => table,
            Err(err) => {
                return Section::new(
                    title,
                    Err(SectionError::Load(format!(
                        "Erro ao carregar os dados de {}: {}",
                        month, err
                    ))),
                )
            }
        };

        if table.is_empty() {
            return Section::new(
                title,
                Err(SectionError::InsufficientData(format!(
                    "Nenhuma linha válida nos dados de {}.",
                    month
                ))),
            );
        }

        let mut notices = Vec::new();
        if table.dropped_rows > 0 {
            notices.push(Notice::warning(format!(
                "{} linha(s) ignorada(s) por valores inválidos.",
                table.dropped_rows
            )));
        }
        let outcome = Ok(SectionBody::MonthCases {
            chart: ChartBuilder::cases_by_sex(table),
            summary: MonthlyAggregator::summarize_month(table, self.config.month_top_n),
        });
        Section::new(title, outcome).with_notices(notices)
    }

    fn top_diseases_section(&self) -> Section {
        let title = format!(
            "Consolidado: Top {} Doenças Mais Frequentes",
            self.config.top_k
        );
        let notices: Vec<Notice> = self
            .diseases
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(month, _)| Notice::warning(format!("{} não entra no consolidado.", month)))
            .collect();

        let outcome = self
            .long
            .as_ref()
            .map_err(SectionError::from_aggregate)
            .and_then(|long| {
                MonthlyAggregator::top_k(long, self.config.top_k).map_err(SectionError::from)
            })
            .map(|top| SectionBody::Bars {
                chart: ChartBuilder::top_diseases(&top),
                caption: None,
            });
        Section::new(title, outcome).with_notices(notices)
    }

    fn cost_section(&self) -> Section {
        let title = "Custo Médio por Doença";
        let mut notices = Vec::new();
        let mut tables = Vec::new();
        for (month, result) in &self.costs {
            match result {
                Ok(table) => tables.push(table.clone()),
                Err(err) => notices.push(Notice::warning(format!(
                    "Custo de {} ignorado: {}",
                    month,
                    SectionError::from_load(err)
                ))),
            }
        }

        let outcome = if tables.is_empty() {
            Err(SectionError::Load(
                "Não foi possível carregar nenhum arquivo de custo médio.".to_string(),
            ))
        } else {
            MonthlyAggregator::merge_costs(&tables)
                .map_err(SectionError::unexpected("merging monthly cost tables"))
                .and_then(|matrix| {
                    if matrix.diseases.is_empty() {
                        Err(SectionError::InsufficientData(
                            "Nenhuma doença aparece em todos os meses de custo.".to_string(),
                        ))
                    } else {
                        Ok(SectionBody::Bars {
                            chart: ChartBuilder::cost_comparison(&matrix),
                            caption: Some(
                                "As doenças com maior custo médio representam impacto financeiro mais relevante para o sistema de saúde."
                                    .to_string(),
                            ),
                        })
                    }
                })
        };
        Section::new(title, outcome).with_notices(notices)
    }

    fn pollution(&self) -> Result<&PollutionTable, SectionError> {
        self.pollution.as_ref().map_err(SectionError::from_load)
    }

    fn lines_section(&self, title: String, columns: &[String]) -> Section {
        let outcome = self.pollution().and_then(|table| {
            let chart = ChartBuilder::pollutant_lines(table, columns, &title);
            if chart.series.is_empty() {
                Err(SectionError::InsufficientData(format!(
                    "Nenhuma das colunas {:?} foi encontrada no arquivo de poluição.",
                    columns
                )))
            } else {
                Ok(SectionBody::Lines(chart))
            }
        });
        Section::new(title, outcome)
    }

    fn reference_line_section(&self) -> Section {
        let reference = &self.config.reference_pollutant;
        self.lines_section(
            format!("Evolução do {} ao longo dos meses", reference),
            std::slice::from_ref(reference),
        )
    }

    fn main_pollutants_section(&self) -> Section {
        self.lines_section(
            "Evolução dos principais poluentes".to_string(),
            &self.config.main_pollutants,
        )
    }

    fn heatmap_section(&self) -> Section {
        let title = "Correlação entre Poluentes e Variáveis Climáticas";
        let outcome = self.pollution().and_then(|table| {
            let heatmap = ChartBuilder::correlation_heatmap(table, &self.config.analysis_columns());
            if heatmap.matrix.labels.is_empty() {
                Err(SectionError::InsufficientData(
                    "Nenhuma coluna de análise foi encontrada no arquivo de poluição.".to_string(),
                ))
            } else {
                Ok(SectionBody::Heatmap(heatmap))
            }
        });
        Section::new(title, outcome)
    }

    /// The joined disease/pollution view, or why it is unavailable.
    fn view(&self) -> Result<&CombinedMonthlyView, SectionError> {
        self.pollution()?;
        self.long.as_ref().map_err(SectionError::from_aggregate)?;
        match &self.combined {
            Ok(view) => Ok(view),
            Err(JoinError::InsufficientData(reason)) => {
                Err(SectionError::InsufficientData(reason.clone()))
            }
            Err(JoinError::Polars(err)) => Err(SectionError::Unexpected(
                anyhow!("{}", err).context("joining disease totals with pollution averages"),
            )),
        }
    }

    fn comparison_section(&self) -> Section {
        let reference = &self.config.reference_pollutant;
        let title = format!("Doenças vs. {} Médio", reference);
        let outcome = self.view().and_then(|view| {
            ChartBuilder::disease_vs_pollutant(view, reference)
                .map(SectionBody::Comparison)
                .ok_or_else(|| {
                    SectionError::InsufficientData(format!(
                        "A coluna '{}' não existe nos dados combinados.",
                        reference
                    ))
                })
        });
        Section::new(title, outcome).with_notices(vec![Notice::info(
            "Análise exploratória: não estabelece uma relação causal direta.",
        )])
    }

    fn correlation_section(&self) -> Section {
        let title = "Correlação: Poluentes Específicos vs. Total de Casos de Doença";
        let outcome = self.view().and_then(|view| {
            let pollutant = self.selected_pollutant.as_deref().ok_or_else(|| {
                SectionError::InsufficientData(
                    "Nenhuma coluna de poluente esperada foi encontrada no arquivo de poluição."
                        .to_string(),
                )
            })?;
            self.correlation_view(view, pollutant)
        });

        let mut notices = Vec::new();
        if let Ok(SectionBody::Correlation(corr)) = &outcome {
            match &corr.scatter.trendline {
                Trendline::Unavailable => notices.push(Notice::warning(
                    "Suporte a regressão não compilado. A linha de tendência não será exibida.",
                )),
                Trendline::NotFitted(err) => notices.push(Notice::info(format!(
                    "Linha de tendência não ajustada: {}",
                    err
                ))),
                Trendline::Fitted(_) => {}
            }
        }
        Section::new(title, outcome).with_notices(notices)
    }

    fn correlation_view(
        &self,
        view: &CombinedMonthlyView,
        pollutant: &str,
    ) -> Result<SectionBody, SectionError> {
        let insufficient = || {
            SectionError::InsufficientData(format!(
                "Não há dados suficientes ou a coluna '{}' não existe nos dados combinados.",
                pollutant
            ))
        };
        let scatter = ChartBuilder::pollutant_scatter(view, pollutant).ok_or_else(insufficient)?;

        // Only months where both values exist enter the coefficient.
        let (xs, totals): (Vec<f64>, Vec<f64>) =
            scatter.points.iter().map(|p| (p[0], p[1])).unzip();

        Ok(SectionBody::Correlation(CorrelationView {
            pollutant: pollutant.to_string(),
            correlation: StatsCalculator::correlate(&totals, &xs),
            scatter,
        }))
    }
}
