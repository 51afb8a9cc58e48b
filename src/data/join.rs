//! Cross-Join Engine
//! Averages pollutant readings per month and inner-joins them with monthly
//! disease totals through the fixed month mapping.

use crate::data::aggregator::{AggregateError, LongFormTable, MonthlyAggregator, MONTH_TOTAL_COLUMN};
use crate::data::loader::PollutionTable;
use crate::data::month::{Month, DISPLAY_COLUMN, INDEX_COLUMN, KEY_COLUMN};
use log::{debug, info};
use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JoinError {
    /// Not enough input to build the view. Not a computation failure.
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

impl From<AggregateError> for JoinError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::NoData => {
                JoinError::InsufficientData("no disease data was loaded".to_string())
            }
            AggregateError::Polars(e) => JoinError::Polars(e),
        }
    }
}

/// Monthly disease totals next to monthly pollutant averages, one row per
/// month present on both sides, in calendar order.
#[derive(Debug, Clone)]
pub struct CombinedMonthlyView {
    df: DataFrame,
    pollutants: Vec<String>,
}

impl CombinedMonthlyView {
    pub fn pollutants(&self) -> &[String] {
        &self.pollutants
    }

    pub fn months(&self) -> Vec<Month> {
        self.df
            .column(DISPLAY_COLUMN)
            .ok()
            .and_then(|col| col.str().ok())
            .map(|ca| ca.into_iter().flatten().filter_map(Month::from_display).collect())
            .unwrap_or_default()
    }

    pub fn disease_totals(&self) -> Vec<f64> {
        self.float_column(MONTH_TOTAL_COLUMN).unwrap_or_default()
    }

    /// Monthly average of one pollutant, aligned with `disease_totals`.
    pub fn series(&self, pollutant: &str) -> Option<Vec<f64>> {
        if !self.pollutants.iter().any(|p| p == pollutant) {
            return None;
        }
        self.float_column(pollutant)
    }

    fn float_column(&self, name: &str) -> Option<Vec<f64>> {
        let values = self.df.column(name).ok()?.cast(&DataType::Float64).ok()?;
        let ca = values.f64().ok()?;
        Some(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

/// Builds the month-keyed join between disease and pollution data.
pub struct CrossJoinEngine;

impl CrossJoinEngine {
    /// Mean of each requested pollutant per month.
    ///
    /// Output columns: [Mês, Mes_num, <pollutants...>], sorted by Mes_num.
    pub fn pollutant_averages(
        pollution: &PollutionTable,
        pollutants: &[String],
    ) -> Result<(DataFrame, Vec<String>), JoinError> {
        if pollution.is_empty() {
            return Err(JoinError::InsufficientData(
                "pollution table has no rows".to_string(),
            ));
        }

        let available: Vec<String> = pollutants
            .iter()
            .filter(|p| pollution.has_column(p))
            .cloned()
            .collect();
        if available.is_empty() {
            return Err(JoinError::InsufficientData(format!(
                "none of the columns {:?} exist in the pollution table",
                pollutants
            )));
        }

        let mut selection = vec![col(DISPLAY_COLUMN), col(INDEX_COLUMN)];
        selection.extend(available.iter().map(|p| col(p.as_str())));

        let df = pollution
            .dataframe()
            .clone()
            .lazy()
            .group_by([col(KEY_COLUMN)])
            .agg(
                available
                    .iter()
                    .map(|p| col(p.as_str()).mean())
                    .collect::<Vec<_>>(),
            )
            .join(
                Month::lookup_frame()?.lazy(),
                [col(KEY_COLUMN)],
                [col(KEY_COLUMN)],
                JoinArgs::new(JoinType::Inner),
            )
            .select(selection)
            .sort([INDEX_COLUMN], SortMultipleOptions::default())
            .collect()?;

        debug!("Pollutant averages:\n{}", df);
        Ok((df, available))
    }

    /// Inner join on `Mês`; months missing from either side are dropped.
    pub fn join(
        disease_totals: &DataFrame,
        pollutant_averages: &DataFrame,
        pollutants: Vec<String>,
    ) -> Result<CombinedMonthlyView, JoinError> {
        if disease_totals.height() == 0 {
            return Err(JoinError::InsufficientData(
                "monthly disease totals are empty".to_string(),
            ));
        }
        if pollutant_averages.height() == 0 {
            return Err(JoinError::InsufficientData(
                "monthly pollutant averages are empty".to_string(),
            ));
        }

        let df = disease_totals
            .clone()
            .lazy()
            .select([col(DISPLAY_COLUMN), col(MONTH_TOTAL_COLUMN)])
            .join(
                pollutant_averages.clone().lazy(),
                [col(DISPLAY_COLUMN)],
                [col(DISPLAY_COLUMN)],
                JoinArgs::new(JoinType::Inner),
            )
            .sort(
                [INDEX_COLUMN],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()?;

        if df.height() == 0 {
            return Err(JoinError::InsufficientData(
                "disease and pollution data share no month".to_string(),
            ));
        }

        info!("Combined monthly view: {} month(s)", df.height());
        Ok(CombinedMonthlyView { df, pollutants })
    }

    /// Full pipeline from the aggregated disease table and the pollution table.
    pub fn combine(
        long: Option<&LongFormTable>,
        pollution: Option<&PollutionTable>,
        pollutants: &[String],
    ) -> Result<CombinedMonthlyView, JoinError> {
        let long = long.filter(|l| !l.is_empty()).ok_or_else(|| {
            JoinError::InsufficientData("no disease data was loaded".to_string())
        })?;
        let pollution = pollution.filter(|p| !p.is_empty()).ok_or_else(|| {
            JoinError::InsufficientData("no pollution data was loaded".to_string())
        })?;

        let totals = MonthlyAggregator::monthly_totals(long)?;
        let (averages, available) = Self::pollutant_averages(pollution, pollutants)?;
        Self::join(&totals, &averages, available)
    }
}
