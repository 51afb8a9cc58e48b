//! Stats module - correlation and regression

mod calculator;
pub mod regression;

pub use calculator::{CorrelationMatrix, CorrelationResult, StatsCalculator, StatsError};
