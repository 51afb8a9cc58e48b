//! Data module - loading, monthly aggregation and month-keyed joins

mod aggregator;
mod join;
mod loader;
mod month;

pub use aggregator::{
    AggregateError, CostMatrix, LongFormTable, MonthSummary, MonthlyAggregator,
    MONTH_TOTAL_COLUMN,
};
pub use join::{CombinedMonthlyView, CrossJoinEngine, JoinError};
pub use loader::{
    CostTable, DiseaseRecord, DiseaseTable, LoadError, PollutionTable, TableLoader,
    FEMALE_COLUMN, MALE_COLUMN,
};
pub use month::Month;
