//! Charts module - chart models and egui rendering

mod builder;
mod plotter;

pub use builder::{
    BarChart, ChartBuilder, ComparisonChart, Heatmap, LineChart, ScatterChart, Trendline,
};
pub use plotter::ChartPlotter;
