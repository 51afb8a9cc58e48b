//! Chart Plotter Module
//! Draws the chart models with egui_plot.

use crate::charts::builder::{
    BarChart, ComparisonChart, Heatmap, LineChart, ScatterChart, Trendline,
};
use egui::{Align2, Color32, RichText};
use egui_plot::{
    Bar, BarChart as PlotBarChart, Legend, Line, LineStyle, Plot, PlotPoint, PlotPoints, Points,
    Polygon, Text,
};

/// Total width used by the bars of one category.
const GROUP_WIDTH: f64 = 0.8;

const MISSING_CELL: Color32 = Color32::from_rgb(200, 200, 200);
const NEGATIVE: Color32 = Color32::from_rgb(33, 102, 172);
const POSITIVE: Color32 = Color32::from_rgb(178, 24, 43);
const TRENDLINE_COLOR: Color32 = Color32::from_rgb(90, 90, 90);

/// Draws dashboard charts using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Color for a correlation coefficient: blue (-1), white (0), red (+1).
    pub fn heat_color(value: Option<f64>) -> Color32 {
        let Some(v) = value.filter(|v| v.is_finite()) else {
            return MISSING_CELL;
        };
        let t = v.clamp(-1.0, 1.0).abs() as f32;
        let target = if v < 0.0 { NEGATIVE } else { POSITIVE };
        let mix = |c: u8| (255.0 + (c as f32 - 255.0) * t).round() as u8;
        Color32::from_rgb(mix(target.r()), mix(target.g()), mix(target.b()))
    }

    /// Label for an integer grid mark, empty elsewhere.
    fn category_label(labels: &[String], value: f64) -> String {
        let idx = value.round();
        if (value - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        labels.get(idx as usize).cloned().unwrap_or_default()
    }

    fn tick_label(ticks: &[(f64, String)], value: f64) -> String {
        ticks
            .iter()
            .find(|(x, _)| (x - value).abs() < 1e-6)
            .map(|(_, label)| label.clone())
            .unwrap_or_default()
    }

    /// Grouped bar chart: X-axis categories, one bar per series within each.
    pub fn draw_bar_chart(ui: &mut egui::Ui, id: &str, chart: &BarChart, height: f32) {
        let labels = chart.categories.clone();
        let n_series = chart.series.len().max(1);
        let bar_width = GROUP_WIDTH / n_series as f64;

        let mut plot = Plot::new(id)
            .height(height)
            .allow_scroll(false)
            .allow_drag(false)
            .allow_zoom(false)
            .x_axis_label(chart.x_label.clone())
            .y_axis_label(chart.y_label.clone())
            .include_y(0.0)
            .x_axis_formatter(move |mark, _range| Self::category_label(&labels, mark.value));
        if chart.show_legend {
            plot = plot.legend(Legend::default());
        }

        plot.show(ui, |plot_ui| {
            for (j, series) in chart.series.iter().enumerate() {
                let offset = -GROUP_WIDTH / 2.0 + bar_width * (j as f64 + 0.5);
                let bars: Vec<Bar> = series
                    .values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.is_finite())
                    .map(|(i, &v)| {
                        let color = series.colors.get(i).copied().unwrap_or(Color32::GRAY);
                        Bar::new(i as f64 + offset, v)
                            .width(bar_width * 0.95)
                            .fill(color)
                            .name(chart.categories.get(i).cloned().unwrap_or_default())
                    })
                    .collect();

                let color = series.colors.first().copied().unwrap_or(Color32::GRAY);
                plot_ui.bar_chart(PlotBarChart::new(bars).name(&series.name).color(color));

                if chart.show_values {
                    for (i, &v) in series.values.iter().enumerate() {
                        if v.is_finite() {
                            plot_ui.text(
                                Text::new(PlotPoint::new(i as f64 + offset, v), format!("{}", v))
                                    .anchor(Align2::CENTER_BOTTOM),
                            );
                        }
                    }
                }
            }
        });
    }

    /// Line chart with markers.
    pub fn draw_line_chart(ui: &mut egui::Ui, id: &str, chart: &LineChart, height: f32) {
        let ticks = chart.x_ticks.clone();

        Plot::new(id)
            .height(height)
            .allow_scroll(false)
            .legend(Legend::default())
            .x_axis_label(chart.x_label.clone())
            .y_axis_label(chart.y_label.clone())
            .x_axis_formatter(move |mark, _range| Self::tick_label(&ticks, mark.value))
            .show(ui, |plot_ui| {
                for series in &chart.series {
                    let points: PlotPoints = series.points.iter().copied().collect();
                    plot_ui.line(
                        Line::new(points)
                            .color(series.color)
                            .width(2.0)
                            .name(&series.name),
                    );
                    let markers: PlotPoints = series.points.iter().copied().collect();
                    plot_ui.points(Points::new(markers).radius(4.0).color(series.color));
                }
            });
    }

    /// Correlation matrix as colored cells with the coefficient printed inside.
    pub fn draw_heatmap(ui: &mut egui::Ui, id: &str, heatmap: &Heatmap, height: f32) {
        let labels = heatmap.matrix.labels.clone();
        let x_labels = labels.clone();
        let y_labels = labels;

        Plot::new(id)
            .height(height)
            .data_aspect(1.0)
            .show_grid(false)
            .allow_scroll(false)
            .allow_drag(false)
            .x_axis_formatter(move |mark, _range| Self::category_label(&x_labels, mark.value))
            .y_axis_formatter(move |mark, _range| Self::category_label(&y_labels, -mark.value))
            .show(ui, |plot_ui| {
                for (r, row) in heatmap.matrix.values.iter().enumerate() {
                    for (c, value) in row.iter().enumerate() {
                        let x = c as f64;
                        let y = -(r as f64);
                        let cell = vec![
                            [x - 0.5, y - 0.5],
                            [x + 0.5, y - 0.5],
                            [x + 0.5, y + 0.5],
                            [x - 0.5, y + 0.5],
                        ];
                        plot_ui.polygon(
                            Polygon::new(PlotPoints::from(cell))
                                .fill_color(Self::heat_color(*value)),
                        );
                        if let Some(v) = value {
                            plot_ui.text(Text::new(
                                PlotPoint::new(x, y),
                                RichText::new(format!("{:.2}", v)).color(Color32::BLACK),
                            ));
                        }
                    }
                }
            });
    }

    /// Disease totals and pollutant average side by side, sharing month labels.
    pub fn draw_comparison(ui: &mut egui::Ui, id: &str, chart: &ComparisonChart, height: f32) {
        ui.columns(2, |columns| {
            Self::draw_bar_chart(&mut columns[0], &format!("{}_bars", id), &chart.bars, height);
            Self::draw_line_chart(&mut columns[1], &format!("{}_line", id), &chart.line, height);
        });
    }

    /// Scatter points, plus the dashed regression line when fitted.
    pub fn draw_scatter(ui: &mut egui::Ui, id: &str, chart: &ScatterChart, height: f32) {
        Plot::new(id)
            .height(height)
            .allow_scroll(false)
            .legend(Legend::default())
            .x_axis_label(chart.x_label.clone())
            .y_axis_label(chart.y_label.clone())
            .show(ui, |plot_ui| {
                let points: PlotPoints = chart.points.iter().copied().collect();
                plot_ui.points(
                    Points::new(points)
                        .radius(5.0)
                        .color(Color32::from_rgb(31, 119, 180))
                        .name("Meses"),
                );

                if let Trendline::Fitted(fit) = &chart.trendline {
                    let ends: PlotPoints = fit.trendline().into_iter().collect();
                    plot_ui.line(
                        Line::new(ends)
                            .color(TRENDLINE_COLOR)
                            .width(1.5)
                            .style(LineStyle::dashed_loose())
                            .name(format!("OLS (R² = {:.2})", fit.r_squared)),
                    );
                }
            });
    }
}
