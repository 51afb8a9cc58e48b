//! Chart Viewer Widget
//! Central scrollable panel drawing the dashboard sections top to bottom.

use crate::charts::ChartPlotter;
use crate::dashboard::{Section, SectionBody, Severity};
use egui::{Color32, RichText, ScrollArea};

const SECTION_SPACING: f32 = 20.0;
const CHART_HEIGHT: f32 = 380.0;
const HEATMAP_HEIGHT: f32 = 520.0;

const INFO_COLOR: Color32 = Color32::from_rgb(23, 162, 184);
const WARNING_COLOR: Color32 = Color32::from_rgb(255, 193, 7);
const ERROR_COLOR: Color32 = Color32::from_rgb(220, 53, 69);

fn severity_style(severity: Severity) -> (&'static str, Color32) {
    match severity {
        Severity::Info => ("ℹ", INFO_COLOR),
        Severity::Warning => ("⚠", WARNING_COLOR),
        Severity::Error => ("❌", ERROR_COLOR),
    }
}

/// Scrollable section display.
pub struct ChartViewer;

impl ChartViewer {
    pub fn show(ui: &mut egui::Ui, sections: &[Section]) {
        if sections.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("Sem dados").size(20.0));
            });
            return;
        }

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (idx, section) in sections.iter().enumerate() {
                    Self::draw_section(ui, idx, section);
                    ui.add_space(SECTION_SPACING);
                }
            });
    }

    fn message(ui: &mut egui::Ui, severity: Severity, text: &str) {
        let (icon, color) = severity_style(severity);
        ui.label(RichText::new(format!("{} {}", icon, text)).size(13.0).color(color));
    }

    fn draw_section(ui: &mut egui::Ui, idx: usize, section: &Section) {
        let border_color = match &section.outcome {
            Ok(_) => ui.visuals().widgets.noninteractive.bg_stroke.color,
            Err(err) => severity_style(err.severity()).1,
        };

        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(1.5, border_color))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(&section.title).size(18.0).strong());
                ui.add_space(6.0);

                for notice in &section.notices {
                    Self::message(ui, notice.severity, &notice.text);
                }

                match &section.outcome {
                    Ok(body) => Self::draw_body(ui, &format!("section_{}", idx), body),
                    Err(err) => Self::message(ui, err.severity(), &err.to_string()),
                }
            });
    }

    fn draw_body(ui: &mut egui::Ui, id: &str, body: &SectionBody) {
        match body {
            SectionBody::MonthCases { chart, summary } => {
                ChartPlotter::draw_bar_chart(ui, id, chart, CHART_HEIGHT);
                ui.add_space(6.0);
                for line in summary.lines() {
                    ui.label(RichText::new(format!("• {}", line)).size(13.0));
                }
            }
            SectionBody::Bars { chart, caption } => {
                ui.label(RichText::new(&chart.title).size(14.0));
                ChartPlotter::draw_bar_chart(ui, id, chart, CHART_HEIGHT);
                if let Some(caption) = caption {
                    ui.label(RichText::new(format!("• {}", caption)).size(13.0));
                }
            }
            SectionBody::Lines(chart) => {
                ChartPlotter::draw_line_chart(ui, id, chart, CHART_HEIGHT);
            }
            SectionBody::Heatmap(heatmap) => {
                ChartPlotter::draw_heatmap(ui, id, heatmap, HEATMAP_HEIGHT);
            }
            SectionBody::Comparison(chart) => {
                ui.label(RichText::new(&chart.title).size(14.0));
                ChartPlotter::draw_comparison(ui, id, chart, CHART_HEIGHT);
            }
            SectionBody::Correlation(corr) => {
                let severity = if corr.correlation.is_ok() {
                    Severity::Info
                } else {
                    Severity::Warning
                };
                Self::message(ui, severity, &corr.message());
                ui.add_space(6.0);
                ui.label(RichText::new(&corr.scatter.title).size(14.0));
                ChartPlotter::draw_scatter(ui, id, &corr.scatter, CHART_HEIGHT);
                if corr.scatter.fit().is_some() {
                    ui.label(
                        RichText::new("A linha pontilhada representa a regressão linear (OLS).")
                            .size(12.0)
                            .color(Color32::GRAY),
                    );
                }
            }
        }
    }
}
