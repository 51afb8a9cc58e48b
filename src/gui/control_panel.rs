//! Control Panel Widget
//! Left side panel with the data folder, pollutant selector and load status.

use egui::{Color32, ComboBox, RichText};
use std::path::PathBuf;

/// Left side control panel.
pub struct ControlPanel {
    pub data_dir: PathBuf,
    pub pollutants: Vec<String>,
    pub selected_pollutant: String,
    pub status: String,
    pub status_is_error: bool,
}

impl ControlPanel {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            pollutants: Vec::new(),
            selected_pollutant: String::new(),
            status: "Pronto".to_string(),
            status_is_error: false,
        }
    }

    /// Refresh the selector after a (re)load.
    pub fn update_pollutants(&mut self, pollutants: Vec<String>, selected: Option<&str>) {
        self.pollutants = pollutants;
        self.selected_pollutant = selected.unwrap_or_default().to_string();
    }

    pub fn set_status(&mut self, status: &str, is_error: bool) {
        self.status = status.to_string();
        self.status_is_error = is_error;
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🩺 Doenças e Qualidade do Ar")
                    .size(18.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Vitória - Jan a Mar 2025")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data folder =====
        ui.label(RichText::new("📁 Pasta de Dados").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new(self.data_dir.display().to_string())
                            .size(12.0)
                            .color(Color32::WHITE),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("📂 Abrir").clicked() {
                            action = ControlPanelAction::BrowseFolder;
                        }
                    });
                });
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Pollutant selector =====
        ui.label(RichText::new("🌬 Poluente para Correlação").size(14.0).strong());
        ui.add_space(5.0);

        if self.pollutants.is_empty() {
            ui.label(
                RichText::new("Nenhum poluente disponível")
                    .size(12.0)
                    .color(Color32::GRAY),
            );
        } else {
            ComboBox::from_id_salt("pollutant")
                .width(220.0)
                .selected_text(&self.selected_pollutant)
                .show_ui(ui, |ui| {
                    for pollutant in &self.pollutants {
                        if ui
                            .selectable_label(self.selected_pollutant == *pollutant, pollutant)
                            .clicked()
                            && self.selected_pollutant != *pollutant
                        {
                            self.selected_pollutant = pollutant.clone();
                            action = ControlPanelAction::PollutantChanged;
                        }
                    }
                });
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Status =====
        ui.label(RichText::new("📊 Status").size(14.0).strong());
        ui.add_space(5.0);

        let status_color = if self.status_is_error {
            Color32::from_rgb(220, 53, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseFolder,
    PollutantChanged,
}
