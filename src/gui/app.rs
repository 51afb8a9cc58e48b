//! Dashboard Main Application
//! Main window with control panel and section viewer.

use crate::config::DashboardConfig;
use crate::dashboard::Dashboard;
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use egui::SidePanel;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Main application window.
pub struct DashboardApp {
    dashboard: Dashboard,
    control_panel: ControlPanel,
}

impl DashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, data_dir: PathBuf) -> Self {
        let mut control_panel = ControlPanel::new(data_dir.clone());
        let dashboard = Self::load(&data_dir, &mut control_panel);
        Self {
            dashboard,
            control_panel,
        }
    }

    /// Build the dashboard for `data_dir` and refresh the panel from it.
    fn load(data_dir: &Path, control_panel: &mut ControlPanel) -> Dashboard {
        let (config, config_error) = DashboardConfig::load_or_default(data_dir);
        let dashboard = Dashboard::build(config);

        control_panel.data_dir = data_dir.to_path_buf();
        control_panel.update_pollutants(
            dashboard.pollutant_options(),
            dashboard.selected_pollutant(),
        );
        match config_error {
            Some(err) => {
                warn!("{}", err);
                control_panel.set_status(
                    &format!("{} (configuração padrão usada: {})", dashboard.status(), err),
                    true,
                );
            }
            None => control_panel.set_status(&dashboard.status(), false),
        }
        dashboard
    }

    fn handle_browse_folder(&mut self) {
        if let Some(dir) = rfd::FileDialog::new()
            .set_directory(&self.control_panel.data_dir)
            .pick_folder()
        {
            info!("Reloading dashboard from {}", dir.display());
            self.dashboard = Self::load(&dir, &mut self.control_panel);
        }
    }

    fn handle_pollutant_changed(&mut self) {
        let pollutant = self.control_panel.selected_pollutant.clone();
        self.dashboard.select_pollutant(&pollutant);
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        SidePanel::left("control_panel")
            .min_width(280.0)
            .max_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    match self.control_panel.show(ui) {
                        ControlPanelAction::BrowseFolder => self.handle_browse_folder(),
                        ControlPanelAction::PollutantChanged => self.handle_pollutant_changed(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ChartViewer::show(ui, self.dashboard.sections());
        });
    }
}
