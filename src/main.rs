//! Disease & Air Quality Dashboard
//!
//! Monthly disease cases, hospitalization costs and air-pollution readings
//! for Vitória (Jan-Mar 2025), with pollutant/disease correlation.

mod charts;
mod config;
mod dashboard;
mod data;
mod gui;
mod stats;

use eframe::egui;
use gui::DashboardApp;
use std::path::PathBuf;

fn main() -> eframe::Result<()> {
    env_logger::init();

    // Input files are resolved against the working directory until a folder is picked
    let data_dir = PathBuf::from(".");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1000.0, 700.0])
            .with_title("Doenças e Qualidade do Ar"),
        ..Default::default()
    };

    eframe::run_native(
        "Doenças e Qualidade do Ar",
        options,
        Box::new(|cc| Ok(Box::new(DashboardApp::new(cc, data_dir)))),
    )
}
