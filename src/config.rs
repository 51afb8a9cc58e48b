//! Dashboard configuration
//! Input file names and column lists, with optional overrides from a
//! `dashboard.json` placed in the data folder.

use crate::data::Month;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "dashboard.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration in '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Input files for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthSources {
    pub month: Month,
    pub disease_file: String,
    pub cost_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Folder the relative file names are resolved against.
    #[serde(skip)]
    pub data_dir: PathBuf,
    pub months: Vec<MonthSources>,
    pub pollution_file: String,
    /// Pollutants offered for the disease correlation.
    pub pollutants: Vec<String>,
    pub climate_variables: Vec<String>,
    /// Pollutants drawn together in the evolution chart.
    pub main_pollutants: Vec<String>,
    /// Pollutant used by the single-series line and the comparison chart.
    pub reference_pollutant: String,
    pub top_k: usize,
    pub month_top_n: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let sources = |month: Month, suffix: &str| MonthSources {
            month,
            disease_file: format!("dados_doencas_{}.txt", suffix),
            cost_file: format!("custo_medio_int_{}.txt", suffix),
        };
        let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            data_dir: PathBuf::from("."),
            months: vec![
                sources(Month::January, "jan"),
                sources(Month::February, "fev"),
                sources(Month::March, "mar"),
            ],
            pollution_file: "poluicao_vitoria2025.csv".to_string(),
            pollutants: names(&[
                "Ozônio",
                "Dióxido de Nitrogênio",
                "Monóxido de Nitrogênio",
                "Óxidos de Nitrogênio",
                "Dióxido de Enxofre",
                "Monóxido de Carbono",
                "Partículas Respiráveis",
                "Partículas Inaláveis",
            ]),
            climate_variables: names(&["Umidade Relativa", "Temperatura"]),
            main_pollutants: names(&[
                "Ozônio",
                "Dióxido de Nitrogênio",
                "Monóxido de Nitrogênio",
                "Óxidos de Nitrogênio",
            ]),
            reference_pollutant: "Ozônio".to_string(),
            top_k: 5,
            month_top_n: 3,
        }
    }
}

impl DashboardConfig {
    /// Defaults for `data_dir`, overridden by `data_dir/dashboard.json` if present.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        let mut config = if path.is_file() {
            let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let parsed: DashboardConfig =
                serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;
            info!("Using configuration from {}", path.display());
            parsed
        } else {
            DashboardConfig::default()
        };
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    /// Like [`load`](Self::load) but falls back to defaults on a bad file,
    /// returning the error for display.
    pub fn load_or_default(data_dir: &Path) -> (Self, Option<ConfigError>) {
        match Self::load(data_dir) {
            Ok(config) => (config, None),
            Err(err) => {
                let config = DashboardConfig {
                    data_dir: data_dir.to_path_buf(),
                    ..DashboardConfig::default()
                };
                (config, Some(err))
            }
        }
    }

    pub fn resolve(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn pollution_path(&self) -> PathBuf {
        self.resolve(&self.pollution_file)
    }

    /// Pollutants followed by climate variables, as used by the heatmap.
    pub fn analysis_columns(&self) -> Vec<String> {
        self.pollutants
            .iter()
            .chain(self.climate_variables.iter())
            .cloned()
            .collect()
    }
}
