use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use epi_core::domain::DatasetKind;

use crate::common::error::{EtlError, Result};

const CONFIG_PATH: &str = "epi.toml";

const DEFAULT_COVID_URL: &str = "https://covid.ourworldindata.org/data/owid-covid-data.csv";
const DEFAULT_MPOX_URL: &str =
    "https://raw.githubusercontent.com/owid/monkeypox/main/owid-monkeypox-data.csv";

/// Pipeline configuration: defaults, overlaid by `epi.toml` when present,
/// overlaid by `EPI_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub database_path: PathBuf,
    pub data_dir: PathBuf,
    pub covid_url: String,
    pub mpox_url: String,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/epi.db"),
            data_dir: PathBuf::from("data"),
            covid_url: DEFAULT_COVID_URL.to_string(),
            mpox_url: DEFAULT_MPOX_URL.to_string(),
        }
    }
}

impl EtlConfig {
    pub fn load() -> Result<Self> {
        let mut config = if Path::new(CONFIG_PATH).exists() {
            let content = std::fs::read_to_string(CONFIG_PATH)?;
            toml::from_str(&content)
                .map_err(|e| EtlError::Config(format!("failed to parse {CONFIG_PATH}: {e}")))?
        } else {
            Self::default()
        };

        if let Ok(path) = env::var("EPI_DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Ok(dir) = env::var("EPI_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(url) = env::var("EPI_COVID_URL") {
            config.covid_url = url;
        }
        if let Ok(url) = env::var("EPI_MPOX_URL") {
            config.mpox_url = url;
        }

        Ok(config)
    }

    pub fn source_url(&self, dataset: DatasetKind) -> &str {
        match dataset {
            DatasetKind::Covid => &self.covid_url,
            DatasetKind::Mpox => &self.mpox_url,
        }
    }

    /// Where a dataset's raw extract is kept between fetch and load.
    pub fn extract_path(&self, dataset: DatasetKind) -> PathBuf {
        self.data_dir.join(format!("{dataset}_data.csv"))
    }
}
