use epi_core::domain::DatasetKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("schema mismatch in {dataset} source table: {detail}")]
    SchemaMismatch { dataset: DatasetKind, detail: String },

    #[error("invalid location name: {0:?}")]
    InvalidLocation(String),

    #[error("unknown metric {metric:?} for {dataset}; valid metrics: {valid}")]
    UnknownMetric {
        dataset: DatasetKind,
        metric: String,
        valid: String,
    },

    #[error("load aborted after {rows_processed} rows: {message}")]
    StorageFailure {
        rows_processed: usize,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] epi_core::common::error::CoreError),
}

impl EtlError {
    pub fn unknown_metric(dataset: DatasetKind, metric: &str) -> Self {
        EtlError::UnknownMetric {
            dataset,
            metric: metric.to_string(),
            valid: dataset.metric_names().join(", "),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
