//! Error types for finscope-core

use crate::types::MetricKind;
use thiserror::Error;

/// Main error type for the finscope-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while listing or reading sources, or writing reports
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// `end_measurement` called without a matching `start_measurement`
    #[error("no measurement in progress for subject '{subject}' with label '{label}'")]
    MeasurementProtocol { subject: String, label: String },

    /// Metric value rejected by the store
    #[error("invalid value {value} for {metric} on subject '{subject}': {reason}")]
    InvalidMetric {
        subject: String,
        metric: MetricKind,
        value: f64,
        reason: String,
    },

    /// Invalid file exclusion pattern
    #[error("invalid exclude pattern: {0}")]
    Pattern(String),
}

impl From<glob::PatternError> for Error {
    fn from(e: glob::PatternError) -> Self {
        Error::Pattern(e.to_string())
    }
}

/// Result type alias for finscope-core
pub type Result<T> = std::result::Result<T, Error>;
