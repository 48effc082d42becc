//! Error types for Kepler
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Kepler error types
#[derive(Error, Debug)]
pub enum Error {
    /// Caller supplied an argument the model cannot represent
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown experiment id
    #[error("Experiment not found: {0}")]
    NotFound(String),

    /// Sort key that is not a derived attribute of an experiment
    #[error("Unknown field: {0}\nExpected one of: id, name, status, start_time, end_time, duration")]
    UnknownField(String),

    /// Persisted experiments file could not be decoded
    #[error("Corrupt experiments file: {0}")]
    CorruptState(String),

    /// Artifact helper asked for the latest running experiment and found none
    #[error("No running experiments found\nStart an experiment session or pass an explicit experiment id")]
    NoActiveExperiment,

    /// Experiment with no events (cannot derive a start time)
    #[error("Experiment {0} has no log events")]
    EmptyExperiment(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error (CSV artifacts)
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error (Parquet artifacts)
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// File watcher error
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}
