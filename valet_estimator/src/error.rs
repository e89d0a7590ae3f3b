//! Error types for the valet_estimator crate

use thiserror::Error;

/// Custom error types for the valet_estimator crate
///
/// Model-level failures (no similar dates, degenerate regression input) are
/// not errors at this level; they are recorded in each model's state.
#[derive(Debug, Error)]
pub enum EstimatorError {
    /// The historical record store could not be read
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters or configuration values
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A calibration artifact could not be used
    #[error("Calibration error: {0}")]
    CalibrationError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error reading or writing CSV tables
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error (de)serializing JSON
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error parsing a TOML configuration file
    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, EstimatorError>;
