//! # Valet Math
//!
//! Statistical building blocks for occupancy estimation.
//! This crate provides the small-sample summaries, percentile interpolation,
//! outlier trimming and least-squares fitting that the estimator models share.

use thiserror::Error;

// Calculation modules
pub mod outliers;
pub mod regression;
pub mod summary;

/// Errors that can occur in estimation-related calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

impl MathError {
    /// The bare reason, without the category prefix used by `Display`
    pub fn reason(&self) -> &str {
        match self {
            MathError::InsufficientData(msg)
            | MathError::InvalidInput(msg)
            | MathError::CalculationError(msg) => msg,
        }
    }
}

/// Result type for estimation math operations
pub type Result<T> = std::result::Result<T, MathError>;

pub use outliers::{discard_outliers, Trimmed};
pub use regression::LeastSquaresFit;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strips_prefix() {
        let err = MathError::InsufficientData("not enough data points".to_string());
        assert_eq!(err.reason(), "not enough data points");
        assert_eq!(
            err.to_string(),
            "Insufficient data for calculation: not enough data points"
        );
    }
}
