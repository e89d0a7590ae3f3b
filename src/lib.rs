//! # Valet Forecast
//!
//! Workspace facade for the bike-valet occupancy estimator.
//!
//! - [`valet_math`]: summary statistics, percentiles, outlier trimming and
//!   least squares
//! - [`valet_estimator`]: history access, models, backtest calibration and
//!   estimate selection
//!
//! ## Example
//!
//! ```
//! use valet_forecast_workspace::estimator::TimeOfDay;
//!
//! let t = TimeOfDay::parse("9:05");
//! assert_eq!(t.minutes(), Some(545));
//! ```

pub use valet_estimator as estimator;
pub use valet_math as math;

pub use valet_estimator::{
    CalibrationCache, EstimateReport, EstimateRequest, Estimator, EstimatorConfig, EstimatorError,
    Measure, ModelKind, TimeOfDay,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_reexports() {
        assert_eq!(TimeOfDay::parse("1230").to_string(), "12:30");
        assert_eq!(Measure::FurtherArrivals.key(), "fut");
        assert_eq!(ModelKind::Recent.code(), "REC");
        assert!(math::summary::median(&[1.0, 3.0]).is_some());
    }
}
