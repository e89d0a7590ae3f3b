//! # Valet Estimator
//!
//! Occupancy and activity estimates for a bike valet, learned from earlier
//! days with similar operating hours.
//!
//! ## Features
//!
//! - Minute-resolution clock values and per-day counts (arrivals so far,
//!   arrivals still to come, next-hour activity, all-day peak)
//! - Similar-day matching that never looks at the target date or later
//! - Three interchangeable models (similar-days median, linear regression,
//!   recent-window median) and an optional tree ensemble behind the
//!   `ensemble` feature
//! - A parallel backtest that calibrates each model's residuals per bucket of
//!   fraction elapsed and writes a JSON artifact
//! - Selection of one estimate per measure, driven by calibration or a
//!   small-cohort guardrail
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use valet_estimator::{
//!     CalibrationCache, Day, EstimateRequest, Estimator, EstimatorConfig, InMemoryLedger,
//!     Measure, TimeOfDay, Visit,
//! };
//!
//! # fn main() -> valet_estimator::Result<()> {
//! let mut ledger = InMemoryLedger::new();
//! let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
//! let day = Day::new(1, date, TimeOfDay::parse("08:00"), TimeOfDay::parse("18:00"))?;
//! ledger.insert_day(day, vec![Visit::open_ended(TimeOfDay::parse("09:15"))]);
//!
//! let calibration = CalibrationCache::disabled();
//! let estimator = Estimator::new(EstimatorConfig::default(), &ledger, &calibration)?;
//! let report = estimator.estimate(&EstimateRequest {
//!     date: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
//!     open: TimeOfDay::parse("08:00"),
//!     close: TimeOfDay::parse("18:00"),
//!     as_of: TimeOfDay::parse("12:00"),
//!     bikes_so_far: Some(3),
//! })?;
//!
//! assert_eq!(report.cohort_n, 1);
//! assert!(report.selected(Measure::FurtherArrivals).is_some());
//! # Ok(())
//! # }
//! ```

pub mod buckets;
pub mod calibration;
pub mod calibrator;
pub mod config;
pub mod counts;
pub mod data;
pub mod error;
pub mod estimator;
pub mod ledger;
pub mod matcher;
pub mod measure;
pub mod models;
pub mod selection;
pub mod time;

// Re-export commonly used types
pub use crate::buckets::{BucketPartition, TimeBucket};
pub use crate::calibration::{CalibrationArtifact, CalibrationCache, CalibrationStore};
pub use crate::calibrator::{BacktestOutcome, CalibrationSummary, Calibrator, Sample};
pub use crate::config::{ConfidenceLevel, EstimatorConfig};
pub use crate::counts::{counts_for_time, peak_all_day, CutoffCounts, Peak};
pub use crate::data::DataLoader;
pub use crate::error::{EstimatorError, Result};
pub use crate::estimator::{EstimateReport, EstimateRequest, Estimator, MeasureEstimate};
pub use crate::ledger::{Day, HistorySnapshot, InMemoryLedger, Visit, VisitLedger};
pub use crate::matcher::similar_days;
pub use crate::measure::{Measure, ModelKind};
pub use crate::models::{EstimationModel, ModelState, TrainingSet};
pub use crate::selection::{select, CandidateEstimate, Rationale, Selection, SelectionMode};
pub use crate::time::TimeOfDay;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
