//! Estimator configuration
//!
//! Every field has a default, so an empty TOML file (or
//! [`EstimatorConfig::default`]) gives the stock behaviour.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::buckets::{BucketPartition, DEFAULT_BUCKET_SPEC};
use crate::error::{EstimatorError, Result};
use crate::measure::{Measure, ModelKind};
use crate::selection::SelectionMode;

/// Estimator and backtest settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Before-counts within this many bikes count as a match
    #[serde(default = "default_match_tolerance")]
    pub match_tolerance: f64,
    /// Matched values with a larger |z| are discarded
    #[serde(default = "default_z_cutoff")]
    pub z_cutoff: f64,
    /// Days used by the recent-window model
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
    /// Opening-time tolerance for similar days, minutes
    #[serde(default = "default_time_tolerance")]
    pub open_tolerance: i64,
    /// Closing-time tolerance for similar days, minutes
    #[serde(default = "default_time_tolerance")]
    pub close_tolerance: i64,
    /// Backtest cursor step, minutes
    #[serde(default = "default_step_minutes")]
    pub step_minutes: i64,
    /// Bucket partition spec, e.g. `"0-0.5,0.5-1.0"`
    #[serde(default = "default_bucket_spec")]
    pub time_buckets: String,
    /// Cohorts smaller than this trigger the selection guardrail
    #[serde(default = "default_guard_min_cohort")]
    pub guard_min_cohort: usize,
    #[serde(default)]
    pub selection_mode: SelectionMode,
    #[serde(default)]
    pub confidence: ConfidenceThresholds,
    #[serde(default)]
    pub bands: FallbackBands,
    /// Calibration artifact to load at serving time
    #[serde(default)]
    pub calibration_file: Option<PathBuf>,
    /// Whether to run the ensemble model when it is compiled in
    #[serde(default)]
    pub include_ensemble: bool,
}

fn default_match_tolerance() -> f64 {
    15.0
}

fn default_z_cutoff() -> f64 {
    2.5
}

fn default_recent_window() -> usize {
    30
}

fn default_time_tolerance() -> i64 {
    15
}

fn default_step_minutes() -> i64 {
    30
}

fn default_bucket_spec() -> String {
    DEFAULT_BUCKET_SPEC.to_string()
}

fn default_guard_min_cohort() -> usize {
    4
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            match_tolerance: default_match_tolerance(),
            z_cutoff: default_z_cutoff(),
            recent_window: default_recent_window(),
            open_tolerance: default_time_tolerance(),
            close_tolerance: default_time_tolerance(),
            step_minutes: default_step_minutes(),
            time_buckets: default_bucket_spec(),
            guard_min_cohort: default_guard_min_cohort(),
            selection_mode: SelectionMode::default(),
            confidence: ConfidenceThresholds::default(),
            bands: FallbackBands::default(),
            calibration_file: None,
            include_ensemble: false,
        }
    }
}

impl EstimatorConfig {
    /// Load from a TOML file and validate
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        log::info!("loaded estimator config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Parse TOML text and validate
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EstimatorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could use
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(EstimatorError::InvalidParameter(msg));
        if !self.match_tolerance.is_finite() || self.match_tolerance < 0.0 {
            return invalid(format!(
                "match tolerance must be finite and not negative: {}",
                self.match_tolerance
            ));
        }
        if !self.z_cutoff.is_finite() || self.z_cutoff <= 0.0 {
            return invalid(format!(
                "z cutoff must be finite and positive: {}",
                self.z_cutoff
            ));
        }
        if self.recent_window == 0 {
            return invalid("recent window must be at least one day".to_string());
        }
        if self.open_tolerance < 0 || self.close_tolerance < 0 {
            return invalid("time tolerances must not be negative".to_string());
        }
        if self.step_minutes <= 0 {
            return invalid(format!("step must be positive: {}", self.step_minutes));
        }
        self.bucket_partition()?;
        Ok(())
    }

    /// The configured bucket partition
    pub fn bucket_partition(&self) -> Result<BucketPartition> {
        BucketPartition::parse(&self.time_buckets)
    }

    /// Models to run, in declaration order
    pub fn model_kinds(&self) -> Vec<ModelKind> {
        ModelKind::ALL
            .into_iter()
            .filter(|k| *k != ModelKind::Ensemble || self.include_ensemble)
            .collect()
    }

    /// Confidence level for a cohort of `n` days at `fraction` elapsed
    pub fn confidence_level(&self, n: usize, fraction: f64) -> ConfidenceLevel {
        let meets = |t: &LevelThreshold| n >= t.min_n && fraction >= t.min_frac;
        if meets(&self.confidence.high) {
            ConfidenceLevel::High
        } else if meets(&self.confidence.medium) {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    /// Half-width of the fallback band for `measure` at `level`
    pub fn band(&self, measure: Measure, level: ConfidenceLevel) -> i64 {
        let table = match measure {
            Measure::FurtherArrivals => &self.bands.remainder,
            Measure::NextHourActivity => &self.bands.activity,
            Measure::PeakOccupancy => &self.bands.peak,
            Measure::PeakTime => &self.bands.peaktime,
        };
        table.get(level)
    }
}

/// Qualitative confidence in an uncalibrated estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Confidence percentage reported alongside a fallback band
    pub fn percent(&self) -> u8 {
        match self {
            ConfidenceLevel::High => 80,
            ConfidenceLevel::Medium => 65,
            ConfidenceLevel::Low => 50,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        };
        write!(f, "{name}")
    }
}

/// Minimum cohort size and fraction elapsed for one level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelThreshold {
    pub min_n: usize,
    pub min_frac: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    #[serde(default = "default_high_threshold")]
    pub high: LevelThreshold,
    #[serde(default = "default_medium_threshold")]
    pub medium: LevelThreshold,
}

fn default_high_threshold() -> LevelThreshold {
    LevelThreshold {
        min_n: 12,
        min_frac: 0.4,
    }
}

fn default_medium_threshold() -> LevelThreshold {
    LevelThreshold {
        min_n: 8,
        min_frac: 0.2,
    }
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: default_high_threshold(),
            medium: default_medium_threshold(),
        }
    }
}

/// Band half-widths per confidence level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelBands {
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

impl LevelBands {
    const fn new(high: i64, medium: i64, low: i64) -> Self {
        Self { high, medium, low }
    }

    /// Half-width for `level`
    pub fn get(&self, level: ConfidenceLevel) -> i64 {
        match level {
            ConfidenceLevel::High => self.high,
            ConfidenceLevel::Medium => self.medium,
            ConfidenceLevel::Low => self.low,
        }
    }
}

/// Bands used when no calibration is available. Counts are in bikes, peak
/// time in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackBands {
    #[serde(default = "default_remainder_bands")]
    pub remainder: LevelBands,
    #[serde(default = "default_activity_bands")]
    pub activity: LevelBands,
    #[serde(default = "default_peak_bands")]
    pub peak: LevelBands,
    #[serde(default = "default_peaktime_bands")]
    pub peaktime: LevelBands,
}

fn default_remainder_bands() -> LevelBands {
    LevelBands::new(10, 18, 30)
}

fn default_activity_bands() -> LevelBands {
    LevelBands::new(8, 12, 16)
}

fn default_peak_bands() -> LevelBands {
    LevelBands::new(10, 15, 25)
}

fn default_peaktime_bands() -> LevelBands {
    LevelBands::new(20, 30, 60)
}

impl Default for FallbackBands {
    fn default() -> Self {
        Self {
            remainder: default_remainder_bands(),
            activity: default_activity_bands(),
            peak: default_peak_bands(),
            peaktime: default_peaktime_bands(),
        }
    }
}
