//! The quantities being predicted and the models that predict them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::counts::{CutoffCounts, Peak};
use crate::error::EstimatorError;

/// A predicted quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Measure {
    /// Bikes still to arrive today
    #[serde(rename = "fut")]
    FurtherArrivals,
    /// Check-ins plus check-outs in the next hour
    #[serde(rename = "act")]
    NextHourActivity,
    /// Most bikes on site at once today
    #[serde(rename = "peak")]
    PeakOccupancy,
    /// When the day's peak occurs
    #[serde(rename = "peaktime")]
    PeakTime,
}

impl Measure {
    /// Every measure, in reporting order
    pub const ALL: [Measure; 4] = [
        Measure::FurtherArrivals,
        Measure::NextHourActivity,
        Measure::PeakOccupancy,
        Measure::PeakTime,
    ];

    /// Measures whose residuals are calibrated. Peak time is a clock value,
    /// not a count, and is left out.
    pub const CALIBRATED: [Measure; 3] = [
        Measure::FurtherArrivals,
        Measure::NextHourActivity,
        Measure::PeakOccupancy,
    ];

    /// Short key used in calibration artifacts and tables
    pub fn key(&self) -> &'static str {
        match self {
            Measure::FurtherArrivals => "fut",
            Measure::NextHourActivity => "act",
            Measure::PeakOccupancy => "peak",
            Measure::PeakTime => "peaktime",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            Measure::FurtherArrivals => "Further bikes today",
            Measure::NextHourActivity => "Events in the next hour",
            Measure::PeakOccupancy => "Max full today",
            Measure::PeakTime => "Max full today time",
        }
    }

    /// Whether residual bands are computed for this measure
    pub fn is_calibrated(&self) -> bool {
        !matches!(self, Measure::PeakTime)
    }

    /// Whether the value is a clock time in minutes rather than a count
    pub fn is_clock_time(&self) -> bool {
        matches!(self, Measure::PeakTime)
    }

    /// The measure's value for a day, given its counts at a cutoff and its
    /// all-day peak. Peak time is in minutes since midnight.
    pub fn observe(&self, counts: &CutoffCounts, peak: &Peak) -> i64 {
        match self {
            Measure::FurtherArrivals => counts.after,
            Measure::NextHourActivity => counts.next_hour_activity(),
            Measure::PeakOccupancy => peak.occupancy,
            Measure::PeakTime => peak.at.minutes().unwrap_or(0),
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Measure {
    type Err = EstimatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Measure::ALL
            .into_iter()
            .find(|m| m.key() == s.trim())
            .ok_or_else(|| EstimatorError::InvalidParameter(format!("unknown measure: {s}")))
    }
}

/// Identifies a prediction model.
///
/// Declaration order ranks models when calibration errors tie.
/// Interval ties in selection use [`ModelKind::priority`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Similar-days median with outlier trimming
    #[serde(rename = "SM")]
    Simple,
    /// Least-squares regression on the before-count
    #[serde(rename = "LR")]
    Linear,
    /// Median over the most recent similar days, ignoring today's count
    #[serde(rename = "REC")]
    Recent,
    /// Optional bagged regression-tree ensemble
    #[serde(rename = "RF")]
    Ensemble,
}

impl ModelKind {
    /// Every model, in declaration order
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Simple,
        ModelKind::Linear,
        ModelKind::Recent,
        ModelKind::Ensemble,
    ];

    /// Short code used in calibration artifacts and tables
    pub fn code(&self) -> &'static str {
        match self {
            ModelKind::Simple => "SM",
            ModelKind::Linear => "LR",
            ModelKind::Recent => "REC",
            ModelKind::Ensemble => "RF",
        }
    }

    /// Rank used to break interval ties between candidates (lower wins).
    /// Follows the alphabetical order of the model codes.
    pub fn priority(&self) -> usize {
        match self {
            ModelKind::Linear => 0,
            ModelKind::Recent => 1,
            ModelKind::Ensemble => 2,
            ModelKind::Simple => 3,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for ModelKind {
    type Err = EstimatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|m| m.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EstimatorError::InvalidParameter(format!("unknown model: {s}")))
    }
}
