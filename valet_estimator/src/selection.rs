//! Picking one reported estimate per measure from the model candidates
//!
//! Two modes are supported. `range_first` takes the narrowest interval.
//! `accuracy_first` follows the calibration's best model for the current
//! bucket when it has a candidate, falls back to a guardrail preferring the
//! similar-days and recent-window models on small or uncalibrated cohorts,
//! and otherwise behaves like `range_first`. Each selection carries a
//! [`Rationale`] naming the rule that fired.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::EstimatorError;
use crate::measure::{Measure, ModelKind};

/// Models the guardrail prefers, in order
pub const GUARDRAIL_ORDER: [ModelKind; 2] = [ModelKind::Simple, ModelKind::Recent];

/// One model's estimate for one measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEstimate {
    pub model: ModelKind,
    pub measure: Measure,
    /// Point prediction (bikes, or minutes since midnight for peak time)
    pub value: i64,
    /// Lower end of the interval
    pub low: i64,
    /// Upper end of the interval
    pub high: i64,
    /// Implied confidence, percent
    pub confidence: u8,
    /// Whether the interval came from calibration residuals
    pub calibrated: bool,
}

impl CandidateEstimate {
    /// Interval span
    pub fn width(&self) -> i64 {
        self.high - self.low
    }
}

/// Candidate ordering: narrower first, then more confident, then model priority
pub fn compare_candidates(a: &CandidateEstimate, b: &CandidateEstimate) -> Ordering {
    a.width()
        .cmp(&b.width())
        .then_with(|| b.confidence.cmp(&a.confidence))
        .then_with(|| a.model.priority().cmp(&b.model.priority()))
}

/// The narrowest candidate under [`compare_candidates`]
pub fn narrowest(candidates: &[CandidateEstimate]) -> Option<&CandidateEstimate> {
    candidates.iter().min_by(|a, b| compare_candidates(a, b))
}

/// How to choose among candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Narrowest interval wins
    RangeFirst,
    /// Calibration first, then guardrail, then narrowest interval
    #[default]
    AccuracyFirst,
}

impl FromStr for SelectionMode {
    type Err = EstimatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "accuracy_first" => Ok(SelectionMode::AccuracyFirst),
            "range_first" => Ok(SelectionMode::RangeFirst),
            other => Err(EstimatorError::InvalidParameter(format!(
                "unknown selection mode: {other}"
            ))),
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::RangeFirst => write!(f, "range_first"),
            SelectionMode::AccuracyFirst => write!(f, "accuracy_first"),
        }
    }
}

/// Which selection rule fired
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rationale {
    /// `range_first` mode
    Legacy { width: i64, confidence: u8 },
    /// The calibration's best model for the bucket had a candidate
    Calibrated { model: ModelKind, bucket: String },
    /// Small cohort or no calibration
    Guardrail { cohort_n: usize, model: ModelKind },
    /// `accuracy_first` with nothing more specific to go on
    NarrowestRange { width: i64, confidence: u8 },
}

impl Rationale {
    /// Stable rule name
    pub fn kind(&self) -> &'static str {
        match self {
            Rationale::Legacy { .. } => "legacy",
            Rationale::Calibrated { .. } => "calibrated",
            Rationale::Guardrail { .. } => "guardrail",
            Rationale::NarrowestRange { .. } => "narrowest_range",
        }
    }
}

impl fmt::Display for Rationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rationale::Legacy { width, confidence } => {
                write!(f, "legacy: narrowest range width {width}; conf {confidence}%")
            }
            Rationale::Calibrated { model, bucket } => {
                write!(f, "calibrated best_model {model} for bin {bucket}")
            }
            Rationale::Guardrail { cohort_n, model } => {
                write!(f, "guardrail: n={cohort_n}; prefer {model}")
            }
            Rationale::NarrowestRange { width, confidence } => {
                write!(f, "narrowest range width {width}; conf {confidence}%")
            }
        }
    }
}

/// What the selector knows about the request
#[derive(Debug, Clone, Default)]
pub struct SelectionContext {
    /// Label of the bucket for the current fraction elapsed
    pub bucket: Option<String>,
    /// Size of the similar-day cohort
    pub cohort_n: usize,
    /// Cohorts below this size trigger the guardrail
    pub guard_min: usize,
    /// The calibration's best model for this measure and bucket
    pub recommended: Option<ModelKind>,
    /// Whether any calibration is loaded
    pub calibration_available: bool,
}

/// A chosen candidate and the rule that chose it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub candidate: CandidateEstimate,
    pub rationale: Rationale,
}

/// Choose one candidate. `None` only when there are no candidates.
pub fn select(
    mode: SelectionMode,
    candidates: &[CandidateEstimate],
    ctx: &SelectionContext,
) -> Option<Selection> {
    match mode {
        SelectionMode::RangeFirst => narrowest(candidates).map(|c| Selection {
            rationale: Rationale::Legacy {
                width: c.width(),
                confidence: c.confidence,
            },
            candidate: c.clone(),
        }),
        SelectionMode::AccuracyFirst => accuracy_first(candidates, ctx),
    }
}

fn accuracy_first(candidates: &[CandidateEstimate], ctx: &SelectionContext) -> Option<Selection> {
    if let (Some(model), Some(bucket)) = (ctx.recommended, ctx.bucket.as_ref()) {
        if let Some(c) = candidates.iter().find(|c| c.model == model) {
            return Some(Selection {
                candidate: c.clone(),
                rationale: Rationale::Calibrated {
                    model,
                    bucket: bucket.clone(),
                },
            });
        }
    }

    if ctx.cohort_n < ctx.guard_min.max(1) || !ctx.calibration_available {
        for model in GUARDRAIL_ORDER {
            if let Some(c) = candidates.iter().find(|c| c.model == model) {
                return Some(Selection {
                    candidate: c.clone(),
                    rationale: Rationale::Guardrail {
                        cohort_n: ctx.cohort_n,
                        model,
                    },
                });
            }
        }
    }

    narrowest(candidates).map(|c| Selection {
        rationale: Rationale::NarrowestRange {
            width: c.width(),
            confidence: c.confidence,
        },
        candidate: c.clone(),
    })
}
