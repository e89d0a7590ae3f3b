//! Prediction models over a cohort of similar days
//!
//! Every model shares the same lifecycle, tracked by [`ModelState`]:
//! uninitialized until it is given training data, ready once fit, ok after a
//! successful prediction and error on any unrecoverable fault. Error is
//! terminal. Predictions only run from ready or ok; that check lives in
//! [`ModelState::guarded`] so no model can skip it.

use crate::ledger::DayId;
use crate::measure::ModelKind;
use chrono::NaiveDate;
use std::fmt::Debug;

pub mod ensemble;
pub mod linear;
pub mod recent;
pub mod simple;

pub use ensemble::EnsembleModel;
pub use linear::LinearModel;
pub use recent::RecentWindowModel;
pub use simple::{SimpleModel, SimpleSummary};

/// Reason recorded when a model has no cohort to learn from
pub const NO_SIMILAR_DATES: &str = "no similar dates";

/// Reason recorded when an optional model was not compiled in
pub const MISSING_MODULES: &str = "missing modules";

/// Lifecycle of a model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModelState {
    /// No training data supplied yet
    #[default]
    Uninitialized,
    /// Fit and able to predict
    Ready,
    /// Produced a prediction
    Ok,
    /// Failed; no further predictions are attempted
    Error(String),
}

impl ModelState {
    /// Whether a prediction may be attempted
    pub fn can_guess(&self) -> bool {
        matches!(self, ModelState::Ready | ModelState::Ok)
    }

    /// Whether the model has failed
    pub fn is_error(&self) -> bool {
        matches!(self, ModelState::Error(_))
    }

    /// The failure reason, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            ModelState::Error(reason) => Some(reason),
            _ => None,
        }
    }

    /// Move to error unless already there; the first reason wins
    pub fn fail(&mut self, reason: impl Into<String>) {
        if !self.is_error() {
            *self = ModelState::Error(reason.into());
        }
    }

    /// Move to ready after a successful fit. Error stays error.
    pub fn mark_ready(&mut self) {
        if !self.is_error() {
            *self = ModelState::Ready;
        }
    }

    /// Run a prediction if the state allows it and record the outcome.
    ///
    /// From error nothing runs. From uninitialized the model fails with
    /// "model not ready, can not guess". Otherwise `predict` runs and its
    /// result moves the state to ok or error.
    pub fn guarded<T>(
        &mut self,
        predict: impl FnOnce() -> std::result::Result<T, String>,
    ) -> Option<T> {
        match self {
            ModelState::Error(_) => None,
            ModelState::Uninitialized => {
                self.fail("model not ready, can not guess");
                None
            }
            ModelState::Ready | ModelState::Ok => match predict() {
                Ok(value) => {
                    *self = ModelState::Ok;
                    Some(value)
                }
                Err(reason) => {
                    self.fail(reason);
                    None
                }
            },
        }
    }
}

/// One similar day's features at the cutoff clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingPoint {
    /// Day the point came from
    pub day: DayId,
    /// Its date
    pub date: NaiveDate,
    /// Bikes that had arrived by the cutoff on that day
    pub before: i64,
    /// The measure's observed value on that day
    pub target: i64,
}

/// Training data for one measure, one point per similar day
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    points: Vec<TrainingPoint>,
}

impl TrainingSet {
    /// Wrap a list of points
    pub fn new(points: Vec<TrainingPoint>) -> Self {
        Self { points }
    }

    /// The points in cohort order
    pub fn points(&self) -> &[TrainingPoint] {
        &self.points
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether there are no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Before-counts in cohort order
    pub fn befores(&self) -> Vec<i64> {
        self.points.iter().map(|p| p.before).collect()
    }

    /// Target values in cohort order
    pub fn targets(&self) -> Vec<i64> {
        self.points.iter().map(|p| p.target).collect()
    }

    /// `(before, target)` pairs as floats for regression
    pub fn xy(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|p| (p.before as f64, p.target as f64))
            .collect()
    }

    /// Target values of the `n` latest-dated points
    pub fn most_recent_targets(&self, n: usize) -> Vec<i64> {
        let mut by_date: Vec<&TrainingPoint> = self.points.iter().collect();
        by_date.sort_by_key(|p| std::cmp::Reverse(p.date));
        by_date.into_iter().take(n).map(|p| p.target).collect()
    }
}

/// Common contract for every prediction model
pub trait EstimationModel: Debug + Send {
    /// Which model this is
    fn kind(&self) -> ModelKind;

    /// Current lifecycle state
    fn state(&self) -> &ModelState;

    /// Supply training data; moves uninitialized to ready (or error)
    fn fit(&mut self, training: &TrainingSet);

    /// Predict for the current before-count; `None` if the model is, or
    /// becomes, unusable
    fn guess(&mut self, bikes_so_far: i64) -> Option<i64>;

    /// Last successful prediction
    fn prediction(&self) -> Option<i64>;

    /// Whether the implementation is present in this build
    fn available(&self) -> bool {
        true
    }
}

/// Build one model of each kind from the configured parameters
pub fn build_models(
    kinds: &[ModelKind],
    tolerance: f64,
    z_cutoff: f64,
    recent_window: usize,
) -> Vec<Box<dyn EstimationModel>> {
    kinds
        .iter()
        .map(|kind| -> Box<dyn EstimationModel> {
            match kind {
                ModelKind::Simple => Box::new(SimpleModel::new(tolerance, z_cutoff)),
                ModelKind::Linear => Box::new(LinearModel::new()),
                ModelKind::Recent => Box::new(RecentWindowModel::new(recent_window)),
                ModelKind::Ensemble => Box::new(EnsembleModel::new()),
            }
        })
        .collect()
}
