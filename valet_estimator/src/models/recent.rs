//! Schedule-only median over the most recent similar days

use crate::measure::ModelKind;
use crate::models::{EstimationModel, ModelState, TrainingSet, NO_SIMILAR_DATES};
use valet_math::summary::int_median;

/// Ignores today's count and takes the median target of the `window` most
/// recent cohort days (all of them if fewer are available)
#[derive(Debug, Clone)]
pub struct RecentWindowModel {
    window: usize,
    recent: Vec<i64>,
    state: ModelState,
    prediction: Option<i64>,
}

impl RecentWindowModel {
    /// Create a model looking back over `window` days
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            recent: Vec::new(),
            state: ModelState::Uninitialized,
            prediction: None,
        }
    }

    /// Number of days actually used
    pub fn days_used(&self) -> usize {
        self.recent.len()
    }
}

impl EstimationModel for RecentWindowModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Recent
    }

    fn state(&self) -> &ModelState {
        &self.state
    }

    fn fit(&mut self, training: &TrainingSet) {
        if self.state.is_error() {
            return;
        }
        self.recent = training.most_recent_targets(self.window);
        self.state.mark_ready();
    }

    fn guess(&mut self, _bikes_so_far: i64) -> Option<i64> {
        let recent = &self.recent;
        let value = self
            .state
            .guarded(|| int_median(recent).ok_or_else(|| NO_SIMILAR_DATES.to_string()))?;
        self.prediction = Some(value);
        Some(value)
    }

    fn prediction(&self) -> Option<i64> {
        self.prediction
    }
}
