//! Similar-days median with outlier trimming

use crate::measure::ModelKind;
use crate::models::{EstimationModel, ModelState, TrainingSet, NO_SIMILAR_DATES};
use valet_math::discard_outliers;
use valet_math::summary::{int_mean, int_median};

/// Summary of the trimmed matched values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleSummary {
    /// Smallest kept value
    pub min: i64,
    /// Largest kept value
    pub max: i64,
    /// Mean of kept values, truncated
    pub mean: i64,
    /// Median of kept values, truncated
    pub median: i64,
    /// Points whose before-count matched (or the whole cohort on fallback)
    pub num_points: usize,
    /// Points dropped as outliers
    pub num_discarded: usize,
    /// True when nothing matched and the whole cohort was used
    pub fell_back: bool,
}

/// Matches cohort days with a similar before-count and summarises their
/// targets
#[derive(Debug, Clone)]
pub struct SimpleModel {
    tolerance: f64,
    z_cutoff: f64,
    training: TrainingSet,
    state: ModelState,
    summary: Option<SimpleSummary>,
}

impl SimpleModel {
    /// Create a model matching before-counts within `tolerance` and trimming
    /// at `z_cutoff`
    pub fn new(tolerance: f64, z_cutoff: f64) -> Self {
        Self {
            tolerance,
            z_cutoff,
            training: TrainingSet::default(),
            state: ModelState::Uninitialized,
            summary: None,
        }
    }

    /// Summary from the last successful guess
    pub fn summary(&self) -> Option<&SimpleSummary> {
        self.summary.as_ref()
    }
}

/// Match, fall back, trim and summarise
fn summarise(
    training: &TrainingSet,
    tolerance: f64,
    z_cutoff: f64,
    bikes_so_far: i64,
) -> Result<SimpleSummary, String> {
    if training.is_empty() {
        return Err(NO_SIMILAR_DATES.to_string());
    }

    let mut matched: Vec<i64> = training
        .points()
        .iter()
        .filter(|p| ((bikes_so_far - p.before) as f64).abs() <= tolerance)
        .map(|p| p.target)
        .collect();
    let fell_back = matched.is_empty();
    if fell_back {
        log::debug!(
            "no cohort day within {} of {bikes_so_far}; using all {} days",
            tolerance,
            training.len()
        );
        matched = training.targets();
    }

    let trimmed = discard_outliers(&matched, z_cutoff);
    let kept = &trimmed.kept;
    let (Some(&min), Some(&max), Some(mean), Some(median)) = (
        kept.iter().min(),
        kept.iter().max(),
        int_mean(kept),
        int_median(kept),
    ) else {
        return Err(NO_SIMILAR_DATES.to_string());
    };

    Ok(SimpleSummary {
        min,
        max,
        mean,
        median,
        num_points: matched.len(),
        num_discarded: trimmed.discarded,
        fell_back,
    })
}

impl EstimationModel for SimpleModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Simple
    }

    fn state(&self) -> &ModelState {
        &self.state
    }

    fn fit(&mut self, training: &TrainingSet) {
        if self.state.is_error() {
            return;
        }
        self.training = training.clone();
        self.state.mark_ready();
    }

    fn guess(&mut self, bikes_so_far: i64) -> Option<i64> {
        let (training, tolerance, z_cutoff) = (&self.training, self.tolerance, self.z_cutoff);
        let summary = self
            .state
            .guarded(|| summarise(training, tolerance, z_cutoff, bikes_so_far))?;
        self.summary = Some(summary);
        Some(summary.median)
    }

    fn prediction(&self) -> Option<i64> {
        self.summary.map(|s| s.median)
    }
}
