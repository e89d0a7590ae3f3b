//! Least-squares regression of the measure on the before-count

use crate::measure::ModelKind;
use crate::models::{EstimationModel, ModelState, TrainingSet};
use valet_math::LeastSquaresFit;

/// Linear regression model `target = slope * before + intercept`
#[derive(Debug, Clone, Default)]
pub struct LinearModel {
    fit: Option<LeastSquaresFit>,
    state: ModelState,
    prediction: Option<i64>,
}

impl LinearModel {
    /// Create an unfitted model
    pub fn new() -> Self {
        Self::default()
    }

    /// The fitted line, once ready
    pub fn line(&self) -> Option<&LeastSquaresFit> {
        self.fit.as_ref()
    }

    /// Fit directly on `(x, y)` pairs
    pub fn calculate_model(&mut self, xy: &[(f64, f64)]) {
        if self.state.is_error() {
            return;
        }
        match LeastSquaresFit::fit(xy) {
            Ok(fit) => {
                self.fit = Some(fit);
                self.state.mark_ready();
            }
            Err(e) => {
                log::debug!("regression fit failed: {e}");
                self.state.fail(e.reason());
            }
        }
    }
}

impl EstimationModel for LinearModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Linear
    }

    fn state(&self) -> &ModelState {
        &self.state
    }

    fn fit(&mut self, training: &TrainingSet) {
        self.calculate_model(&training.xy());
    }

    fn guess(&mut self, bikes_so_far: i64) -> Option<i64> {
        let fit = self.fit.as_ref();
        let value = self.state.guarded(|| {
            fit.map(|f| f.predict(bikes_so_far as f64).round() as i64)
                .ok_or_else(|| "model not ready, can not guess".to_string())
        })?;
        self.prediction = Some(value);
        Some(value)
    }

    fn prediction(&self) -> Option<i64> {
        self.prediction
    }
}
