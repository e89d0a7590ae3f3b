//! Optional bagged regression-tree ensemble
//!
//! Compiled in with the `ensemble` cargo feature. Without it the model still
//! exists but reports `available() == false` and sits in the error state with
//! reason "missing modules", so callers simply get no candidate from it.

use crate::measure::ModelKind;
use crate::models::{EstimationModel, ModelState, TrainingSet};

/// Trees in the ensemble
pub const NUM_TREES: usize = 100;

/// Seed for the bootstrap sampler, fixed so results are repeatable
pub const SEED: u64 = 0;

/// Bagged regression trees on the before-count
#[derive(Debug, Clone)]
pub struct EnsembleModel {
    state: ModelState,
    #[cfg(feature = "ensemble")]
    forest: Option<forest::Forest>,
    prediction: Option<i64>,
}

impl Default for EnsembleModel {
    fn default() -> Self {
        Self::new()
    }
}

impl EnsembleModel {
    /// Create the model, or a placeholder in the error state when the
    /// feature is off
    pub fn new() -> Self {
        let state = if Self::is_compiled_in() {
            ModelState::Uninitialized
        } else {
            ModelState::Error(super::MISSING_MODULES.to_string())
        };
        Self {
            state,
            #[cfg(feature = "ensemble")]
            forest: None,
            prediction: None,
        }
    }

    /// Whether this build includes the ensemble
    pub fn is_compiled_in() -> bool {
        cfg!(feature = "ensemble")
    }
}

impl EstimationModel for EnsembleModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Ensemble
    }

    fn state(&self) -> &ModelState {
        &self.state
    }

    #[cfg(feature = "ensemble")]
    fn fit(&mut self, training: &TrainingSet) {
        if self.state.is_error() {
            return;
        }
        let xy = training.xy();
        if xy.len() < 2 {
            self.state.fail("not enough data points");
            return;
        }
        self.forest = Some(forest::Forest::fit(&xy, NUM_TREES, SEED));
        self.state.mark_ready();
    }

    #[cfg(not(feature = "ensemble"))]
    fn fit(&mut self, _training: &TrainingSet) {}

    #[cfg(feature = "ensemble")]
    fn guess(&mut self, bikes_so_far: i64) -> Option<i64> {
        let forest = self.forest.as_ref();
        let value = self.state.guarded(|| {
            forest
                .map(|f| f.predict(bikes_so_far as f64).round() as i64)
                .ok_or_else(|| "model not ready, can not guess".to_string())
        })?;
        self.prediction = Some(value);
        Some(value)
    }

    #[cfg(not(feature = "ensemble"))]
    fn guess(&mut self, _bikes_so_far: i64) -> Option<i64> {
        None
    }

    fn prediction(&self) -> Option<i64> {
        self.prediction
    }

    fn available(&self) -> bool {
        Self::is_compiled_in()
    }
}

#[cfg(feature = "ensemble")]
mod forest {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const MAX_DEPTH: usize = 8;
    const MIN_SPLIT: usize = 2;

    #[derive(Debug, Clone)]
    enum Node {
        Leaf(f64),
        Split {
            threshold: f64,
            left: Box<Node>,
            right: Box<Node>,
        },
    }

    impl Node {
        fn predict(&self, x: f64) -> f64 {
            match self {
                Node::Leaf(value) => *value,
                Node::Split {
                    threshold,
                    left,
                    right,
                } => {
                    if x <= *threshold {
                        left.predict(x)
                    } else {
                        right.predict(x)
                    }
                }
            }
        }
    }

    fn mean_y(points: &[(f64, f64)]) -> f64 {
        points.iter().map(|p| p.1).sum::<f64>() / points.len() as f64
    }

    /// Grow a tree on points sorted by x, splitting where squared error drops most
    fn grow(points: &mut [(f64, f64)], depth: usize) -> Node {
        let leaf = Node::Leaf(mean_y(points));
        if depth >= MAX_DEPTH || points.len() < MIN_SPLIT {
            return leaf;
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = points.len();
        let total: f64 = points.iter().map(|p| p.1).sum();
        let total_sq: f64 = points.iter().map(|p| p.1 * p.1).sum();
        let parent_sse = total_sq - total * total / n as f64;

        let mut best: Option<(usize, f64)> = None;
        let (mut left_sum, mut left_sq) = (0.0, 0.0);
        for i in 1..n {
            let y = points[i - 1].1;
            left_sum += y;
            left_sq += y * y;
            if points[i - 1].0 == points[i].0 {
                continue;
            }
            let (nl, nr) = (i as f64, (n - i) as f64);
            let right_sum = total - left_sum;
            let right_sq = total_sq - left_sq;
            let sse =
                (left_sq - left_sum * left_sum / nl) + (right_sq - right_sum * right_sum / nr);
            if best.map_or(true, |(_, b)| sse < b) {
                best = Some((i, sse));
            }
        }

        match best {
            Some((i, sse)) if sse < parent_sse => {
                let threshold = (points[i - 1].0 + points[i].0) / 2.0;
                let (left, right) = points.split_at_mut(i);
                Node::Split {
                    threshold,
                    left: Box::new(grow(left, depth + 1)),
                    right: Box::new(grow(right, depth + 1)),
                }
            }
            _ => leaf,
        }
    }

    #[derive(Debug, Clone)]
    pub(super) struct Forest {
        trees: Vec<Node>,
    }

    impl Forest {
        pub(super) fn fit(points: &[(f64, f64)], num_trees: usize, seed: u64) -> Self {
            let mut rng = StdRng::seed_from_u64(seed);
            let trees = (0..num_trees)
                .map(|_| {
                    let mut sample: Vec<(f64, f64)> = (0..points.len())
                        .map(|_| points[rng.gen_range(0..points.len())])
                        .collect();
                    grow(&mut sample, 0)
                })
                .collect();
            Self { trees }
        }

        pub(super) fn predict(&self, x: f64) -> f64 {
            self.trees.iter().map(|t| t.predict(x)).sum::<f64>() / self.trees.len() as f64
        }
    }
}
