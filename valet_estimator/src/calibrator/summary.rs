//! Residual statistics per (model, measure, bucket)

use std::collections::BTreeMap;

use valet_math::summary::{mean, median, percentile_band};

use crate::buckets::BucketPartition;
use crate::calibration::{BandEntry, BestModels, CalibrationArtifact, ResidualBands, RunWindow};
use crate::calibrator::BacktestOutcome;
use crate::measure::{Measure, ModelKind};

/// Key of one residual group: model, measure, bucket index
pub type GroupKey = (ModelKind, Measure, usize);

/// Summary of one group's signed residuals. Empty groups have `n == 0` and
/// no statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResidualStats {
    pub n: usize,
    pub mae: Option<f64>,
    pub q05: Option<f64>,
    pub q50: Option<f64>,
    pub q95: Option<f64>,
}

impl ResidualStats {
    /// Statistics of a list of signed residuals
    pub fn from_residuals(residuals: &[f64]) -> Self {
        let abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
        let band = percentile_band(residuals, 0.05, 0.95);
        Self {
            n: residuals.len(),
            mae: mean(&abs),
            q05: band.map(|b| b.0),
            q50: median(residuals),
            q95: band.map(|b| b.1),
        }
    }
}

/// Residuals of a backtest grouped for reporting and artifact building
#[derive(Debug, Clone)]
pub struct CalibrationSummary {
    partition: BucketPartition,
    models: Vec<ModelKind>,
    residuals: BTreeMap<GroupKey, Vec<f64>>,
}

impl CalibrationSummary {
    /// Group a backtest's samples
    pub fn from_outcome(
        outcome: &BacktestOutcome,
        partition: BucketPartition,
        models: Vec<ModelKind>,
    ) -> Self {
        let mut residuals: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
        for sample in &outcome.samples {
            residuals
                .entry((sample.model, sample.measure, sample.bucket))
                .or_default()
                .push(sample.residual() as f64);
        }
        Self {
            partition,
            models,
            residuals,
        }
    }

    /// The bucket partition
    pub fn partition(&self) -> &BucketPartition {
        &self.partition
    }

    /// Models in declaration order
    pub fn models(&self) -> &[ModelKind] {
        &self.models
    }

    /// Raw residuals of one group (empty if it had no samples)
    pub fn residuals(&self, model: ModelKind, measure: Measure, bucket: usize) -> &[f64] {
        self.residuals
            .get(&(model, measure, bucket))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Raw statistics of one group
    pub fn stats(&self, model: ModelKind, measure: Measure, bucket: usize) -> ResidualStats {
        ResidualStats::from_residuals(self.residuals(model, measure, bucket))
    }

    /// Lowest-MAE model for a measure and bucket over raw residuals, with its
    /// MAE. Ties go to the earlier model.
    pub fn best_model(&self, measure: Measure, bucket: usize) -> Option<(ModelKind, f64)> {
        best_of(&self.models, |model| {
            mean_abs(self.residuals(model, measure, bucket))
        })
    }

    /// Residual groups with empty buckets filled from the nearest bucket that
    /// has samples, by index distance. Equidistant neighbours are pooled.
    /// Groups with no samples in any bucket stay empty.
    pub fn backfilled(&self) -> BTreeMap<GroupKey, Vec<f64>> {
        let mut filled = BTreeMap::new();
        for &model in &self.models {
            for measure in Measure::CALIBRATED {
                let raw: Vec<&[f64]> = (0..self.partition.len())
                    .map(|b| self.residuals(model, measure, b))
                    .collect();
                for (b, values) in fill_nearest(&raw).into_iter().enumerate() {
                    filled.insert((model, measure, b), values);
                }
            }
        }
        filled
    }

    /// Build the recommended calibration artifact from backfilled groups
    pub fn to_artifact(
        &self,
        window: RunWindow,
        comment: Option<String>,
        duration_seconds: Option<f64>,
    ) -> CalibrationArtifact {
        let filled = self.backfilled();
        let labels = self.partition.labels();
        let group = |model: ModelKind, measure: Measure, b: usize| {
            filled
                .get(&(model, measure, b))
                .map(Vec::as_slice)
                .unwrap_or(&[])
        };

        let mut residual_bands = ResidualBands::new();
        for &model in &self.models {
            let per_measure = residual_bands.entry(model).or_default();
            for measure in Measure::CALIBRATED {
                let per_bucket = per_measure.entry(measure).or_default();
                for (b, label) in labels.iter().enumerate() {
                    let entry = percentile_band(group(model, measure, b), 0.05, 0.95)
                        .map(|(q05, q95)| BandEntry {
                            q05: Some(round2(q05)),
                            q95: Some(round2(q95)),
                        })
                        .unwrap_or_default();
                    per_bucket.insert(label.clone(), entry);
                }
            }
        }

        let mut best_model = BestModels::new();
        for measure in Measure::CALIBRATED {
            let per_bucket = best_model.entry(measure).or_default();
            for (b, label) in labels.iter().enumerate() {
                let best = best_of(&self.models, |model| mean_abs(group(model, measure, b)));
                per_bucket.insert(label.clone(), best.map(|(model, _)| model));
            }
        }

        CalibrationArtifact {
            time_bins: labels,
            models: self.models.clone(),
            residual_bands,
            best_model,
            creation_date: Some(chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()),
            comment,
            window: Some(window),
            duration_seconds,
            extra: BTreeMap::new(),
        }
    }
}

fn mean_abs(values: &[f64]) -> Option<f64> {
    let abs: Vec<f64> = values.iter().map(|v| v.abs()).collect();
    mean(&abs)
}

fn best_of(
    models: &[ModelKind],
    score: impl Fn(ModelKind) -> Option<f64>,
) -> Option<(ModelKind, f64)> {
    let mut best: Option<(ModelKind, f64)> = None;
    for &model in models {
        if let Some(mae) = score(model) {
            if best.map_or(true, |(_, b)| mae < b) {
                best = Some((model, mae));
            }
        }
    }
    best
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Fill each empty slot from its nearest non-empty neighbour
pub fn fill_nearest(groups: &[&[f64]]) -> Vec<Vec<f64>> {
    (0..groups.len())
        .map(|i| {
            if !groups[i].is_empty() {
                return groups[i].to_vec();
            }
            let left = (0..i).rev().find(|&j| !groups[j].is_empty());
            let right = (i + 1..groups.len()).find(|&j| !groups[j].is_empty());
            match (left, right) {
                (Some(l), Some(r)) if i - l == r - i => [groups[l], groups[r]].concat(),
                (Some(l), Some(r)) if i - l < r - i => groups[l].to_vec(),
                (_, Some(r)) => groups[r].to_vec(),
                (Some(l), None) => groups[l].to_vec(),
                (None, None) => Vec::new(),
            }
        })
        .collect()
}
