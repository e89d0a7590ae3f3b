//! Backtest calibration
//!
//! Each recorded day in turn plays the target. Its cohort is drawn only from
//! strictly earlier days, a cursor steps from opening to closing, and at each
//! step every model predicts every calibrated measure from the cohort's
//! same-clock-time counts. The signed residuals, grouped by bucket of
//! fraction elapsed, become the calibration artifact.

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::buckets::BucketPartition;
use crate::config::EstimatorConfig;
use crate::counts::{counts_for_time, peak_all_day, CutoffCounts, Peak};
use crate::error::Result;
use crate::ledger::{Day, HistorySnapshot};
use crate::matcher::similar_days;
use crate::measure::{Measure, ModelKind};
use crate::models::{build_models, TrainingPoint, TrainingSet};
use crate::time::{fraction_elapsed, TimeOfDay};

pub mod report;
pub mod summary;

pub use summary::{CalibrationSummary, ResidualStats};

/// One model's prediction of one measure at one cursor step
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub date: NaiveDate,
    pub time: TimeOfDay,
    pub fraction: f64,
    /// Index into the run's bucket partition
    pub bucket: usize,
    pub model: ModelKind,
    pub measure: Measure,
    pub prediction: i64,
    pub truth: i64,
}

impl Sample {
    /// Prediction minus truth
    pub fn residual(&self) -> i64 {
        self.prediction - self.truth
    }

    /// Absolute error
    pub fn abs_error(&self) -> i64 {
        self.residual().abs()
    }
}

/// Everything a backtest produced
#[derive(Debug, Clone, Default)]
pub struct BacktestOutcome {
    /// Samples in chronological order of target day, then cursor time
    pub samples: Vec<Sample>,
    /// Days that had a cohort and were replayed
    pub days_replayed: usize,
    /// Days skipped for lack of any similar earlier day
    pub days_skipped: usize,
}

impl BacktestOutcome {
    /// Samples produced while `date` was the target
    pub fn samples_for(&self, date: NaiveDate) -> impl Iterator<Item = &Sample> {
        self.samples.iter().filter(move |s| s.date == date)
    }
}

/// Runs the backtest over a loaded history snapshot
#[derive(Debug, Clone)]
pub struct Calibrator {
    config: EstimatorConfig,
    partition: BucketPartition,
    models: Vec<ModelKind>,
}

impl Calibrator {
    /// Validate the configuration and prepare a run
    pub fn new(config: EstimatorConfig) -> Result<Self> {
        config.validate()?;
        let partition = config.bucket_partition()?;
        let models = config.model_kinds();
        Ok(Self {
            config,
            partition,
            models,
        })
    }

    /// The bucket partition samples are assigned to
    pub fn partition(&self) -> &BucketPartition {
        &self.partition
    }

    /// Models being evaluated, in declaration order
    pub fn models(&self) -> &[ModelKind] {
        &self.models
    }

    /// Replay every day of `history`, one worker per target day
    pub fn run(&self, history: &HistorySnapshot) -> BacktestOutcome {
        let days = history.days();
        log::info!(
            "backtest over {} days, step {} min, models {:?}",
            days.len(),
            self.config.step_minutes,
            self.models
        );

        let per_day: Vec<Option<Vec<Sample>>> = (0..days.len())
            .into_par_iter()
            .map(|i| self.replay_day(history, &days[i]))
            .collect();

        let mut outcome = BacktestOutcome::default();
        for samples in per_day {
            match samples {
                Some(samples) => {
                    outcome.days_replayed += 1;
                    outcome.samples.extend(samples);
                }
                None => outcome.days_skipped += 1,
            }
        }
        log::info!(
            "backtest done: {} samples from {} days ({} skipped)",
            outcome.samples.len(),
            outcome.days_replayed,
            outcome.days_skipped
        );
        outcome
    }

    /// Samples for one target day, or `None` if it has no cohort
    fn replay_day(&self, history: &HistorySnapshot, target: &Day) -> Option<Vec<Sample>> {
        let cohort = similar_days(
            history.days(),
            target,
            self.config.open_tolerance,
            self.config.close_tolerance,
        );
        if cohort.is_empty() {
            log::debug!("skipping {}: no similar earlier days", target.date);
            return None;
        }

        let target_visits = history.visits(target.id);
        let target_peak = peak_all_day(target_visits);
        let cohort_peaks: Vec<Peak> = cohort
            .iter()
            .map(|d| peak_all_day(history.visits(d.id)))
            .collect();

        let (Some(open), Some(close)) = (target.open.minutes(), target.close.minutes()) else {
            return Some(Vec::new());
        };

        let mut samples = Vec::new();
        let mut t = open;
        while t < close {
            let at = TimeOfDay::from_minutes(t);
            let fraction = fraction_elapsed(target.open, target.close, at);
            let bucket = self.partition.index_for(fraction);

            let truth = counts_for_time(target_visits, at);
            let cohort_counts: Vec<CutoffCounts> = cohort
                .iter()
                .map(|d| counts_for_time(history.visits(d.id), at))
                .collect();

            for measure in Measure::CALIBRATED {
                let training = TrainingSet::new(
                    cohort
                        .iter()
                        .zip(&cohort_counts)
                        .zip(&cohort_peaks)
                        .map(|((day, counts), peak)| TrainingPoint {
                            day: day.id,
                            date: day.date,
                            before: counts.before,
                            target: measure.observe(counts, peak),
                        })
                        .collect(),
                );
                let actual = measure.observe(&truth, &target_peak);

                let mut models = build_models(
                    &self.models,
                    self.config.match_tolerance,
                    self.config.z_cutoff,
                    self.config.recent_window,
                );
                for model in models.iter_mut() {
                    model.fit(&training);
                    if let Some(prediction) = model.guess(truth.before) {
                        samples.push(Sample {
                            date: target.date,
                            time: at,
                            fraction,
                            bucket,
                            model: model.kind(),
                            measure,
                            prediction,
                            truth: actual,
                        });
                    }
                }
            }
            t += self.config.step_minutes;
        }
        Some(samples)
    }
}
