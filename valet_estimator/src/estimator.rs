//! Serving-time estimates for a partially observed day
//!
//! [`Estimator::estimate`] matches the target day against earlier days with
//! similar hours, trains every configured model on the cohort's counts at the
//! same clock time, turns each prediction into a [`CandidateEstimate`] with an
//! interval, and picks one candidate per measure.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::buckets::BucketPartition;
use crate::calibration::{CalibrationCache, CalibrationStore};
use crate::config::{ConfidenceLevel, EstimatorConfig};
use crate::counts::{counts_for_time, peak_all_day};
use crate::error::{EstimatorError, Result};
use crate::ledger::{Day, VisitLedger};
use crate::matcher::similar_days;
use crate::measure::{Measure, ModelKind};
use crate::models::{
    build_models, EstimationModel, SimpleModel, SimpleSummary, TrainingPoint, TrainingSet,
    NO_SIMILAR_DATES,
};
use crate::selection::{select, CandidateEstimate, Selection, SelectionContext};
use crate::time::{fraction_elapsed, TimeOfDay, MINUTES_PER_DAY};

/// Confidence reported for intervals built from calibration residuals
pub const CALIBRATED_CONFIDENCE: u8 = 90;

/// Identity given to a target day that is not in the ledger
const UNRECORDED_DAY: i64 = -1;

/// What is known about the day being estimated
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRequest {
    pub date: NaiveDate,
    pub open: TimeOfDay,
    pub close: TimeOfDay,
    /// Cutoff the estimate is made at
    pub as_of: TimeOfDay,
    /// Bikes arrived so far; counted from the ledger when `None`
    pub bikes_so_far: Option<i64>,
}

/// A model that produced nothing for a measure, and why
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFailure {
    pub model: ModelKind,
    pub measure: Measure,
    pub reason: String,
}

/// Candidates and the selected estimate for one measure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureEstimate {
    pub measure: Measure,
    pub candidates: Vec<CandidateEstimate>,
    /// `None` when no model produced a candidate
    pub selection: Option<Selection>,
    /// Similar-days model diagnostics, when it ran
    #[serde(skip)]
    pub simple: Option<SimpleSummary>,
}

impl MeasureEstimate {
    /// Whether no estimate could be made
    pub fn is_unavailable(&self) -> bool {
        self.selection.is_none()
    }

    /// The candidate from one model
    pub fn candidate(&self, model: ModelKind) -> Option<&CandidateEstimate> {
        self.candidates.iter().find(|c| c.model == model)
    }
}

/// Full result of one estimate request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateReport {
    pub date: NaiveDate,
    pub as_of: TimeOfDay,
    pub bikes_so_far: i64,
    pub fraction_elapsed: f64,
    pub bucket: String,
    /// Number of similar days
    pub cohort_n: usize,
    pub confidence_level: ConfidenceLevel,
    pub calibration_used: bool,
    pub estimates: Vec<MeasureEstimate>,
    pub model_failures: Vec<ModelFailure>,
}

impl EstimateReport {
    /// Estimate for one measure
    pub fn estimate(&self, measure: Measure) -> Option<&MeasureEstimate> {
        self.estimates.iter().find(|e| e.measure == measure)
    }

    /// Selected candidate for one measure
    pub fn selected(&self, measure: Measure) -> Option<&Selection> {
        self.estimate(measure)?.selection.as_ref()
    }
}

fn render_value(measure: Measure, value: i64) -> String {
    if measure.is_clock_time() {
        TimeOfDay::from_minutes(value).short()
    } else {
        value.to_string()
    }
}

impl fmt::Display for EstimateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Estimate for {} as of {} ({} bikes so far, {:.0}% of day, bin {})",
            self.date,
            self.as_of,
            self.bikes_so_far,
            self.fraction_elapsed * 100.0,
            self.bucket
        )?;
        writeln!(
            f,
            "Similar days: {}; confidence {}; calibration {}",
            self.cohort_n,
            self.confidence_level,
            if self.calibration_used { "yes" } else { "no" }
        )?;
        for estimate in &self.estimates {
            match &estimate.selection {
                Some(sel) => writeln!(
                    f,
                    "  {:<26} {:>6}  [{} - {}]  {}  ({})",
                    estimate.measure.label(),
                    render_value(estimate.measure, sel.candidate.value),
                    render_value(estimate.measure, sel.candidate.low),
                    render_value(estimate.measure, sel.candidate.high),
                    sel.candidate.model,
                    sel.rationale
                )?,
                None => writeln!(f, "  {:<26} unavailable", estimate.measure.label())?,
            }
        }
        Ok(())
    }
}

/// Produces estimates from a ledger, a configuration and a calibration cache
pub struct Estimator<'a, L: VisitLedger + ?Sized> {
    config: EstimatorConfig,
    partition: BucketPartition,
    ledger: &'a L,
    calibration: &'a CalibrationCache,
}

impl<'a, L: VisitLedger + ?Sized> Estimator<'a, L> {
    /// Validate the configuration and bind the collaborators
    pub fn new(
        config: EstimatorConfig,
        ledger: &'a L,
        calibration: &'a CalibrationCache,
    ) -> Result<Self> {
        config.validate()?;
        let partition = config.bucket_partition()?;
        Ok(Self {
            config,
            partition,
            ledger,
            calibration,
        })
    }

    /// The active configuration
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate every measure for the request.
    ///
    /// Store failures are returned as errors. Model failures are not: the
    /// model simply contributes no candidate and is listed in
    /// `model_failures`.
    pub fn estimate(&self, request: &EstimateRequest) -> Result<EstimateReport> {
        if !request.as_of.is_set() {
            return Err(EstimatorError::InvalidParameter(
                "estimate time is not a valid time".to_string(),
            ));
        }
        let recorded = self.ledger.day_on(request.date)?;
        let target = Day::new(
            recorded.as_ref().map_or(UNRECORDED_DAY, |d| d.id),
            request.date,
            request.open,
            request.close,
        )
        .map_err(|e| EstimatorError::InvalidParameter(e.to_string()))?;

        let bikes_so_far = match (request.bikes_so_far, &recorded) {
            (Some(n), _) => n,
            (None, Some(day)) => {
                counts_for_time(&self.ledger.visits_for_day(day.id)?, request.as_of).before
            }
            (None, None) => 0,
        };

        let history = self.ledger.days_before(request.date)?;
        let cohort = similar_days(
            &history,
            &target,
            self.config.open_tolerance,
            self.config.close_tolerance,
        );

        let mut features = Vec::with_capacity(cohort.len());
        for day in &cohort {
            let visits = self.ledger.visits_for_day(day.id)?;
            let counts = counts_for_time(&visits, request.as_of);
            features.push((*day, counts, peak_all_day(&visits)));
        }

        let fraction = fraction_elapsed(target.open, target.close, request.as_of);
        let level = self.config.confidence_level(cohort.len(), fraction);
        let store = self.calibration.get();
        let bucket = match store.as_deref() {
            Some(store) => store.bucket_for(fraction).to_string(),
            None => self.partition.label_for(fraction).to_string(),
        };
        log::debug!(
            "estimating {} at {}: {} similar days, {} bikes so far, bin {}",
            request.date,
            request.as_of,
            cohort.len(),
            bikes_so_far,
            bucket
        );

        let mut estimates = Vec::with_capacity(Measure::ALL.len());
        let mut model_failures = Vec::new();
        for measure in Measure::ALL {
            let training = TrainingSet::new(
                features
                    .iter()
                    .map(|(day, counts, peak)| TrainingPoint {
                        day: day.id,
                        date: day.date,
                        before: counts.before,
                        target: measure.observe(counts, peak),
                    })
                    .collect(),
            );

            let mut simple_summary = None;
            let mut candidates = Vec::new();
            for kind in self.config.model_kinds() {
                let outcome = match (kind, measure) {
                    (ModelKind::Simple, _) => {
                        let mut model =
                            SimpleModel::new(self.config.match_tolerance, self.config.z_cutoff);
                        let outcome = run_model(&mut model, &training, bikes_so_far);
                        simple_summary = model.summary().copied();
                        outcome
                    }
                    // Peak time is not linear in the before-count; the
                    // regression slot reuses the similar-days median.
                    (ModelKind::Linear, Measure::PeakTime) => simple_summary
                        .map(|s| s.median)
                        .ok_or_else(|| NO_SIMILAR_DATES.to_string()),
                    (ModelKind::Ensemble, Measure::PeakTime) => continue,
                    _ => {
                        let mut models = build_models(
                            &[kind],
                            self.config.match_tolerance,
                            self.config.z_cutoff,
                            self.config.recent_window,
                        );
                        match models.first_mut() {
                            Some(model) if model.available() => {
                                run_model(model.as_mut(), &training, bikes_so_far)
                            }
                            Some(model) => Err(model
                                .state()
                                .error()
                                .unwrap_or("unavailable")
                                .to_string()),
                            None => continue,
                        }
                    }
                };

                match outcome {
                    Ok(value) => candidates.push(self.candidate(
                        kind,
                        measure,
                        value,
                        fraction,
                        level,
                        store.as_deref(),
                    )),
                    Err(reason) => {
                        log::debug!("{kind} gave no {measure} estimate: {reason}");
                        model_failures.push(ModelFailure {
                            model: kind,
                            measure,
                            reason,
                        });
                    }
                }
            }

            let ctx = SelectionContext {
                bucket: Some(bucket.clone()),
                cohort_n: cohort.len(),
                guard_min: self.config.guard_min_cohort,
                recommended: store.as_deref().and_then(|s| s.best_model(measure, fraction)),
                calibration_available: store.is_some(),
            };
            let selection = select(self.config.selection_mode, &candidates, &ctx);
            if selection.is_none() {
                log::info!("{} unavailable for {}", measure.label(), request.date);
            }
            estimates.push(MeasureEstimate {
                measure,
                candidates,
                selection,
                simple: simple_summary,
            });
        }

        Ok(EstimateReport {
            date: request.date,
            as_of: request.as_of,
            bikes_so_far,
            fraction_elapsed: fraction,
            bucket,
            cohort_n: cohort.len(),
            confidence_level: level,
            calibration_used: store.is_some(),
            estimates,
            model_failures,
        })
    }

    /// Attach an interval to a prediction: calibrated residual band if one
    /// exists, otherwise the configured fallback band for the confidence level
    fn candidate(
        &self,
        model: ModelKind,
        measure: Measure,
        value: i64,
        fraction: f64,
        level: ConfidenceLevel,
        store: Option<&CalibrationStore>,
    ) -> CandidateEstimate {
        let upper_bound = if measure.is_clock_time() {
            MINUTES_PER_DAY
        } else {
            i64::MAX
        };
        let band = store
            .filter(|_| measure.is_calibrated())
            .and_then(|s| s.residual_band(model, measure, fraction));

        let (low, high, confidence, calibrated) = match band {
            // residual = prediction - truth, so truth lies in [p - q95, p - q05]
            Some((q05, q95)) => {
                let p = value as f64;
                let low = (p - q95).round() as i64;
                let high = (p - q05).round() as i64;
                (low.min(high), low.max(high), CALIBRATED_CONFIDENCE, true)
            }
            None => {
                let half = self.config.band(measure, level);
                (value - half, value + half, level.percent(), false)
            }
        };

        CandidateEstimate {
            model,
            measure,
            value,
            low: low.clamp(0, upper_bound),
            high: high.clamp(0, upper_bound),
            confidence,
            calibrated,
        }
    }
}

fn run_model(
    model: &mut dyn EstimationModel,
    training: &TrainingSet,
    bikes_so_far: i64,
) -> std::result::Result<i64, String> {
    model.fit(training);
    model.guess(bikes_so_far).ok_or_else(|| {
        model
            .state()
            .error()
            .unwrap_or("no prediction")
            .to_string()
    })
}
