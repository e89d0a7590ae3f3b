mod common;

use approx::assert_abs_diff_eq;
use common::{date, ledger_of, steady_visits};
use pretty_assertions::assert_eq;
use valet_estimator::calibration::RunWindow;
use valet_estimator::calibrator::report::{render_text, summary_rows, write_summary_csv};
use valet_estimator::calibrator::summary::fill_nearest;
use valet_estimator::calibrator::ResidualStats;
use valet_estimator::{
    CalibrationStore, CalibrationSummary, Calibrator, EstimatorConfig, HistorySnapshot,
    InMemoryLedger, Measure, ModelKind,
};

fn two_day_history() -> InMemoryLedger {
    // two identical days, 08:00 to 18:00
    ledger_of(
        date(2024, 6, 3),
        vec![
            steady_visits("08:10", 12, 40, 90),
            steady_visits("08:10", 12, 40, 90),
        ],
    )
}

fn hourly() -> EstimatorConfig {
    EstimatorConfig {
        step_minutes: 60,
        ..EstimatorConfig::default()
    }
}

#[test]
fn test_first_day_has_no_cohort() {
    let ledger = two_day_history();
    let history = HistorySnapshot::load(&ledger, None, None).unwrap();
    let calibrator = Calibrator::new(hourly()).unwrap();
    let outcome = calibrator.run(&history);

    assert_eq!(outcome.days_skipped, 1);
    assert_eq!(outcome.days_replayed, 1);
    assert_eq!(outcome.samples_for(date(2024, 6, 3)).count(), 0);

    // 10 steps x 3 measures x (SM + REC); regression needs two cohort days
    assert_eq!(outcome.samples_for(date(2024, 6, 4)).count(), 60);
    assert!(outcome.samples.iter().all(|s| s.model != ModelKind::Linear));
    assert!(outcome.samples.iter().all(|s| s.measure != Measure::PeakTime));
}

#[test]
fn test_identical_days_give_zero_residuals() {
    let ledger = two_day_history();
    let history = HistorySnapshot::load(&ledger, None, None).unwrap();
    let outcome = Calibrator::new(hourly()).unwrap().run(&history);

    assert!(outcome.samples.iter().all(|s| s.residual() == 0));
    let first = &outcome.samples[0];
    assert_eq!(first.time.to_string(), "08:00");
    assert_eq!(first.fraction, 0.0);
    assert_eq!(first.bucket, 0);
}

#[test]
fn test_backtest_is_deterministic() {
    let ledger = ledger_of(
        date(2024, 6, 1),
        (0..6)
            .map(|i| steady_visits("08:05", 10 + i, 30 + i as i64 * 5, 60))
            .collect(),
    );
    let history = HistorySnapshot::load(&ledger, None, None).unwrap();
    let calibrator = Calibrator::new(hourly()).unwrap();

    let first = calibrator.run(&history);
    let second = calibrator.run(&history);
    assert_eq!(first.samples, second.samples);
    assert!(first.samples.iter().any(|s| s.model == ModelKind::Linear));
    // chronological by target day
    assert!(first.samples.windows(2).all(|w| w[0].date <= w[1].date));
}

#[test]
fn test_history_window_limits_the_cohort() {
    let ledger = ledger_of(
        date(2024, 6, 1),
        (0..4).map(|_| steady_visits("09:00", 5, 60, 30)).collect(),
    );
    let history = HistorySnapshot::load(&ledger, Some(date(2024, 6, 3)), None).unwrap();
    assert_eq!(history.days().len(), 2);

    let outcome = Calibrator::new(hourly()).unwrap().run(&history);
    assert_eq!(outcome.days_skipped, 1);
    assert_eq!(outcome.samples_for(date(2024, 6, 3)).count(), 0);
}

#[test]
fn test_summary_reports_empty_groups() {
    let ledger = two_day_history();
    let history = HistorySnapshot::load(&ledger, None, None).unwrap();
    let config = EstimatorConfig {
        step_minutes: 60,
        time_buckets: "0-0.5,0.5-0.95,0.95-1.0".to_string(),
        ..EstimatorConfig::default()
    };
    let calibrator = Calibrator::new(config).unwrap();
    let outcome = calibrator.run(&history);
    let summary = CalibrationSummary::from_outcome(
        &outcome,
        calibrator.partition().clone(),
        calibrator.models().to_vec(),
    );

    // 3 buckets x 3 measures x 3 models, empty groups included
    let rows = summary_rows(&summary);
    assert_eq!(rows.len(), 27);
    let empty_last = rows
        .iter()
        .filter(|r| r.bin == "0.95-1.00")
        .all(|r| r.n == 0 && r.mae.is_empty());
    assert!(empty_last);
    assert!(rows.iter().filter(|r| r.model == "LR").all(|r| r.n == 0));

    let stats = summary.stats(ModelKind::Simple, Measure::FurtherArrivals, 0);
    assert_eq!(stats.n, 5);
    assert_eq!(stats.mae, Some(0.0));

    // raw best model is absent where nothing was sampled
    assert_eq!(summary.best_model(Measure::FurtherArrivals, 2), None);
    assert_eq!(
        summary.best_model(Measure::FurtherArrivals, 0),
        Some((ModelKind::Simple, 0.0))
    );

    let text = render_text(&summary);
    assert!(text.contains("== Bin 0.95-1.00 =="));
    assert!(text.contains("  LR-fut: n=0"));
    assert!(text.contains("    fut: SM (MAE=0.00)"));
}

#[test]
fn test_artifact_backfills_and_round_trips() {
    let ledger = two_day_history();
    let history = HistorySnapshot::load(&ledger, None, None).unwrap();
    let config = EstimatorConfig {
        step_minutes: 60,
        time_buckets: "0-0.5,0.5-0.95,0.95-1.0".to_string(),
        ..EstimatorConfig::default()
    };
    let calibrator = Calibrator::new(config).unwrap();
    let outcome = calibrator.run(&history);
    let summary = CalibrationSummary::from_outcome(
        &outcome,
        calibrator.partition().clone(),
        calibrator.models().to_vec(),
    );
    let artifact = summary.to_artifact(
        RunWindow {
            start: Some(date(2024, 6, 3)),
            end: Some(date(2024, 6, 4)),
        },
        Some("test run".to_string()),
        Some(0.5),
    );

    assert_eq!(artifact.time_bins, vec!["0.00-0.50", "0.50-0.95", "0.95-1.00"]);
    assert_eq!(
        artifact.models,
        vec![ModelKind::Simple, ModelKind::Linear, ModelKind::Recent]
    );
    // the empty last bucket borrows from its neighbour
    let sm_fut = &artifact.residual_bands[&ModelKind::Simple][&Measure::FurtherArrivals];
    assert_eq!(sm_fut["0.95-1.00"].pair(), Some((0.0, 0.0)));
    // regression never produced a sample anywhere
    let lr_fut = &artifact.residual_bands[&ModelKind::Linear][&Measure::FurtherArrivals];
    assert!(lr_fut.values().all(|b| b.pair().is_none()));
    // ties on MAE go to the earlier model
    assert!(artifact.best_model[&Measure::PeakOccupancy]
        .values()
        .all(|m| *m == Some(ModelKind::Simple)));
    assert!(!artifact.best_model.contains_key(&Measure::PeakTime));

    let json = artifact.to_json().unwrap();
    assert!(json.contains("\"fut\""));
    assert!(json.contains("\"SM\""));
    let store = CalibrationStore::from_artifact(
        valet_estimator::CalibrationArtifact::from_json(&json).unwrap(),
    )
    .unwrap();
    assert_eq!(store.bucket_for(1.0), "0.95-1.00");
    assert_eq!(
        store.best_model(Measure::FurtherArrivals, 0.97),
        Some(ModelKind::Simple)
    );
}

#[test]
fn test_summary_csv_header() {
    let ledger = two_day_history();
    let history = HistorySnapshot::load(&ledger, None, None).unwrap();
    let calibrator = Calibrator::new(hourly()).unwrap();
    let outcome = calibrator.run(&history);
    let summary = CalibrationSummary::from_outcome(
        &outcome,
        calibrator.partition().clone(),
        calibrator.models().to_vec(),
    );

    let mut buf = Vec::new();
    write_summary_csv(&mut buf, &summary).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("bin,model,measure,n,MAE,Q05,Q50,Q95"));
    assert_eq!(lines.next(), Some("0.00-0.20,SM,fut,2,0.000,0.000,0.000,0.000"));
    assert_eq!(lines.next(), Some("0.00-0.20,LR,fut,0,,,,"));
}

#[test]
fn test_residual_stats() {
    let stats = ResidualStats::from_residuals(&[2.0, -1.0, 0.0, 1.0, -2.0]);
    assert_eq!(stats.n, 5);
    assert_abs_diff_eq!(stats.mae.unwrap(), 1.2, epsilon = 1e-12);
    assert_abs_diff_eq!(stats.q05.unwrap(), -1.8, epsilon = 1e-12);
    assert_abs_diff_eq!(stats.q50.unwrap(), 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(stats.q95.unwrap(), 1.8, epsilon = 1e-12);

    assert_eq!(ResidualStats::from_residuals(&[]), ResidualStats::default());
}

#[test]
fn test_fill_nearest() {
    let none: &[f64] = &[];
    let one: &[f64] = &[1.0];
    let three: &[f64] = &[3.0];
    let four: &[f64] = &[4.0];

    let filled = fill_nearest(&[one, none, none, four]);
    assert_eq!(filled, vec![vec![1.0], vec![1.0], vec![4.0], vec![4.0]]);

    // equidistant neighbours are pooled
    let filled = fill_nearest(&[one, none, three]);
    assert_eq!(filled[1], vec![1.0, 3.0]);

    let filled = fill_nearest(&[none, none, three]);
    assert_eq!(filled, vec![vec![3.0], vec![3.0], vec![3.0]]);

    let filled = fill_nearest(&[none, none]);
    assert!(filled.iter().all(Vec::is_empty));
}
