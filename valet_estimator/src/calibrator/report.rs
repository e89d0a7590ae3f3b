//! Tabular and text output of a backtest

use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;

use crate::calibrator::summary::CalibrationSummary;
use crate::calibrator::BacktestOutcome;
use crate::error::Result;
use crate::measure::Measure;

/// One row of the per-sample table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRow {
    pub date: String,
    pub time: String,
    pub frac: String,
    pub model: String,
    pub measure: String,
    pub pred: i64,
    pub truth: i64,
    pub resid: i64,
    pub abs_err: i64,
}

/// One row of the per-(bucket, model, measure) summary table.
/// Statistics are blank for groups with no samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub bin: String,
    pub model: String,
    pub measure: String,
    pub n: usize,
    #[serde(rename = "MAE")]
    pub mae: String,
    #[serde(rename = "Q05")]
    pub q05: String,
    #[serde(rename = "Q50")]
    pub q50: String,
    #[serde(rename = "Q95")]
    pub q95: String,
}

fn fixed3(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_default()
}

/// Per-sample rows in backtest order
pub fn sample_rows(outcome: &BacktestOutcome) -> Vec<SampleRow> {
    outcome
        .samples
        .iter()
        .map(|s| SampleRow {
            date: s.date.to_string(),
            time: s.time.to_string(),
            frac: format!("{:.3}", s.fraction),
            model: s.model.code().to_string(),
            measure: s.measure.key().to_string(),
            pred: s.prediction,
            truth: s.truth,
            resid: s.residual(),
            abs_err: s.abs_error(),
        })
        .collect()
}

/// Summary rows for every bucket, measure and model, empty groups included
pub fn summary_rows(summary: &CalibrationSummary) -> Vec<SummaryRow> {
    let mut rows = Vec::new();
    for (b, bucket) in summary.partition().buckets().iter().enumerate() {
        for measure in Measure::CALIBRATED {
            for &model in summary.models() {
                let stats = summary.stats(model, measure, b);
                rows.push(SummaryRow {
                    bin: bucket.label.clone(),
                    model: model.code().to_string(),
                    measure: measure.key().to_string(),
                    n: stats.n,
                    mae: fixed3(stats.mae),
                    q05: fixed3(stats.q05),
                    q50: fixed3(stats.q50),
                    q95: fixed3(stats.q95),
                });
            }
        }
    }
    rows
}

fn write_rows<W: Write, R: Serialize>(writer: W, rows: &[R]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the per-sample table as CSV
pub fn write_samples_csv<W: Write>(writer: W, outcome: &BacktestOutcome) -> Result<()> {
    write_rows(writer, &sample_rows(outcome))
}

/// Write the summary table as CSV
pub fn write_summary_csv<W: Write>(writer: W, summary: &CalibrationSummary) -> Result<()> {
    write_rows(writer, &summary_rows(summary))
}

/// Human-readable per-bucket report with the best model of each measure
pub fn render_text(summary: &CalibrationSummary) -> String {
    let mut out = String::from("Residual calibration by frac_elapsed bin (per model/measure):\n");
    for (b, bucket) in summary.partition().buckets().iter().enumerate() {
        let _ = writeln!(out, "\n== Bin {} ==", bucket.label);
        for measure in Measure::CALIBRATED {
            for &model in summary.models() {
                let stats = summary.stats(model, measure, b);
                match (stats.mae, stats.q05, stats.q50, stats.q95) {
                    (Some(mae), Some(q05), Some(q50), Some(q95)) => {
                        let _ = writeln!(
                            out,
                            "  {model}-{measure}: n={}  MAE={mae:.2}  Q05={q05:.2}  Q50={q50:.2}  Q95={q95:.2}",
                            stats.n
                        );
                    }
                    _ => {
                        let _ = writeln!(out, "  {model}-{measure}: n=0");
                    }
                }
            }
        }
        let _ = writeln!(out, "  Best model (by MAE):");
        for measure in Measure::CALIBRATED {
            match summary.best_model(measure, b) {
                Some((model, mae)) => {
                    let _ = writeln!(out, "    {measure}: {model} (MAE={mae:.2})");
                }
                None => {
                    let _ = writeln!(out, "    {measure}: n=0");
                }
            }
        }
    }
    out
}
