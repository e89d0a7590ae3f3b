//! Backtest calibration job
//!
//! Replays the recorded history, reports residual statistics per bucket of
//! fraction elapsed and writes the calibration artifact the estimator loads.
//!
//! Usage:
//!   calibrate --days-csv <FILE> --visits-csv <FILE> [OPTIONS]
//!
//! Example:
//!   calibrate --days-csv days.csv --visits-csv visits.csv \
//!     --start 2024-01-01 --end 2024-12-31 --step-min 30 \
//!     --output calibration.json --backup 3 --quiet
//!
//! Environment variables:
//! - `RUST_LOG`: Log level (default: info, or warn with `--quiet`)

use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use valet_estimator::calibration::RunWindow;
use valet_estimator::calibrator::report;
use valet_estimator::{
    CalibrationSummary, Calibrator, DataLoader, EstimatorConfig, HistorySnapshot,
};

#[derive(Parser)]
#[command(name = "calibrate")]
#[command(version, about = "Calibrate occupancy estimator models by backtesting history")]
struct Cli {
    /// Days table (id,date,time_open,time_closed)
    #[arg(long)]
    days_csv: PathBuf,

    /// Visits table (day_id,time_in,time_out)
    #[arg(long)]
    visits_csv: PathBuf,

    /// TOML estimator configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// First date of the history window (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date of the history window (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Cursor step in minutes
    #[arg(long)]
    step_min: Option<i64>,

    /// Before-count match tolerance
    #[arg(long)]
    variance: Option<f64>,

    /// Outlier z cutoff
    #[arg(long)]
    zcut: Option<f64>,

    /// Opening-time tolerance in minutes
    #[arg(long)]
    open_tol: Option<i64>,

    /// Closing-time tolerance in minutes
    #[arg(long)]
    close_tol: Option<i64>,

    /// Window of the recent-days model
    #[arg(long)]
    recent_days: Option<usize>,

    /// Bucket spec, e.g. "0-0.2,0.2-0.4,0.4-0.6,0.6-0.8,0.8-1.0"
    #[arg(long)]
    time_bins: Option<String>,

    /// Include the tree ensemble (needs the `ensemble` feature)
    #[arg(long)]
    include_ensemble: bool,

    /// Write one row per sample to this CSV
    #[arg(long)]
    per_sample_csv: Option<PathBuf>,

    /// Write per-(bin, model, measure) statistics to this CSV
    #[arg(long)]
    summary_csv: Option<PathBuf>,

    /// Publish the calibration artifact JSON here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Older artifacts to keep as <output>.1 .. <output>.N
    #[arg(long, default_value = "0")]
    backup: usize,

    /// Print nothing to stdout (requires --output)
    #[arg(short, long)]
    quiet: bool,

    /// Only check that the history loads
    #[arg(long)]
    validate_only: bool,
}

impl Cli {
    fn estimator_config(&self) -> anyhow::Result<EstimatorConfig> {
        let mut config = match &self.config {
            Some(path) => EstimatorConfig::from_toml_file(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => EstimatorConfig::default(),
        };
        if let Some(v) = self.step_min {
            config.step_minutes = v;
        }
        if let Some(v) = self.variance {
            config.match_tolerance = v;
        }
        if let Some(v) = self.zcut {
            config.z_cutoff = v;
        }
        if let Some(v) = self.open_tol {
            config.open_tolerance = v;
        }
        if let Some(v) = self.close_tol {
            config.close_tolerance = v;
        }
        if let Some(v) = self.recent_days {
            config.recent_window = v;
        }
        if let Some(spec) = &self.time_bins {
            config.time_buckets = spec.clone();
        }
        if self.include_ensemble {
            config.include_ensemble = true;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.quiet && cli.output.is_none() {
        bail!("--quiet requires --output");
    }

    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(if cli.quiet { Level::WARN } else { Level::INFO }),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let started = Instant::now();
    let config = cli.estimator_config()?;
    let ledger = DataLoader::ledger_from_csv(&cli.days_csv, &cli.visits_csv)?;
    let history = HistorySnapshot::load(&ledger, cli.start, cli.end)?;
    if history.days().is_empty() {
        bail!("no days recorded in the requested window");
    }

    if cli.validate_only {
        if !cli.quiet {
            println!("History OK: {} days", history.days().len());
        }
        return Ok(());
    }

    let calibrator = Calibrator::new(config)?;
    let outcome = calibrator.run(&history);
    let summary = CalibrationSummary::from_outcome(
        &outcome,
        calibrator.partition().clone(),
        calibrator.models().to_vec(),
    );

    if let Some(path) = &cli.per_sample_csv {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        report::write_samples_csv(BufWriter::new(file), &outcome)?;
        info!("wrote {} samples to {}", outcome.samples.len(), path.display());
    }
    if let Some(path) = &cli.summary_csv {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        report::write_summary_csv(BufWriter::new(file), &summary)?;
        info!("wrote summary to {}", path.display());
    }

    if !cli.quiet {
        println!("{}", report::render_text(&summary));
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let duration = (started.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;
    let artifact = summary.to_artifact(
        RunWindow {
            start: cli.start,
            end: cli.end,
        },
        Some(format!("calibrate args: {}", args.join(" "))),
        Some(duration),
    );

    match &cli.output {
        Some(path) => artifact.write_atomic(path, cli.backup)?,
        None => {
            println!("\nBEGIN RECOMMENDED CONFIG JSON");
            println!("{}", artifact.to_json()?);
            println!("END RECOMMENDED CONFIG JSON\n");
        }
    }
    Ok(())
}
