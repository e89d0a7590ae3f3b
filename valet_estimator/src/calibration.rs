//! Calibration artifact, lookups and the serving-time cache
//!
//! The backtest writes a JSON artifact of residual bands and best models per
//! bucket. Serving code reads it through a [`CalibrationStore`], held in a
//! [`CalibrationCache`] that is created once at startup and passed by
//! reference. The cache loads lazily and keeps the store until
//! [`CalibrationCache::clear`] is called; it does not notice when the file on
//! disk changes.

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::buckets::BucketPartition;
use crate::error::{EstimatorError, Result};
use crate::measure::{Measure, ModelKind};

/// Residual quantiles for one (model, measure, bucket); null when uncomputed
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandEntry {
    pub q05: Option<f64>,
    pub q95: Option<f64>,
}

impl BandEntry {
    /// Both quantiles, if computed
    pub fn pair(&self) -> Option<(f64, f64)> {
        self.q05.zip(self.q95)
    }
}

/// Date range a calibration was computed over
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Residual bands: model → measure → bucket label → quantiles
pub type ResidualBands = BTreeMap<ModelKind, BTreeMap<Measure, BTreeMap<String, BandEntry>>>;

/// Best model: measure → bucket label → model (null when no model had samples)
pub type BestModels = BTreeMap<Measure, BTreeMap<String, Option<ModelKind>>>;

/// The persisted calibration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationArtifact {
    pub time_bins: Vec<String>,
    pub models: Vec<ModelKind>,
    pub residual_bands: ResidualBands,
    pub best_model: BestModels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<RunWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    /// Fields this version does not know about, kept for round trips
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CalibrationArtifact {
    /// Parse from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read from a JSON file
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Publish to `path` without leaving a half-written file behind.
    ///
    /// Writes `<path>.new`, reads it back to check it parses, rotates up to
    /// `backups` older copies (`<path>.1` is the newest) and renames the new
    /// file into place. Rotation failures are logged and do not stop the
    /// publish.
    pub fn write_atomic<P: AsRef<Path>>(&self, path: P, backups: usize) -> Result<()> {
        let path = path.as_ref();
        let staged = suffixed(path, "new");

        fs::write(&staged, self.to_json()?)?;
        Self::read(&staged).map_err(|e| {
            EstimatorError::CalibrationError(format!(
                "staged artifact {} does not read back: {e}",
                staged.display()
            ))
        })?;

        if backups > 0 && path.exists() {
            if let Err(e) = rotate_backups(path, backups) {
                log::warn!("could not rotate backups of {}: {e}", path.display());
            }
        }

        fs::rename(&staged, path)?;
        log::info!("wrote calibration artifact {}", path.display());
        Ok(())
    }
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn rotate_backups(path: &Path, backups: usize) -> std::io::Result<()> {
    for i in (1..backups).rev() {
        let older = suffixed(path, &i.to_string());
        if older.exists() {
            fs::rename(&older, suffixed(path, &(i + 1).to_string()))?;
        }
    }
    fs::rename(path, suffixed(path, "1"))
}

/// Read-only lookups over a loaded artifact
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    artifact: CalibrationArtifact,
    partition: BucketPartition,
}

impl CalibrationStore {
    /// Wrap an artifact, checking that its bucket labels form a partition
    pub fn from_artifact(artifact: CalibrationArtifact) -> Result<Self> {
        let partition = BucketPartition::from_labels(&artifact.time_bins).map_err(|e| {
            EstimatorError::CalibrationError(format!("unusable time_bins: {e}"))
        })?;
        Ok(Self {
            artifact,
            partition,
        })
    }

    /// Load and validate a JSON artifact
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_artifact(CalibrationArtifact::read(path)?)
    }

    /// The underlying artifact
    pub fn artifact(&self) -> &CalibrationArtifact {
        &self.artifact
    }

    /// The artifact's buckets
    pub fn partition(&self) -> &BucketPartition {
        &self.partition
    }

    /// Bucket label for a fraction elapsed
    pub fn bucket_for(&self, fraction: f64) -> &str {
        self.partition.label_for(fraction)
    }

    /// `(q05, q95)` of residuals for this model and measure at `fraction`
    pub fn residual_band(
        &self,
        model: ModelKind,
        measure: Measure,
        fraction: f64,
    ) -> Option<(f64, f64)> {
        self.artifact
            .residual_bands
            .get(&model)?
            .get(&measure)?
            .get(self.bucket_for(fraction))?
            .pair()
    }

    /// Recommended model for this measure at `fraction`
    pub fn best_model(&self, measure: Measure, fraction: f64) -> Option<ModelKind> {
        self.artifact
            .best_model
            .get(&measure)?
            .get(self.bucket_for(fraction))
            .copied()
            .flatten()
    }
}

/// Lazily loaded, process-lifetime holder of the calibration store
#[derive(Debug, Default)]
pub struct CalibrationCache {
    path: Option<PathBuf>,
    slot: RwLock<Option<Arc<CalibrationStore>>>,
}

impl CalibrationCache {
    /// A cache that will load `path` on first use
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: Some(path.into()),
            slot: RwLock::new(None),
        }
    }

    /// A cache with no calibration source
    pub fn disabled() -> Self {
        Self::default()
    }

    /// A cache already holding `store`
    pub fn with_store(store: CalibrationStore) -> Self {
        Self {
            path: None,
            slot: RwLock::new(Some(Arc::new(store))),
        }
    }

    /// The configured artifact path
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The store, loading it on first access. `None` means no calibration;
    /// failures are logged and retried on the next call.
    pub fn get(&self) -> Option<Arc<CalibrationStore>> {
        if let Some(store) = self.slot.read().as_ref() {
            return Some(Arc::clone(store));
        }
        let Some(path) = self.path.as_deref() else {
            log::debug!("no calibration file configured");
            return None;
        };

        let mut slot = self.slot.write();
        if let Some(store) = slot.as_ref() {
            return Some(Arc::clone(store));
        }
        match CalibrationStore::load(path) {
            Ok(store) => {
                log::info!(
                    "loaded calibration {} ({} buckets)",
                    path.display(),
                    store.partition().len()
                );
                let store = Arc::new(store);
                *slot = Some(Arc::clone(&store));
                Some(store)
            }
            Err(e) => {
                log::warn!("no calibration: {}: {e}", path.display());
                None
            }
        }
    }

    /// Whether a store is currently held
    pub fn is_loaded(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Drop the held store so the next access reloads
    pub fn clear(&self) {
        *self.slot.write() = None;
    }
}
