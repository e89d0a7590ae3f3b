//! Time-of-day buckets over the fraction of the operating day elapsed

use crate::error::{EstimatorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bucket spec used when none is configured
pub const DEFAULT_BUCKET_SPEC: &str = "0-0.2,0.2-0.4,0.4-0.6,0.6-0.8,0.8-1.0";

const EPSILON: f64 = 1e-9;

/// A half-open interval `[lo, hi)` of fraction elapsed, with a stable label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBucket {
    /// Inclusive lower bound
    pub lo: f64,
    /// Exclusive upper bound
    pub hi: f64,
    /// Label of the form `"0.20-0.40"`
    pub label: String,
}

impl TimeBucket {
    /// Create a bucket, labelling it from its bounds
    pub fn new(lo: f64, hi: f64) -> Self {
        Self {
            lo,
            hi,
            label: format!("{lo:.2}-{hi:.2}"),
        }
    }

    /// Whether `fraction` falls inside `[lo, hi)`
    pub fn contains(&self, fraction: f64) -> bool {
        self.lo <= fraction && fraction < self.hi
    }
}

/// An ordered set of buckets covering `[0, 1]` without gaps.
///
/// A fraction of exactly 1.0 (or anything past the last bound) belongs to the
/// final bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketPartition {
    buckets: Vec<TimeBucket>,
}

impl BucketPartition {
    /// Validate and wrap a list of buckets
    pub fn new(buckets: Vec<TimeBucket>) -> Result<Self> {
        let Some(first) = buckets.first() else {
            return Err(EstimatorError::InvalidParameter(
                "bucket partition is empty".to_string(),
            ));
        };
        if first.lo.abs() > EPSILON {
            return Err(EstimatorError::InvalidParameter(format!(
                "bucket partition must start at 0, not {}",
                first.lo
            )));
        }
        for bucket in &buckets {
            if !(bucket.lo < bucket.hi) {
                return Err(EstimatorError::InvalidParameter(format!(
                    "bucket {} is empty or inverted",
                    bucket.label
                )));
            }
        }
        for pair in buckets.windows(2) {
            if (pair[0].hi - pair[1].lo).abs() > EPSILON {
                return Err(EstimatorError::InvalidParameter(format!(
                    "gap or overlap between buckets {} and {}",
                    pair[0].label, pair[1].label
                )));
            }
        }
        let last_hi = buckets[buckets.len() - 1].hi;
        if last_hi < 1.0 - EPSILON {
            return Err(EstimatorError::InvalidParameter(format!(
                "bucket partition ends at {last_hi}, short of 1.0"
            )));
        }
        Ok(Self { buckets })
    }

    /// Parse a spec such as `"0-0.25,0.25-0.5,0.5-1.0"`.
    ///
    /// A blank spec gives the default five equal buckets.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let spec = if spec.is_empty() {
            DEFAULT_BUCKET_SPEC
        } else {
            spec
        };
        let buckets = spec
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(parse_range)
            .collect::<Result<Vec<_>>>()?;
        Self::new(buckets)
    }

    /// Rebuild a partition from stored labels such as `"0.00-0.20"`
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        let buckets = labels
            .iter()
            .map(|label| {
                let mut bucket = parse_range(label.as_ref())?;
                bucket.label = label.as_ref().to_string();
                Ok(bucket)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(buckets)
    }

    /// The buckets in order
    pub fn buckets(&self) -> &[TimeBucket] {
        &self.buckets
    }

    /// Labels in order
    pub fn labels(&self) -> Vec<String> {
        self.buckets.iter().map(|b| b.label.clone()).collect()
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Always false for a validated partition
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Index of the bucket holding `fraction`, clamped to `[0, 1]`
    pub fn index_for(&self, fraction: f64) -> usize {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.buckets
            .iter()
            .position(|b| b.contains(fraction))
            .unwrap_or(self.buckets.len() - 1)
    }

    /// The bucket holding `fraction`
    pub fn bucket_for(&self, fraction: f64) -> &TimeBucket {
        &self.buckets[self.index_for(fraction)]
    }

    /// Label of the bucket holding `fraction`
    pub fn label_for(&self, fraction: f64) -> &str {
        &self.bucket_for(fraction).label
    }

    /// Index of the bucket with this label
    pub fn position(&self, label: &str) -> Option<usize> {
        self.buckets.iter().position(|b| b.label == label)
    }
}

impl Default for BucketPartition {
    fn default() -> Self {
        Self {
            buckets: [(0.0, 0.2), (0.2, 0.4), (0.4, 0.6), (0.6, 0.8), (0.8, 1.0)]
                .into_iter()
                .map(|(lo, hi)| TimeBucket::new(lo, hi))
                .collect(),
        }
    }
}

impl FromStr for BucketPartition {
    type Err = EstimatorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for BucketPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = self.labels();
        write!(f, "{}", labels.join(","))
    }
}

fn parse_range(text: &str) -> Result<TimeBucket> {
    let bad = || EstimatorError::InvalidParameter(format!("bad bucket range: {text:?}"));
    let (lo, hi) = text.trim().split_once('-').ok_or_else(bad)?;
    let lo: f64 = lo.trim().parse().map_err(|_| bad())?;
    let hi: f64 = hi.trim().parse().map_err(|_| bad())?;
    if !(0.0..=1.0 + EPSILON).contains(&lo) || hi < 0.0 {
        return Err(bad());
    }
    Ok(TimeBucket::new(lo, hi))
}
