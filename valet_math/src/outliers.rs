//! Z-score outlier trimming

use crate::summary::{mean, sample_std_dev};

/// Result of trimming a sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trimmed {
    /// Values that survived trimming, in their original order
    pub kept: Vec<i64>,
    /// How many values were removed
    pub discarded: usize,
}

/// Drop values whose z-score exceeds `z_cutoff`.
///
/// The z-score is taken against the sample's own mean and sample standard
/// deviation. Samples of two or fewer values, and samples with zero spread,
/// are returned untouched. If trimming would remove everything the original
/// sample is kept.
pub fn discard_outliers(values: &[i64], z_cutoff: f64) -> Trimmed {
    let untouched = || Trimmed {
        kept: values.to_vec(),
        discarded: 0,
    };

    if values.len() <= 2 {
        return untouched();
    }

    let as_f64: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    let (Some(mu), Some(sigma)) = (mean(&as_f64), sample_std_dev(&as_f64)) else {
        return untouched();
    };
    if sigma == 0.0 {
        return untouched();
    }

    let kept: Vec<i64> = values
        .iter()
        .copied()
        .filter(|&v| ((v as f64 - mu) / sigma).abs() <= z_cutoff)
        .collect();

    if kept.is_empty() {
        return untouched();
    }

    Trimmed {
        discarded: values.len() - kept.len(),
        kept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_far_outlier() {
        // z(1000) is about 1.79 and z(10) about 0.45 for this sample
        let trimmed = discard_outliers(&[10, 10, 10, 10, 1000], 1.5);
        assert_eq!(trimmed.kept, vec![10, 10, 10, 10]);
        assert_eq!(trimmed.discarded, 1);
    }

    #[test]
    fn test_loose_cutoff_keeps_everything() {
        let trimmed = discard_outliers(&[10, 10, 10, 10, 1000], 2.5);
        assert_eq!(trimmed.kept.len(), 5);
        assert_eq!(trimmed.discarded, 0);
    }

    #[test]
    fn test_small_or_flat_samples_untouched() {
        assert_eq!(discard_outliers(&[1, 500], 0.1).kept, vec![1, 500]);
        assert_eq!(discard_outliers(&[4, 4, 4, 4], 0.0).kept, vec![4, 4, 4, 4]);
    }

    #[test]
    fn test_never_empties_the_sample() {
        let trimmed = discard_outliers(&[1, 2, 3], 0.0);
        // only the exact mean (2) has z = 0
        assert_eq!(trimmed.kept, vec![2]);
        let trimmed = discard_outliers(&[1, 3, 1, 3], 0.0);
        assert_eq!(trimmed.kept, vec![1, 3, 1, 3]);
        assert_eq!(trimmed.discarded, 0);
    }
}
