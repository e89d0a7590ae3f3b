//! Summary statistics over small samples
//!
//! Cohorts of similar days are tiny (a few dozen values at most), so every
//! function here works on plain slices and returns `None` for empty input
//! instead of producing NaN.

use statrs::statistics::Statistics;

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().mean())
}

/// Sample standard deviation (n - 1 denominator). Needs at least two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some(values.iter().std_dev())
}

/// Percentile by linear interpolation between order statistics.
///
/// `p` is clamped to `[0, 1]`. The position `p * (n - 1)` is split into an
/// integer index and a fraction, and the two neighbouring order statistics
/// are blended by that fraction.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(percentile_of_sorted(&sorted, p))
}

fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let p = p.clamp(0.0, 1.0);
    let pos = p * (n - 1) as f64;
    let i = pos.floor() as usize;
    let frac = pos - i as f64;
    if i >= n - 1 {
        return sorted[n - 1];
    }
    sorted[i] * (1.0 - frac) + sorted[i + 1] * frac
}

/// Lower and upper percentiles of one sample, sorting only once
pub fn percentile_band(values: &[f64], lo: f64, hi: f64) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some((
        percentile_of_sorted(&sorted, lo),
        percentile_of_sorted(&sorted, hi),
    ))
}

/// Median (the 50th percentile, averaging the middle pair for even lengths)
pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 0.5)
}

/// Median of integer counts, truncated toward zero
pub fn int_median(values: &[i64]) -> Option<i64> {
    let as_f64: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    median(&as_f64).map(|m| m.trunc() as i64)
}

/// Mean of integer counts, truncated toward zero
pub fn int_mean(values: &[i64]) -> Option<i64> {
    let as_f64: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    mean(&as_f64).map(|m| m.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_empty_inputs() {
        assert!(mean(&[]).is_none());
        assert!(median(&[]).is_none());
        assert!(percentile(&[], 0.5).is_none());
        assert!(sample_std_dev(&[1.0]).is_none());
        assert!(int_median(&[]).is_none());
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_abs_diff_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
        assert_abs_diff_eq!(median(&[4.0, 1.0, 2.0, 3.0]).unwrap(), 2.5);
        // Truncation matches the integer summaries the models publish
        assert_eq!(int_median(&[1, 2, 3, 4]), Some(2));
        assert_eq!(int_mean(&[1, 2, 2]), Some(1));
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [0.0, 10.0, 20.0, 30.0, 40.0];
        // pos = 0.05 * 4 = 0.2 -> 0 * 0.8 + 10 * 0.2
        assert_abs_diff_eq!(percentile(&values, 0.05).unwrap(), 2.0, epsilon = 1e-12);
        // pos = 0.95 * 4 = 3.8 -> 30 * 0.2 + 40 * 0.8
        assert_abs_diff_eq!(percentile(&values, 0.95).unwrap(), 38.0, epsilon = 1e-12);
        assert_abs_diff_eq!(percentile(&values, 1.0).unwrap(), 40.0);
        assert_abs_diff_eq!(percentile(&values, -3.0).unwrap(), 0.0);
    }

    #[test]
    fn test_percentile_single_value() {
        assert_eq!(percentile_band(&[7.0], 0.05, 0.95), Some((7.0, 7.0)));
    }

    #[test]
    fn test_sample_std_dev() {
        // mean 5, squared deviations sum to 32, n - 1 = 7
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_abs_diff_eq!(
            sample_std_dev(&values).unwrap(),
            (32.0_f64 / 7.0).sqrt(),
            epsilon = 1e-12
        );
    }
}
