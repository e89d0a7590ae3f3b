//! Ordinary least squares for one predictor
//!
//! Fits `y = slope * x + intercept` from closed-form sums and reports the
//! Pearson correlation when it is defined.

use crate::{MathError, Result};

/// Threshold under which the slope denominator is treated as zero
const DENOMINATOR_EPSILON: f64 = 1e-10;

/// A fitted least-squares line
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresFit {
    points: usize,
    slope: f64,
    intercept: f64,
    correlation: Option<f64>,
}

impl LeastSquaresFit {
    /// Fit a line through `(x, y)` points.
    ///
    /// Fails when there are fewer than two points, when every x is zero, or
    /// when the x values have no spread (the slope denominator vanishes).
    pub fn fit(points: &[(f64, f64)]) -> Result<Self> {
        if points.len() < 2 {
            return Err(MathError::InsufficientData(
                "not enough data points".to_string(),
            ));
        }
        if points.iter().all(|&(x, _)| x == 0.0) {
            return Err(MathError::InvalidInput("all x values are 0".to_string()));
        }

        let n = points.len() as f64;
        let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
        for &(x, y) in points {
            sum_x += x;
            sum_y += y;
            sum_xy += x * y;
            sum_x2 += x * x;
        }

        let denominator = n * sum_x2 - sum_x * sum_x;
        if denominator.abs() < DENOMINATOR_EPSILON {
            return Err(MathError::CalculationError(
                "division error in slope calculation".to_string(),
            ));
        }
        let slope = (n * sum_xy - sum_x * sum_y) / denominator;

        let mean_x = sum_x / n;
        let mean_y = sum_y / n;
        let intercept = mean_y - slope * mean_x;

        // Pearson r, left unset when either variance term is zero
        let mut diff_prod = 0.0;
        let mut x_diff2 = 0.0;
        let mut y_diff2 = 0.0;
        for &(x, y) in points {
            diff_prod += (x - mean_x) * (y - mean_y);
            x_diff2 += (x - mean_x).powi(2);
            y_diff2 += (y - mean_y).powi(2);
        }
        let correlation = if x_diff2 > 0.0 && y_diff2 > 0.0 {
            Some(diff_prod / (x_diff2.sqrt() * y_diff2.sqrt()))
        } else {
            None
        };

        Ok(Self {
            points: points.len(),
            slope,
            intercept,
            correlation,
        })
    }

    /// Predicted y for `x`
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Number of points used in the fit
    pub fn points(&self) -> usize {
        self.points
    }

    /// Fitted slope
    pub fn slope(&self) -> f64 {
        self.slope
    }

    /// Fitted intercept
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Pearson correlation coefficient, if both variances are nonzero
    pub fn correlation(&self) -> Option<f64> {
        self.correlation
    }

    /// Coefficient of determination (r squared), if defined
    pub fn r_squared(&self) -> Option<f64> {
        self.correlation.map(|r| r * r)
    }
}
