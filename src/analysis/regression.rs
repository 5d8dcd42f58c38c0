// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Ordinary least squares fit of a straight line.

use getset::CopyGetters;
use serde::Serialize;

/// Result of fitting `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct LinearFit {
    slope: f64,
    intercept: f64,
    /// Pearson correlation coefficient.
    r: f64,
    /// Standard error of the slope. NaN if the fit has no degrees of freedom.
    slope_stderr: f64,
    /// Standard error of the intercept. NaN if the fit has no degrees of freedom.
    intercept_stderr: f64,
    /// Number of points used for the fit.
    n_points: usize,
}

impl LinearFit {
    /// Fit a straight line through the points.
    ///
    /// If `x` and `y` have different lengths, the trailing values of the longer slice are ignored.
    /// Returns `None` if there are fewer than 2 points or all `x` values are identical.
    /// The correlation coefficient of a constant `y` is zero.
    pub fn fit(x: &[f64], y: &[f64]) -> Option<LinearFit> {
        let n = x.len().min(y.len());
        if n < 2 {
            return None;
        }

        let (x, y) = (&x[..n], &y[..n]);
        let nf = n as f64;
        let x_mean = x.iter().sum::<f64>() / nf;
        let y_mean = y.iter().sum::<f64>() / nf;

        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for (&xi, &yi) in x.iter().zip(y.iter()) {
            let dx = xi - x_mean;
            let dy = yi - y_mean;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }

        if !(sxx > 0.0) || !sxx.is_finite() {
            return None;
        }

        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;

        let r = if syy == 0.0 {
            0.0
        } else {
            (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
        };

        let (slope_stderr, intercept_stderr) = if n > 2 {
            let slope_stderr = ((1.0 - r * r) * syy / sxx / (nf - 2.0)).max(0.0).sqrt();
            let mean_square_x = x.iter().map(|v| v * v).sum::<f64>() / nf;
            (slope_stderr, slope_stderr * mean_square_x.sqrt())
        } else {
            (f64::NAN, f64::NAN)
        };

        Some(LinearFit {
            slope,
            intercept,
            r,
            slope_stderr,
            intercept_stderr,
            n_points: n,
        })
    }

    /// Coefficient of determination.
    #[inline(always)]
    pub fn r_squared(&self) -> f64 {
        self.r * self.r
    }

    /// Value of the fitted line at `x`.
    #[inline(always)]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn fit_exact_line() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 2.5 * v - 1.0).collect();

        let fit = LinearFit::fit(&x, &y).unwrap();
        assert_relative_eq!(fit.slope(), 2.5, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept(), -1.0, epsilon = 1e-12);
        assert_relative_eq!(fit.r_squared(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(fit.slope_stderr(), 0.0, epsilon = 1e-6);
        assert_eq!(fit.n_points(), 5);
        assert_relative_eq!(fit.predict(10.0), 24.0, epsilon = 1e-12);
    }

    #[test]
    fn fit_noisy() {
        // reference values calculated using scipy.stats.linregress
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 5.0, 4.0, 5.0];

        let fit = LinearFit::fit(&x, &y).unwrap();
        assert_relative_eq!(fit.slope(), 0.6, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept(), 2.2, epsilon = 1e-12);
        assert_relative_eq!(fit.r(), 0.7745966692414834, epsilon = 1e-12);
        assert_relative_eq!(fit.r_squared(), 0.6, epsilon = 1e-12);
        assert_relative_eq!(fit.slope_stderr(), 0.282842712474619, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept_stderr(), 0.938083151964686, epsilon = 1e-12);
    }

    #[test]
    fn fit_constant_y() {
        let fit = LinearFit::fit(&[0.0, 1.0, 2.0], &[3.0, 3.0, 3.0]).unwrap();
        assert_relative_eq!(fit.slope(), 0.0);
        assert_relative_eq!(fit.intercept(), 3.0);
        assert_relative_eq!(fit.r(), 0.0);
    }

    #[test]
    fn fit_two_points() {
        let fit = LinearFit::fit(&[0.0, 2.0], &[1.0, 5.0]).unwrap();
        assert_relative_eq!(fit.slope(), 2.0);
        assert!(fit.slope_stderr().is_nan());
    }

    #[test]
    fn fit_degenerate() {
        assert!(LinearFit::fit(&[1.0], &[1.0]).is_none());
        assert!(LinearFit::fit(&[], &[]).is_none());
        assert!(LinearFit::fit(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_none());
    }
}
