//! Ordinary least squares fit of one response on one predictor.
//!
//! The fit is compiled in with the `regression` feature. Without it,
//! [`fit_ols`] reports [`RegressionError::Unavailable`] and callers are
//! expected to fall back to plain scatter points.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegressionError {
    #[error("regression support is not compiled in")]
    #[cfg_attr(feature = "regression", allow(dead_code))]
    Unavailable,
    #[error("series have different lengths ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },
    #[error("at least 2 points are required, got {0}")]
    TooFewPoints(usize),
    #[error("predictor has zero variance")]
    ZeroVariance,
}

/// y = intercept + slope * x
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub n: usize,
    pub x_min: f64,
    pub x_max: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Endpoints of the fitted line over the observed x range.
    pub fn trendline(&self) -> [[f64; 2]; 2] {
        [
            [self.x_min, self.predict(self.x_min)],
            [self.x_max, self.predict(self.x_max)],
        ]
    }
}

/// Whether [`fit_ols`] can produce a fit in this build.
pub fn is_available() -> bool {
    cfg!(feature = "regression")
}

#[cfg(feature = "regression")]
pub fn fit_ols(xs: &[f64], ys: &[f64]) -> Result<LinearFit, RegressionError> {
    use statrs::statistics::Statistics;

    if xs.len() != ys.len() {
        return Err(RegressionError::LengthMismatch {
            left: xs.len(),
            right: ys.len(),
        });
    }
    let n = xs.len();
    if n < 2 {
        return Err(RegressionError::TooFewPoints(n));
    }

    let mean_x = xs.iter().mean();
    let mean_y = ys.iter().mean();
    let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return Err(RegressionError::ZeroVariance);
    }
    let sxy: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_tot: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
        .sum();
    // A flat response is fitted exactly by a flat line.
    let r_squared = if ss_tot == 0.0 {
        1.0
    } else {
        1.0 - ss_res / ss_tot
    };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
        n,
        x_min: xs.iter().copied().fold(f64::INFINITY, f64::min),
        x_max: xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

#[cfg(not(feature = "regression"))]
pub fn fit_ols(_xs: &[f64], _ys: &[f64]) -> Result<LinearFit, RegressionError> {
    Err(RegressionError::Unavailable)
}

#[cfg(all(test, feature = "regression"))]
mod tests {
    use super::*;

    #[test]
    fn test_fit_exact_line() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [3.0, 5.0, 7.0, 9.0];
        let fit = fit_ols(&xs, &ys).unwrap();

        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert_eq!(fit.trendline(), [[1.0, 3.0], [4.0, 9.0]]);
    }

    #[test]
    fn test_fit_noisy_points() {
        let xs = [20.0, 25.0, 30.0];
        let ys = [15.0, 14.0, 19.0];
        let fit = fit_ols(&xs, &ys).unwrap();

        // sxy = (-5)(-1) + 0 + 5(3) = 20, sxx = 50
        assert!((fit.slope - 0.4).abs() < 1e-12);
        assert!((fit.intercept - 6.0).abs() < 1e-12);
        assert!(fit.r_squared > 0.0 && fit.r_squared < 1.0);
        assert_eq!(fit.n, 3);
    }

    #[test]
    fn test_fit_flat_response() {
        let fit = fit_ols(&[20.0, 25.0, 30.0], &[15.0, 15.0, 15.0]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 15.0);
    }

    #[test]
    fn test_fit_rejects_degenerate_input() {
        assert_eq!(
            fit_ols(&[5.0, 5.0], &[1.0, 2.0]),
            Err(RegressionError::ZeroVariance)
        );
        assert_eq!(fit_ols(&[1.0], &[1.0]), Err(RegressionError::TooFewPoints(1)));
        assert_eq!(
            fit_ols(&[1.0, 2.0], &[1.0]),
            Err(RegressionError::LengthMismatch { left: 2, right: 1 })
        );
    }

    #[test]
    fn test_is_available() {
        assert!(is_available());
    }
}
