//! Statistics Calculator Module
//! Pearson correlation, its significance and the correlation matrix used by
//! the heatmap.

use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;
use thiserror::Error;

/// Significance threshold for the correlation t-test
pub const SIGNIFICANCE_THRESHOLD: f64 = 0.05;

/// Relative tolerance under which a variance counts as zero.
const VARIANCE_EPSILON: f64 = 1e-12;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("series have different lengths ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },
    #[error("at least 2 points are required, got {0}")]
    TooFewPoints(usize),
    #[error("one of the series has zero variance")]
    ZeroVariance,
    #[error("series contain non-finite values")]
    NonFinite,
}

/// Correlation between two named series.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationResult {
    pub coefficient: f64,
    pub n: usize,
    pub p_value: Option<f64>,
}

impl CorrelationResult {
    pub fn is_significant(&self) -> bool {
        self.p_value.is_some_and(|p| p <= SIGNIFICANCE_THRESHOLD)
    }
}

/// Pairwise correlations over a set of columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// `None` where the correlation is undefined.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let r = self.labels.iter().position(|l| l == row)?;
        let c = self.labels.iter().position(|l| l == col)?;
        self.values[r][c]
    }
}

/// Handles correlation statistics.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Pearson correlation coefficient of two aligned series.
    pub fn pearson(xs: &[f64], ys: &[f64]) -> Result<f64, StatsError> {
        if xs.len() != ys.len() {
            return Err(StatsError::LengthMismatch {
                left: xs.len(),
                right: ys.len(),
            });
        }
        if xs.len() < 2 {
            return Err(StatsError::TooFewPoints(xs.len()));
        }
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            return Err(StatsError::NonFinite);
        }

        let var_x = xs.iter().variance();
        let var_y = ys.iter().variance();
        if Self::is_zero_variance(var_x, xs) || Self::is_zero_variance(var_y, ys) {
            return Err(StatsError::ZeroVariance);
        }

        let cov = xs.iter().covariance(ys.iter());
        let r = cov / (var_x.sqrt() * var_y.sqrt());
        Ok(r.clamp(-1.0, 1.0))
    }

    /// Two-tailed p-value of `r` under H0: rho = 0, with n - 2 degrees of freedom.
    pub fn correlation_significance(r: f64, n: usize) -> Option<f64> {
        if n < 3 || r.is_nan() {
            return None;
        }
        let df = (n - 2) as f64;
        let denom = 1.0 - r * r;
        if denom <= 0.0 {
            return Some(0.0);
        }

        let t = r * (df / denom).sqrt();
        StudentsT::new(0.0, 1.0, df)
            .ok()
            .map(|dist| 2.0 * (1.0 - dist.cdf(t.abs())))
    }

    /// Pearson coefficient with its p-value.
    pub fn correlate(xs: &[f64], ys: &[f64]) -> Result<CorrelationResult, StatsError> {
        let coefficient = Self::pearson(xs, ys)?;
        Ok(CorrelationResult {
            coefficient,
            n: xs.len(),
            p_value: Self::correlation_significance(coefficient, xs.len()),
        })
    }

    /// Pairwise correlation of columns, using rows where both values exist.
    pub fn correlation_matrix(columns: &[(String, Vec<Option<f64>>)]) -> CorrelationMatrix {
        let labels: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
        let values = columns
            .iter()
            .map(|(_, a)| {
                columns
                    .iter()
                    .map(|(_, b)| {
                        let (xs, ys): (Vec<f64>, Vec<f64>) = a
                            .iter()
                            .zip(b.iter())
                            .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                            .filter(|(x, y)| x.is_finite() && y.is_finite())
                            .unzip();
                        Self::pearson(&xs, &ys).ok()
                    })
                    .collect()
            })
            .collect();

        CorrelationMatrix { labels, values }
    }

    /// Variance negligible relative to the magnitude of the values themselves.
    fn is_zero_variance(variance: f64, values: &[f64]) -> bool {
        if values.windows(2).all(|w| w[0] == w[1]) {
            return true;
        }
        let scale = values.iter().map(|v| v.abs()).fold(0.0_f64, f64::max);
        variance <= VARIANCE_EPSILON * scale * scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pearson_identical_series() {
        let xs = [1.0, 2.5, 4.0, 7.0, 11.0];
        let r = StatsCalculator::pearson(&xs, &xs).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_negative_relation() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [8.0, 6.0, 4.0, 2.0];
        let r = StatsCalculator::pearson(&xs, &ys).unwrap();
        assert!((r + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_known_value() {
        let xs = [1.0, 2.0, 3.0];
        let ys = [1.0, 3.0, 2.0];
        let r = StatsCalculator::pearson(&xs, &ys).unwrap();
        assert!((r - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_constant_series_is_undefined() {
        let xs = [15.0, 15.0, 15.0];
        let ys = [20.0, 25.0, 30.0];
        assert_eq!(
            StatsCalculator::pearson(&xs, &ys),
            Err(StatsError::ZeroVariance)
        );
        assert_eq!(
            StatsCalculator::pearson(&ys, &[0.1, 0.1, 0.1]),
            Err(StatsError::ZeroVariance)
        );
    }

    #[test]
    fn test_pearson_small_magnitude_series() {
        let xs = [1e-7, 2e-7, 3e-7, 5e-7];
        let r = StatsCalculator::pearson(&xs, &xs).unwrap();
        assert!((r - 1.0).abs() < 1e-9);

        let ys = [4e-9, 3e-9, 2e-9, 0.0];
        let r = StatsCalculator::pearson(&xs, &ys).unwrap();
        assert!(r < -0.9);
    }

    #[test]
    fn test_pearson_rejects_non_finite_values() {
        assert_eq!(
            StatsCalculator::pearson(&[1.0, 2.0, f64::NAN], &[3.0, 4.0, 5.0]),
            Err(StatsError::NonFinite)
        );
        assert_eq!(
            StatsCalculator::pearson(&[1.0, 2.0], &[f64::INFINITY, 4.0]),
            Err(StatsError::NonFinite)
        );
    }

    #[test]
    fn test_pearson_needs_two_points() {
        assert_eq!(
            StatsCalculator::pearson(&[1.0], &[2.0]),
            Err(StatsError::TooFewPoints(1))
        );
        assert_eq!(
            StatsCalculator::pearson(&[], &[]),
            Err(StatsError::TooFewPoints(0))
        );
    }

    #[test]
    fn test_pearson_length_mismatch() {
        assert!(matches!(
            StatsCalculator::pearson(&[1.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(StatsError::LengthMismatch { left: 2, right: 3 })
        ));
    }

    #[test]
    fn test_correlation_significance() {
        assert_eq!(StatsCalculator::correlation_significance(0.9, 2), None);
        assert_eq!(StatsCalculator::correlation_significance(1.0, 5), Some(0.0));

        let p = StatsCalculator::correlation_significance(0.0, 10).unwrap();
        assert!((p - 1.0).abs() < 1e-9);

        // r = 0.5, n = 3 -> t = 0.5 * sqrt(1 / 0.75), df = 1
        let p = StatsCalculator::correlation_significance(0.5, 3).unwrap();
        assert!((p - 0.666_666_666_7).abs() < 1e-6);
    }

    #[test]
    fn test_correlate_reports_significance() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + (x * 1.7).sin()).collect();
        let result = StatsCalculator::correlate(&xs, &ys).unwrap();
        assert_eq!(result.n, 20);
        assert!(result.coefficient > 0.99);
        assert!(result.is_significant());
    }

    #[test]
    fn test_correlation_matrix() {
        let columns = vec![
            ("a".to_string(), vec![Some(1.0), Some(2.0), Some(3.0), None]),
            ("b".to_string(), vec![Some(2.0), Some(4.0), Some(6.0), Some(1.0)]),
            ("c".to_string(), vec![Some(5.0), Some(5.0), Some(5.0), Some(5.0)]),
        ];
        let matrix = StatsCalculator::correlation_matrix(&columns);

        assert_eq!(matrix.labels, vec!["a", "b", "c"]);
        assert!((matrix.get("a", "b").unwrap() - 1.0).abs() < 1e-9);
        assert!((matrix.get("b", "a").unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(matrix.get("a", "c"), None);
        assert_eq!(matrix.get("c", "c"), None);
        assert!((matrix.get("b", "b").unwrap() - 1.0).abs() < 1e-9);
    }
}
