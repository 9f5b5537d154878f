//! Per-feature standardization fit on the training split

use crate::error::{Result, TrainerError};
use serde::{Deserialize, Serialize};

/// Mean and scale per feature position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit mean and population standard deviation per column.
    ///
    /// A constant column gets scale `1.0` so the transform stays finite.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows
            .first()
            .ok_or_else(|| TrainerError::InvalidInput("cannot fit scaler on zero rows".to_string()))?;
        let n_features = first.len();
        if let Some(row) = rows.iter().find(|row| row.len() != n_features) {
            return Err(TrainerError::DimensionMismatch {
                expected: n_features,
                actual: row.len(),
            });
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; n_features];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut variance = vec![0.0; n_features];
        for row in rows {
            for ((var, v), m) in variance.iter_mut().zip(row).zip(&mean) {
                *var += (v - m).powi(2);
            }
        }

        let scale = variance
            .iter()
            .zip(&mean)
            .map(|(var, m)| {
                let std = (var / n).sqrt();
                if std <= 1e-12 * (1.0 + m.abs()) || !std.is_finite() {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }

    /// Standardize every row; empty input or zero-width rows pass through
    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        if rows.is_empty() || rows[0].is_empty() {
            return rows.to_vec();
        }
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 10.0, 5.0],
            vec![2.0, 20.0, 5.0],
            vec![3.0, 35.0, 5.0],
            vec![6.0, 15.0, 5.0],
        ]
    }

    #[test]
    fn test_fit_lengths_match_features() {
        let scaler = StandardScaler::fit(&sample_rows()).unwrap();
        assert_eq!(scaler.mean.len(), 3);
        assert_eq!(scaler.scale.len(), 3);
        assert_eq!(scaler.n_features(), 3);
    }

    #[test]
    fn test_train_transform_has_zero_mean_unit_variance() {
        let rows = sample_rows();
        let scaler = StandardScaler::fit(&rows).unwrap();
        let scaled = scaler.transform(&rows);

        for col in 0..2 {
            let values: Vec<f64> = scaled.iter().map(|r| r[col]).collect();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column_scale_is_one() {
        let scaler = StandardScaler::fit(&sample_rows()).unwrap();
        assert_eq!(scaler.scale[2], 1.0);
        assert_eq!(scaler.mean[2], 5.0);
        let scaled = scaler.transform(&sample_rows());
        assert!(scaled.iter().all(|r| r[2] == 0.0));
    }

    #[test]
    fn test_uses_population_std() {
        let scaler = StandardScaler::fit(&[vec![0.0], vec![4.0]]).unwrap();
        assert_eq!(scaler.mean[0], 2.0);
        assert_eq!(scaler.scale[0], 2.0);
    }

    #[test]
    fn test_empty_split_passthrough() {
        let scaler = StandardScaler::fit(&sample_rows()).unwrap();
        assert!(scaler.transform(&[]).is_empty());
        let zero_width = vec![Vec::<f64>::new()];
        assert_eq!(scaler.transform(&zero_width), zero_width);
    }

    #[test]
    fn test_fit_errors() {
        assert!(StandardScaler::fit(&[]).is_err());
        assert!(matches!(
            StandardScaler::fit(&[vec![1.0, 2.0], vec![1.0]]),
            Err(TrainerError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }
}
