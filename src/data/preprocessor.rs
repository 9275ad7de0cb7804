// ============================================================
// Layer 4 — Feature Standardizer
// ============================================================
// Column-wise z-score scaling fitted on the training split:
//
//   scaled = (value - mean) / std
//
// The fitted means/stds are saved in the model manifest so
// inference scales a query exactly the way training did.
// A constant column (std = 0) is scaled with std = 1.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub means: Vec<f64>,
    pub stds:  Vec<f64>,
}

impl Standardizer {
    /// Fit on rows of equal width. An empty input gives an identity
    /// scaler of the requested width.
    pub fn fit<R: AsRef<[f32]>>(rows: &[R], width: usize) -> Self {
        if rows.is_empty() {
            return Self { means: vec![0.0; width], stds: vec![1.0; width] };
        }
        let n = rows.len() as f64;

        let mut means = vec![0.0f64; width];
        for row in rows {
            for (m, &v) in means.iter_mut().zip(row.as_ref()) {
                *m += v as f64;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut stds = vec![0.0f64; width];
        for row in rows {
            for ((s, &v), m) in stds.iter_mut().zip(row.as_ref()).zip(&means) {
                *s += (v as f64 - m).powi(2);
            }
        }
        let stds = stds
            .into_iter()
            .map(|s| {
                let std = (s / n).sqrt();
                if std > f64::EPSILON { std } else { 1.0 }
            })
            .collect();

        Self { means, stds }
    }

    pub fn transform(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(&v, (m, s))| ((v as f64 - m) / s) as f32)
            .collect()
    }

    /// Scale a single value of column `col`
    pub fn scale_value(&self, col: usize, value: f64) -> f64 {
        (value - self.means[col]) / self.stds[col]
    }

    /// Undo the scaling of a single value of column `col`
    pub fn unscale_value(&self, col: usize, value: f64) -> f64 {
        value * self.stds[col] + self.means[col]
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fitted_columns_have_zero_mean() {
        let rows = vec![vec![1.0f32, 10.0], vec![3.0, 30.0]];
        let s = Standardizer::fit(&rows, 2);
        assert_eq!(s.means, vec![2.0, 20.0]);
        assert_eq!(s.transform(&rows[0]), vec![-1.0, -1.0]);
        assert_eq!(s.transform(&rows[1]), vec![1.0, 1.0]);
    }

    #[test]
    fn test_constant_column_keeps_unit_std() {
        let rows = vec![vec![5.0f32], vec![5.0]];
        let s = Standardizer::fit(&rows, 1);
        assert_eq!(s.stds, vec![1.0]);
        assert_eq!(s.transform(&[5.0]), vec![0.0]);
    }

    #[test]
    fn test_unscale_inverts_scale() {
        let rows = vec![vec![40.0f32], vec![60.0], vec![110.0]];
        let s = Standardizer::fit(&rows, 1);
        let back = s.unscale_value(0, s.scale_value(0, 73.0));
        assert!((back - 73.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_is_identity() {
        let rows: Vec<Vec<f32>> = Vec::new();
        let s = Standardizer::fit(&rows, 3);
        assert_eq!(s.means.len(), 3);
        assert_eq!(s.transform(&[1.0, 2.0, 3.0]), vec![1.0, 2.0, 3.0]);
    }
}
