//! Weighted ridge regression with standardized features and an unpenalized
//! intercept.

use nalgebra::{DMatrix, DVector};

use crate::error::ModelError;
use crate::features::FeatureVector;

/// A fitted model for one (position, stat) pair
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeModel {
    /// Feature names in training order
    pub feature_names: Vec<String>,
    /// Per-feature training mean
    pub means: Vec<f64>,
    /// Per-feature training std (1.0 for zero-variance columns)
    pub scales: Vec<f64>,
    /// Intercept followed by one coefficient per feature
    pub coefficients: Vec<f64>,
    /// Weighted residual standard deviation
    pub residual_std: f64,
    pub alpha: f64,
    pub sample_count: usize,
}

/// Fit `y ~ X` by solving `(XᵀWX + αI')β = XᵀWy` where `I'` leaves the
/// intercept unpenalized.
///
/// Weights are rescaled to sum to the sample count so `alpha` keeps the same
/// meaning whatever the weighting scheme.
pub fn fit(
    feature_names: Vec<String>,
    rows: &[Vec<f64>],
    targets: &[f64],
    weights: Option<&[f64]>,
    alpha: f64,
) -> Result<RidgeModel, ModelError> {
    let n = rows.len();
    let p = feature_names.len();
    if n == 0 {
        return Err(ModelError::EmptyTrainingSet);
    }
    if targets.len() != n {
        return Err(ModelError::DimensionMismatch { expected: n, actual: targets.len() });
    }
    if let Some(row) = rows.iter().find(|row| row.len() != p) {
        return Err(ModelError::DimensionMismatch { expected: p, actual: row.len() });
    }

    let weights = normalized_weights(weights, n)?;

    let n_f = n as f64;
    let mut means = vec![0.0; p];
    for row in rows {
        for (mean, x) in means.iter_mut().zip(row) {
            *mean += x / n_f;
        }
    }
    let mut scales = vec![0.0; p];
    for row in rows {
        for ((scale, x), mean) in scales.iter_mut().zip(row).zip(&means) {
            *scale += (x - mean).powi(2) / n_f;
        }
    }
    for scale in scales.iter_mut() {
        *scale = scale.sqrt();
        if *scale == 0.0 || !scale.is_finite() {
            *scale = 1.0;
        }
    }

    let design = DMatrix::from_fn(n, p + 1, |i, j| {
        if j == 0 {
            1.0
        } else {
            (rows[i][j - 1] - means[j - 1]) / scales[j - 1]
        }
    });
    let y = DVector::from_column_slice(targets);
    let w = DVector::from_vec(weights);

    let weighted = DMatrix::from_fn(n, p + 1, |i, j| design[(i, j)] * w[i]);
    let mut gram = design.transpose() * &weighted;
    for j in 1..=p {
        gram[(j, j)] += alpha;
    }
    let rhs = weighted.transpose() * &y;

    let beta = match gram.clone().cholesky() {
        Some(chol) => chol.solve(&rhs),
        None => gram.lu().solve(&rhs).ok_or(ModelError::Singular)?,
    };

    let residuals = &y - &design * &beta;
    let residual_std = if n > 1 {
        let weighted_sq: f64 = residuals.iter().zip(w.iter()).map(|(r, w)| w * r * r).sum();
        (weighted_sq / w.sum()).sqrt()
    } else {
        1.0
    };

    Ok(RidgeModel {
        feature_names,
        means,
        scales,
        coefficients: beta.iter().copied().collect(),
        residual_std,
        alpha,
        sample_count: n,
    })
}

fn normalized_weights(weights: Option<&[f64]>, n: usize) -> Result<Vec<f64>, ModelError> {
    match weights {
        None => Ok(vec![1.0; n]),
        Some(raw) => {
            if raw.len() != n {
                return Err(ModelError::DimensionMismatch { expected: n, actual: raw.len() });
            }
            let total: f64 = raw.iter().sum();
            if !total.is_finite() || total <= 0.0 || raw.iter().any(|w| *w < 0.0) {
                return Err(ModelError::InvalidWeights);
            }
            let factor = n as f64 / total;
            Ok(raw.iter().map(|w| w * factor).collect())
        }
    }
}

impl RidgeModel {
    /// Raw (unclamped) prediction for a feature row in training order
    pub fn predict(&self, row: &[f64]) -> Result<f64, ModelError> {
        if row.len() != self.means.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.means.len(),
                actual: row.len(),
            });
        }
        let standardized = row
            .iter()
            .zip(&self.means)
            .zip(&self.scales)
            .map(|((x, mean), scale)| (x - mean) / scale);
        Ok(self.coefficients[0]
            + standardized.zip(&self.coefficients[1..]).map(|(x, b)| x * b).sum::<f64>())
    }

    /// Prediction for a named feature vector; `None` when its names differ
    /// from the training names
    pub fn predict_features(&self, features: &FeatureVector) -> Option<f64> {
        if !features.matches_names(&self.feature_names) {
            return None;
        }
        self.predict(features.values()).ok()
    }

    pub fn intercept(&self) -> f64 {
        self.coefficients[0]
    }
}
