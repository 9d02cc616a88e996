//! Epsilon-insensitive support vector regression
//!
//! The dual is solved by cyclic coordinate descent on `beta = alpha - alpha*`
//! with box constraints `|beta_i| <= C`. The intercept is absorbed into the
//! kernel (`K + 1`) after centring the target, which removes the equality
//! constraint of the classic formulation.

use super::Regressor;
use crate::error::{PricingError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Largest fit that precomputes the full kernel matrix. Above this, kernel
/// columns are recomputed on demand so memory stays linear in the row count.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Kernel function type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// Linear kernel: K(x, y) = x · y
    Linear,
    /// Radial Basis Function (Gaussian): K(x, y) = exp(-γ * ||x - y||²)
    Rbf { gamma: Gamma },
}

impl Default for KernelType {
    fn default() -> Self {
        KernelType::Rbf { gamma: Gamma::Scale }
    }
}

/// RBF width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gamma {
    /// `1 / (n_features * Var(X))`, resolved at fit time
    Scale,
    Value(f64),
}

/// SVR configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvrConfig {
    /// Regularization parameter (C)
    pub c: f64,
    /// Half-width of the insensitive tube
    pub epsilon: f64,
    pub kernel: KernelType,
    /// Stop once no coefficient moves more than this in a sweep
    pub tol: f64,
    pub max_iter: usize,
}

impl Default for SvrConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.1,
            kernel: KernelType::default(),
            tol: 1e-3,
            max_iter: 1000,
        }
    }
}

/// Support Vector Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvrRegressor {
    config: SvrConfig,
    support_vectors: Option<Array2<f64>>,
    dual_coef: Option<Array1<f64>>,
    gamma: f64,
    y_mean: f64,
}

impl SvrRegressor {
    pub fn new(config: SvrConfig) -> Self {
        Self {
            config,
            support_vectors: None,
            dual_coef: None,
            gamma: 1.0,
            y_mean: 0.0,
        }
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.as_ref().map(|sv| sv.nrows()).unwrap_or(0)
    }

    /// Resolved RBF width after fit
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    fn resolve_gamma(&self, x: &Array2<f64>) -> f64 {
        match &self.config.kernel {
            KernelType::Linear => 0.0,
            KernelType::Rbf { gamma: Gamma::Value(g) } => *g,
            KernelType::Rbf { gamma: Gamma::Scale } => {
                let n = x.len() as f64;
                if n == 0.0 {
                    return 1.0;
                }
                let mean = x.sum() / n;
                let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                if var > 0.0 {
                    1.0 / (x.ncols() as f64 * var)
                } else {
                    1.0
                }
            }
        }
    }

    fn kernel(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        let k = match self.config.kernel {
            KernelType::Linear => a.dot(&b),
            KernelType::Rbf { .. } => {
                let norm_sq: f64 = a.iter().zip(b.iter()).map(|(p, q)| (p - q).powi(2)).sum();
                (-self.gamma * norm_sq).exp()
            }
        };
        // bias folded into the kernel
        k + 1.0
    }

    fn compute_kernel_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| (0..n).map(|j| self.kernel(x.row(i), x.row(j))).collect())
            .collect();

        let mut k = Array2::zeros((n, n));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, v) in row.into_iter().enumerate() {
                k[[i, j]] = v;
            }
        }
        k
    }

    /// Column `i` of the kernel matrix without materializing the rest
    fn kernel_column(&self, x: &Array2<f64>, i: usize) -> Array1<f64> {
        let col: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|j| self.kernel(x.row(j), x.row(i)))
            .collect();
        Array1::from(col)
    }

    fn fit_with_matrix_limit(&mut self, x: &Array2<f64>, y: &Array1<f64>, matrix_limit: usize) -> Result<()> {
        let n = x.nrows();
        if n != y.len() {
            return Err(PricingError::ShapeError {
                expected: format!("y length = {n}"),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n == 0 {
            return Err(PricingError::ComputationError("cannot fit on zero rows".to_string()));
        }
        if !(self.config.c > 0.0) {
            return Err(PricingError::InvalidParameter {
                name: "C".to_string(),
                value: self.config.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        self.gamma = self.resolve_gamma(x);
        self.y_mean = y.mean().unwrap_or(0.0);
        let target = y - self.y_mean;

        let dense = (n <= matrix_limit).then(|| self.compute_kernel_matrix(x));
        if dense.is_none() {
            debug!(n, matrix_limit, "SVR kernel columns computed on demand");
        }
        let diag: Array1<f64> = match &dense {
            Some(k) => k.diag().to_owned(),
            None => x.rows().into_iter().map(|r| self.kernel(r, r)).collect(),
        };
        let (c, eps) = (self.config.c, self.config.epsilon);

        let mut beta: Array1<f64> = Array1::zeros(n);
        // k_beta[i] = sum_j K[i, j] * beta[j]
        let mut k_beta: Array1<f64> = Array1::zeros(n);

        let mut sweeps = 0;
        for _ in 0..self.config.max_iter {
            sweeps += 1;
            let mut max_change: f64 = 0.0;

            for i in 0..n {
                let k_ii = diag[i];
                if k_ii <= 0.0 {
                    continue;
                }
                let grad = k_beta[i] - target[i];
                let z = k_ii * beta[i] - grad;
                let shrunk = if z > eps {
                    z - eps
                } else if z < -eps {
                    z + eps
                } else {
                    0.0
                };
                let new_beta = (shrunk / k_ii).clamp(-c, c);
                let delta = new_beta - beta[i];

                if delta != 0.0 {
                    match &dense {
                        Some(k) => k_beta.scaled_add(delta, &k.column(i)),
                        None => k_beta.scaled_add(delta, &self.kernel_column(x, i)),
                    }
                    beta[i] = new_beta;
                    max_change = max_change.max(delta.abs());
                }
            }

            if max_change < self.config.tol {
                break;
            }
        }

        let support: Vec<usize> = (0..n).filter(|&i| beta[i].abs() > 1e-10).collect();
        debug!(sweeps, n_support = support.len(), gamma = self.gamma, "SVR converged");

        self.support_vectors = Some(x.select(Axis(0), &support));
        self.dual_coef = Some(support.iter().map(|&i| beta[i]).collect());
        Ok(())
    }
}

impl Regressor for SvrRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.fit_with_matrix_limit(x, y, MAX_KERNEL_MATRIX_SAMPLES)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (sv, coef) = match (&self.support_vectors, &self.dual_coef) {
            (Some(sv), Some(coef)) => (sv, coef),
            _ => return Err(PricingError::ModelNotFitted),
        };
        if sv.nrows() > 0 && sv.ncols() != x.ncols() {
            return Err(PricingError::ShapeError {
                expected: format!("{} features", sv.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let preds: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|r| {
                let row = x.row(r);
                self.y_mean
                    + sv
                        .rows()
                        .into_iter()
                        .zip(coef.iter())
                        .map(|(s, &b)| b * self.kernel(s, row))
                        .sum::<f64>()
            })
            .collect();
        Ok(Array1::from(preds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sine_data() -> (Array2<f64>, Array1<f64>) {
        let x: Array2<f64> = Array2::from_shape_fn((40, 1), |(i, _)| i as f64 / 8.0);
        let y = x.column(0).mapv(|v| v.sin());
        (x, y)
    }

    #[test]
    fn test_svr_fits_smooth_curve() {
        let (x, y) = sine_data();
        let mut svr = SvrRegressor::new(SvrConfig {
            c: 10.0,
            epsilon: 0.05,
            ..Default::default()
        });
        svr.fit(&x, &y).unwrap();
        let pred = svr.predict(&x).unwrap();

        let mae = (&pred - &y).mapv(f64::abs).mean().unwrap();
        assert!(mae < 0.2, "mae = {mae}");
        assert!(svr.n_support_vectors() > 0);
    }

    #[test]
    fn test_scale_gamma() {
        let x = array![[0.0, 2.0], [2.0, 0.0]];
        let y = array![1.0, 2.0];
        let mut svr = SvrRegressor::new(SvrConfig::default());
        svr.fit(&x, &y).unwrap();
        // Var(X) = 1, n_features = 2
        assert!((svr.gamma() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_wide_tube_predicts_mean() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![10.0, 10.5, 11.0];
        let mut svr = SvrRegressor::new(SvrConfig {
            epsilon: 5.0,
            ..Default::default()
        });
        svr.fit(&x, &y).unwrap();
        assert_eq!(svr.n_support_vectors(), 0);
        let pred = svr.predict(&array![[7.0]]).unwrap();
        assert!((pred[0] - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_on_demand_kernel_matches_dense() {
        let (x, y) = sine_data();
        let config = SvrConfig {
            c: 10.0,
            epsilon: 0.05,
            ..Default::default()
        };
        let mut dense = SvrRegressor::new(config.clone());
        dense.fit(&x, &y).unwrap();
        let mut lazy = SvrRegressor::new(config);
        lazy.fit_with_matrix_limit(&x, &y, 0).unwrap();

        assert_eq!(dense.n_support_vectors(), lazy.n_support_vectors());
        assert_eq!(dense.predict(&x).unwrap(), lazy.predict(&x).unwrap());
    }

    #[test]
    fn test_rejects_non_positive_c() {
        let (x, y) = sine_data();
        let mut svr = SvrRegressor::new(SvrConfig {
            c: 0.0,
            ..Default::default()
        });
        assert!(svr.fit(&x, &y).is_err());
    }
}
