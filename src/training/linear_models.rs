//! Linear model implementations

use super::Regressor;
use crate::error::{PricingError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Solve symmetric positive-definite system Ax = b using Cholesky decomposition.
/// Retries once with a small diagonal ridge if the matrix is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let l = match cholesky_factor(a) {
        Some(l) => l,
        None => {
            let mut a_reg = a.clone();
            let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
            for k in 0..n {
                a_reg[[k, k]] += ridge;
            }
            cholesky_factor(&a_reg)?
        }
    };

    // Forward substitution: L * y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Lower-triangular factor of A = L * L^T
fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Gauss-Jordan inverse with partial pivoting (fallback)
fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    // Augmented matrix [M | I]
    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }

        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    Some(aug.slice(ndarray::s![.., n..]).to_owned())
}

/// Centre columns of `x` and `y`, returning the means
fn center(x: &Array2<f64>, y: &Array1<f64>) -> Result<(Array2<f64>, Array1<f64>, Array1<f64>, f64)> {
    let x_mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| PricingError::ComputationError("cannot fit on zero rows".to_string()))?;
    let y_mean = y.mean().unwrap_or(0.0);
    let x_c = x - &x_mean.view().insert_axis(Axis(0));
    let y_c = y - y_mean;
    Ok((x_c, y_c, x_mean, y_mean))
}

fn check_shapes(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(PricingError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(PricingError::ComputationError("cannot fit on zero rows".to_string()));
    }
    Ok(())
}

/// Solver used by [`RidgeRegression`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RidgeSolver {
    /// Normal equations via Cholesky, Gauss-Jordan fallback
    #[default]
    Auto,
    /// Conjugate gradient on the normal equations
    SparseCg,
    /// Damped least squares iterations on the design matrix
    Lsqr,
}

impl RidgeSolver {
    pub fn as_str(&self) -> &'static str {
        match self {
            RidgeSolver::Auto => "auto",
            RidgeSolver::SparseCg => "sparse_cg",
            RidgeSolver::Lsqr => "lsqr",
        }
    }
}

impl fmt::Display for RidgeSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RidgeSolver {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" | "cholesky" => Ok(RidgeSolver::Auto),
            "sparse_cg" => Ok(RidgeSolver::SparseCg),
            "lsqr" => Ok(RidgeSolver::Lsqr),
            other => Err(PricingError::InvalidParameter {
                name: "solver".to_string(),
                value: other.to_string(),
                reason: "expected auto, sparse_cg or lsqr".to_string(),
            }),
        }
    }
}

/// Ridge regression (L2 regularization) with an intercept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    pub alpha: f64,
    pub solver: RidgeSolver,
    /// Relative residual tolerance for the iterative solvers
    pub tol: f64,
    pub max_iter: Option<usize>,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha,
            solver: RidgeSolver::Auto,
            tol: 1e-6,
            max_iter: None,
        }
    }

    pub fn with_solver(mut self, solver: RidgeSolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = Some(max_iter);
        self
    }

    fn solve_cholesky(&self, x_c: &Array2<f64>, y_c: &Array1<f64>) -> Result<Array1<f64>> {
        let mut xtx = x_c.t().dot(x_c);
        for i in 0..xtx.nrows() {
            xtx[[i, i]] += self.alpha;
        }
        let xty = x_c.t().dot(y_c);

        if let Some(w) = cholesky_solve(&xtx, &xty) {
            return Ok(w);
        }
        matrix_inverse(&xtx)
            .map(|inv| inv.dot(&xty))
            .ok_or_else(|| {
                PricingError::ComputationError("Matrix is singular, cannot compute inverse".to_string())
            })
    }

    /// CG on (X^T X + alpha I) w = X^T y without forming X^T X
    fn solve_cg(&self, x_c: &Array2<f64>, y_c: &Array1<f64>) -> Array1<f64> {
        let n_features = x_c.ncols();
        let max_iter = self.max_iter.unwrap_or(10 * n_features.max(10));
        let apply = |v: &Array1<f64>| x_c.t().dot(&x_c.dot(v)) + self.alpha * v;

        let b = x_c.t().dot(y_c);
        let b_norm = b.dot(&b).sqrt();
        let mut w = Array1::zeros(n_features);
        if b_norm == 0.0 {
            return w;
        }

        let mut r = b.clone();
        let mut p = r.clone();
        let mut rs_old = r.dot(&r);

        for _ in 0..max_iter {
            let ap = apply(&p);
            let denom = p.dot(&ap);
            if denom <= 0.0 {
                break;
            }
            let step = rs_old / denom;
            w.scaled_add(step, &p);
            r.scaled_add(-step, &ap);
            let rs_new = r.dot(&r);
            if rs_new.sqrt() <= self.tol * b_norm {
                break;
            }
            p = &r + &(rs_new / rs_old * &p);
            rs_old = rs_new;
        }
        w
    }

    /// CGLS on the damped problem min ||X w - y||^2 + alpha ||w||^2
    fn solve_lsqr(&self, x_c: &Array2<f64>, y_c: &Array1<f64>) -> Array1<f64> {
        let n_features = x_c.ncols();
        let max_iter = self.max_iter.unwrap_or(10 * n_features.max(10));

        let mut w = Array1::zeros(n_features);
        let mut r = y_c.clone();
        let mut s = x_c.t().dot(&r);
        let s0_norm = s.dot(&s).sqrt();
        if s0_norm == 0.0 {
            return w;
        }
        let mut p = s.clone();
        let mut gamma = s.dot(&s);

        for _ in 0..max_iter {
            let q = x_c.dot(&p);
            let delta = q.dot(&q) + self.alpha * p.dot(&p);
            if delta <= 0.0 {
                break;
            }
            let step = gamma / delta;
            w.scaled_add(step, &p);
            r.scaled_add(-step, &q);
            s = x_c.t().dot(&r) - self.alpha * &w;
            let gamma_new = s.dot(&s);
            if gamma_new.sqrt() <= self.tol * s0_norm {
                break;
            }
            p = &s + &(gamma_new / gamma * &p);
            gamma = gamma_new;
        }
        w
    }
}

impl Regressor for RidgeRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_shapes(x, y)?;
        if !(self.alpha >= 0.0) {
            return Err(PricingError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }

        let (x_c, y_c, x_mean, y_mean) = center(x, y)?;
        let w = match self.solver {
            RidgeSolver::Auto => self.solve_cholesky(&x_c, &y_c)?,
            RidgeSolver::SparseCg => self.solve_cg(&x_c, &y_c),
            RidgeSolver::Lsqr => self.solve_lsqr(&x_c, &y_c),
        };

        if w.iter().any(|v| !v.is_finite()) {
            return Err(PricingError::ComputationError(format!(
                "ridge ({}) produced non-finite coefficients",
                self.solver
            )));
        }

        self.intercept = Some(y_mean - w.dot(&x_mean));
        self.coefficients = Some(w);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(PricingError::ModelNotFitted)?;
        check_width(coefficients.len(), x)?;
        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }
}

fn check_width(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(PricingError::ShapeError {
            expected: format!("{expected} features"),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

/// Lasso regression (L1 regularization) by cyclic coordinate descent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    /// L1 regularization strength
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LassoRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha,
            max_iter: 1000,
            tol: 1e-6,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Soft-threshold operator for L1 proximal step
    fn soft_threshold(val: f64, threshold: f64) -> f64 {
        if val > threshold {
            val - threshold
        } else if val < -threshold {
            val + threshold
        } else {
            0.0
        }
    }
}

impl Regressor for LassoRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_shapes(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();

        let (x_c, y_c, x_mean, y_mean) = center(x, y)?;

        let col_norms: Vec<f64> = (0..n_features)
            .map(|j| x_c.column(j).mapv(|v| v * v).sum())
            .collect();

        let mut w = Array1::zeros(n_features);
        let lambda = self.alpha * n_samples as f64;
        let mut r = y_c.clone();

        for _iter in 0..self.max_iter {
            let mut max_delta: f64 = 0.0;

            for j in 0..n_features {
                if col_norms[j] < 1e-15 {
                    w[j] = 0.0;
                    continue;
                }
                let rho = x_c.column(j).dot(&r) + col_norms[j] * w[j];
                let old_wj = w[j];
                w[j] = Self::soft_threshold(rho, lambda) / col_norms[j];
                let delta = old_wj - w[j];
                if delta != 0.0 {
                    r.scaled_add(delta, &x_c.column(j));
                }
                max_delta = max_delta.max(delta.abs());
            }

            if max_delta < self.tol {
                break;
            }
        }

        self.intercept = Some(y_mean - w.dot(&x_mean));
        self.coefficients = Some(w);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(PricingError::ModelNotFitted)?;
        check_width(coefficients.len(), x)?;
        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn linear_data() -> (Array2<f64>, Array1<f64>) {
        // y = 2*x0 - 3*x1 + 5
        let x = array![
            [1.0, 2.0],
            [2.0, 1.0],
            [3.0, 4.0],
            [4.0, 3.0],
            [5.0, 5.0],
            [6.0, 2.0],
            [7.0, 6.0],
            [8.0, 1.0]
        ];
        let y = x.column(0).mapv(|v| 2.0 * v) - x.column(1).mapv(|v| 3.0 * v) + 5.0;
        (x, y)
    }

    #[test]
    fn test_ridge_solvers_agree() {
        let (x, y) = linear_data();
        let mut coefs = Vec::new();
        for solver in [RidgeSolver::Auto, RidgeSolver::SparseCg, RidgeSolver::Lsqr] {
            let mut model = RidgeRegression::new(0.1).with_solver(solver);
            model.fit(&x, &y).unwrap();
            coefs.push(model.coefficients.clone().unwrap());
        }
        for c in &coefs[1..] {
            for (a, b) in coefs[0].iter().zip(c.iter()) {
                assert!((a - b).abs() < 1e-4, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_ridge_small_alpha_recovers_coefficients() {
        let (x, y) = linear_data();
        let mut model = RidgeRegression::new(1e-8);
        model.fit(&x, &y).unwrap();
        let w = model.coefficients.as_ref().unwrap();
        assert!((w[0] - 2.0).abs() < 1e-4);
        assert!((w[1] + 3.0).abs() < 1e-4);
        assert!((model.intercept.unwrap() - 5.0).abs() < 1e-3);

        let pred = model.predict(&array![[10.0, 0.0]]).unwrap();
        assert!((pred[0] - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_ridge_shrinks_with_alpha() {
        let (x, y) = linear_data();
        let mut weak = RidgeRegression::new(0.1);
        let mut strong = RidgeRegression::new(100.0);
        weak.fit(&x, &y).unwrap();
        strong.fit(&x, &y).unwrap();
        let norm = |m: &RidgeRegression| m.coefficients.as_ref().unwrap().mapv(f64::abs).sum();
        assert!(norm(&strong) < norm(&weak));
    }

    #[test]
    fn test_solver_parse() {
        assert_eq!("sparse_cg".parse::<RidgeSolver>().unwrap(), RidgeSolver::SparseCg);
        assert!("svd".parse::<RidgeSolver>().is_err());
    }

    #[test]
    fn test_lasso_zeroes_irrelevant_feature() {
        let x = array![
            [1.0, 0.3],
            [2.0, -0.1],
            [3.0, 0.2],
            [4.0, -0.3],
            [5.0, 0.1],
            [6.0, -0.2]
        ];
        let y = x.column(0).mapv(|v| 3.0 * v + 1.0);
        let mut model = LassoRegression::new(0.1).with_max_iter(10_000);
        model.fit(&x, &y).unwrap();
        let w = model.coefficients.as_ref().unwrap();
        assert!(w[0] > 2.5);
        assert_eq!(w[1], 0.0);
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LassoRegression::default();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(PricingError::ModelNotFitted)
        ));
    }
}
