//! Univariate feature selection

use crate::error::{PricingError, Result};
use crate::features::ArrayTransform;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// How many features to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectK {
    /// Keep every feature (scores are still computed)
    #[default]
    All,
    /// Keep the `n` highest-scoring features
    Best(usize),
}

/// Select features by their F-statistic against the target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectKBest {
    k: SelectK,
    scores: Option<Vec<f64>>,
    selected: Option<Vec<usize>>,
}

impl SelectKBest {
    pub fn new(k: SelectK) -> Self {
        Self {
            k,
            scores: None,
            selected: None,
        }
    }

    pub fn scores(&self) -> Option<&[f64]> {
        self.scores.as_deref()
    }

    /// Kept column positions in input order
    pub fn selected_indices(&self) -> Option<&[usize]> {
        self.selected.as_deref()
    }
}

/// F-statistic of a univariate linear fit per column.
///
/// Constant columns score 0; perfectly correlated columns score infinity.
pub fn f_regression(x: &Array2<f64>, y: &Array1<f64>) -> Result<Vec<f64>> {
    if x.nrows() != y.len() {
        return Err(PricingError::ShapeError {
            expected: format!("{} rows", y.len()),
            actual: format!("{} rows", x.nrows()),
        });
    }
    let dof = x.nrows() as f64 - 2.0;
    Ok(x
        .columns()
        .into_iter()
        .map(|column| {
            let r = pearson(column, y.view());
            let r2 = r * r;
            if r2 >= 1.0 {
                f64::INFINITY
            } else {
                r2 / (1.0 - r2) * dof.max(0.0)
            }
        })
        .collect())
}

fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let x_mean = x.sum() / n;
    let y_mean = y.sum() / n;

    let mut cov = 0.0;
    let mut x_ss = 0.0;
    let mut y_ss = 0.0;
    for (&a, &b) in x.iter().zip(y.iter()) {
        let (dx, dy) = (a - x_mean, b - y_mean);
        cov += dx * dy;
        x_ss += dx * dx;
        y_ss += dy * dy;
    }
    if x_ss <= 0.0 || y_ss <= 0.0 {
        return 0.0;
    }
    cov / (x_ss.sqrt() * y_ss.sqrt())
}

impl ArrayTransform for SelectKBest {
    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<&mut Self> {
        let y = y.ok_or_else(|| PricingError::InvalidParameter {
            name: "y".to_string(),
            value: "None".to_string(),
            reason: "feature selection needs a target".to_string(),
        })?;
        let scores = f_regression(x, y)?;

        let selected = match self.k {
            SelectK::All => (0..x.ncols()).collect(),
            SelectK::Best(n) => {
                let mut ranked: Vec<usize> = (0..scores.len()).collect();
                // NaN sorts last, ties keep column order
                ranked.sort_by(|&a, &b| {
                    let (sa, sb) = (scores[a], scores[b]);
                    match (sa.is_nan(), sb.is_nan()) {
                        (true, false) => std::cmp::Ordering::Greater,
                        (false, true) => std::cmp::Ordering::Less,
                        _ => sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal),
                    }
                });
                let mut keep: Vec<usize> = ranked.into_iter().take(n.min(scores.len())).collect();
                keep.sort_unstable();
                keep
            }
        };

        self.scores = Some(scores);
        self.selected = Some(selected);
        Ok(self)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let selected = self.selected.as_ref().ok_or(PricingError::ModelNotFitted)?;
        if self.k == SelectK::All {
            return Ok(x.clone());
        }

        let mut out = Array2::zeros((x.nrows(), selected.len()));
        for (new_idx, &old_idx) in selected.iter().enumerate() {
            if old_idx >= x.ncols() {
                return Err(PricingError::ShapeError {
                    expected: format!("more than {old_idx} columns"),
                    actual: format!("{} columns", x.ncols()),
                });
            }
            out.column_mut(new_idx).assign(&x.column(old_idx));
        }
        Ok(out)
    }
}
