//! CART regression tree (squared error criterion)

use super::Regressor;
use crate::error::{PricingError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

impl TreeNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                if sample[*feature_idx] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Best split found for a node: (feature, threshold, SSE reduction)
type SplitChoice = (usize, f64, f64);

/// Regression tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RegressionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn get_depth(&self) -> usize {
        self.root.as_ref().map(TreeNode::depth).unwrap_or(0)
    }

    fn build(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n_samples as f64;
        let leaf = TreeNode::Leaf {
            value: mean,
            n_samples,
        };

        if n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|d| depth >= d)
        {
            return leaf;
        }

        let Some((feature_idx, threshold, gain)) = self.find_best_split(x, y, indices) else {
            return leaf;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature_idx]] <= threshold);
        if left_idx.is_empty() || right_idx.is_empty() {
            return leaf;
        }

        importances[feature_idx] += gain;

        let left = Box::new(self.build(x, y, &left_idx, depth + 1, importances));
        let right = Box::new(self.build(x, y, &right_idx, depth + 1, importances));
        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
        }
    }

    fn find_best_split(&self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> Option<SplitChoice> {
        let per_feature: Vec<Option<SplitChoice>> = (0..x.ncols())
            .into_par_iter()
            .map(|feature| self.best_split_for_feature(x, y, indices, feature))
            .collect();

        // First feature wins ties
        per_feature
            .into_iter()
            .flatten()
            .fold(None, |best: Option<SplitChoice>, c| match best {
                Some(b) if b.2 >= c.2 => Some(b),
                _ => Some(c),
            })
    }

    /// Sorted scan with running sums; SSE = sum(y²) - sum(y)² / n
    fn best_split_for_feature(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature: usize,
    ) -> Option<SplitChoice> {
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let n = sorted.len();
        let total_sum: f64 = sorted.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = sorted.iter().map(|&i| y[i] * y[i]).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        let mut best: Option<SplitChoice> = None;

        for pos in 0..n - 1 {
            let yi = y[sorted[pos]];
            left_sum += yi;
            left_sq += yi * yi;

            let v = x[[sorted[pos], feature]];
            let v_next = x[[sorted[pos + 1], feature]];
            if v_next - v <= 1e-12 {
                continue;
            }

            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left as f64)
                + (right_sq - right_sum * right_sum / n_right as f64);
            let gain = parent_sse - sse;

            if gain > 1e-12 && best.map_or(true, |b| gain > b.2) {
                best = Some((feature, (v + v_next) / 2.0, gain));
            }
        }
        best
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }
}

impl Regressor for RegressionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(PricingError::ShapeError {
                expected: format!("y length = {n_samples}"),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PricingError::ComputationError("cannot fit on zero rows".to_string()));
        }

        self.n_features = x.ncols();
        let mut importances = vec![0.0; self.n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build(x, y, &indices, 0, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(PricingError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(PricingError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.rows().into_iter().map(|row| root.predict(row)).collect())
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }
}
