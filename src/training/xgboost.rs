//! XGBoost-style gradient boosting with second-order approximation
//!
//! - Gradient and hessian of the squared-error loss drive every split
//! - Regularized leaf weights: w* = -G / (H + lambda)
//! - Split gain: 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)] - γ
//! - Optional row / column subsampling per round

use super::Regressor;
use crate::error::{PricingError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// Minimum loss reduction to make a split (gamma)
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: Option<u64>,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: Some(42),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum BoostNode {
    Leaf { weight: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<BoostNode>,
        right: Box<BoostNode>,
    },
}

impl BoostNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            BoostNode::Leaf { weight } => *weight,
            BoostNode::Split { feature, threshold, left, right } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    fn count_splits(&self, counts: &mut [f64]) {
        if let BoostNode::Split { feature, left, right, .. } = self {
            if *feature < counts.len() {
                counts[*feature] += 1.0;
            }
            left.count_splits(counts);
            right.count_splits(counts);
        }
    }
}

/// Candidate split: (feature, threshold, gain)
type SplitCandidate = (usize, f64, f64);

/// Build one tree with exact greedy split finding
fn build_tree(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature_indices: &[usize],
    depth: usize,
    config: &BoostingConfig,
) -> BoostNode {
    let g_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| hess[i]).sum();
    let leaf_weight = -g_sum / (h_sum + config.reg_lambda);

    if depth >= config.max_depth || indices.len() < 2 || h_sum < config.min_child_weight {
        return BoostNode::Leaf { weight: leaf_weight };
    }

    // Features are scanned in parallel; the first best in feature order wins
    let candidates: Vec<Option<SplitCandidate>> = feature_indices
        .par_iter()
        .map(|&f| best_split_for_feature(x, grad, hess, indices, f, config))
        .collect();
    let best = candidates
        .into_iter()
        .flatten()
        .fold(None::<SplitCandidate>, |best, c| match best {
            Some(b) if b.2 >= c.2 => Some(b),
            _ => Some(c),
        });

    match best {
        Some((feature, threshold, gain)) if gain > config.gamma => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
                indices.iter().partition(|&&i| x[[i, feature]] <= threshold);

            if left_idx.is_empty() || right_idx.is_empty() {
                return BoostNode::Leaf { weight: leaf_weight };
            }

            let left = build_tree(x, grad, hess, &left_idx, feature_indices, depth + 1, config);
            let right = build_tree(x, grad, hess, &right_idx, feature_indices, depth + 1, config);

            BoostNode::Split {
                feature,
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => BoostNode::Leaf { weight: leaf_weight },
    }
}

fn best_split_for_feature(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature: usize,
    config: &BoostingConfig,
) -> Option<SplitCandidate> {
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

    let g_total: f64 = sorted.iter().map(|&i| grad[i]).sum();
    let h_total: f64 = sorted.iter().map(|&i| hess[i]).sum();
    let lambda = config.reg_lambda;
    let parent = g_total * g_total / (h_total + lambda);

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<SplitCandidate> = None;

    for pos in 0..sorted.len() - 1 {
        let idx = sorted[pos];
        let next = sorted[pos + 1];
        g_left += grad[idx];
        h_left += hess[idx];

        let (v, v_next) = (x[[idx, feature]], x[[next, feature]]);
        if (v - v_next).abs() < 1e-12 {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;
        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5
            * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda) - parent);

        if best.map_or(true, |b| gain > b.2) {
            best = Some((feature, (v + v_next) / 2.0, gain));
        }
    }
    best
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil().max(1.0) as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}

/// Gradient-boosted regression trees (squared error loss)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: BoostingConfig,
    trees: Vec<BoostNode>,
    base_score: f64,
    n_features: usize,
}

impl GradientBoostingRegressor {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &BoostingConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|t| self.config.learning_rate * t.predict(row))
                .sum::<f64>()
    }
}

impl Regressor for GradientBoostingRegressor {
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
        let n_features = x.ncols();
        self.n_features = n_features;

        self.base_score = y.mean().unwrap_or(0.0);
        let mut preds = Array1::from_elem(n_samples, self.base_score);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();
        let hess = Array1::from_elem(n_samples, 1.0);

        for _ in 0..self.config.n_estimators {
            // Squared error: grad = pred - y, hess = 1
            let grad: Array1<f64> = &preds - y;

            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_indices = subsample(&mut rng, n_features, self.config.colsample_bytree);

            let tree = build_tree(x, &grad, &hess, &row_indices, &col_indices, 0, &self.config);

            for (i, row) in x.rows().into_iter().enumerate() {
                preds[i] += self.config.learning_rate * tree.predict(row);
            }
            self.trees.push(tree);
        }

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.n_features == 0 && self.trees.is_empty() {
            return Err(PricingError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(PricingError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        let preds: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| self.predict_row(row))
            .collect();
        Ok(Array1::from(preds))
    }

    /// Split-count importances, normalized to sum to one
    fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.n_features == 0 {
            return None;
        }
        let mut counts = vec![0.0f64; self.n_features];
        for tree in &self.trees {
            tree.count_splits(&mut counts);
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            counts.iter_mut().for_each(|c| *c /= total);
        }
        Some(Array1::from_vec(counts))
    }
}
