//! Estimator wrapper and regression metrics

use super::linear_models::{LassoRegression, RidgeRegression};
use super::random_forest::RandomForestRegressor;
use super::svm::SvrRegressor;
use super::xgboost::GradientBoostingRegressor;
use super::Regressor;
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Metrics for a fitted regressor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len() as f64;
        if y_true.is_empty() {
            return Self::default();
        }
        let errors: Vec<f64> = y_true.iter().zip(y_pred.iter()).map(|(t, p)| t - p).collect();

        let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let y_mean = y_true.sum() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();

        Self {
            mae,
            rmse: mse.sqrt(),
            r2: if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 },
            n_samples: y_true.len(),
        }
    }
}

pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return f64::NAN;
    }
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / y_true.len() as f64
}

/// Any estimator the model zoo can produce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    Ridge(RidgeRegression),
    Lasso(LassoRegression),
    Svr(SvrRegressor),
    GradientBoosting(GradientBoostingRegressor),
    RandomForest(RandomForestRegressor),
}

impl Estimator {
    pub fn kind(&self) -> &'static str {
        match self {
            Estimator::Ridge(_) => "ridge",
            Estimator::Lasso(_) => "lasso",
            Estimator::Svr(_) => "svr",
            Estimator::GradientBoosting(_) => "gradient_boosting",
            Estimator::RandomForest(_) => "random_forest",
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            Estimator::Ridge(m) => m,
            Estimator::Lasso(m) => m,
            Estimator::Svr(m) => m,
            Estimator::GradientBoosting(m) => m,
            Estimator::RandomForest(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Regressor {
        match self {
            Estimator::Ridge(m) => m,
            Estimator::Lasso(m) => m,
            Estimator::Svr(m) => m,
            Estimator::GradientBoosting(m) => m,
            Estimator::RandomForest(m) => m,
        }
    }
}

impl Regressor for Estimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.inner().feature_importances()
    }
}
