//! Model training module
//!
//! Provides the regressors the model zoo draws from and the search that
//! picks a champion:
//! - Ridge and Lasso linear models
//! - Epsilon-SVR with linear or RBF kernel
//! - Histogram-free gradient boosted trees (XGBoost-style)
//! - Random forest over CART regression trees
//! - K-fold grid search scored by mean absolute error

pub mod cross_validation;
pub mod decision_tree;
mod engine;
pub mod linear_models;
mod models;
pub mod random_forest;
mod search;
pub mod svm;
pub mod xgboost;
pub mod zoo;

pub use cross_validation::{CVSplit, KFold};
pub use decision_tree::{RegressionTree, TreeNode};
pub use engine::{TrainEngine, TrainingReport};
pub use linear_models::{LassoRegression, RidgeRegression, RidgeSolver};
pub use models::{mean_absolute_error, Estimator, RegressionMetrics};
pub use random_forest::RandomForestRegressor;
pub use search::{select_champion, CandidateResult, CandidateSummary, GridPointScore, ModelSearch, SearchOutcome};
pub use svm::{Gamma, KernelType, SvrConfig, SvrRegressor};
pub use xgboost::{BoostingConfig, GradientBoostingRegressor};
pub use zoo::{expand_grid, format_params, model_zoo, ModelCandidate, ModelFamily, ParamGrid, ParamSet, ParamValue};

use crate::error::Result;
use ndarray::{Array1, Array2};

/// Common interface for every regressor in the zoo
pub trait Regressor: Send + Sync {
    /// Fit on a dense feature matrix and target vector
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one value per row
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Relative feature importances, when the model exposes them
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}
