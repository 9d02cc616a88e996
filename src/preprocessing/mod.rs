//! Preprocessing primitives
//!
//! Fitted building blocks for the pricing pipeline:
//! - Median / constant imputation
//! - Standard scaling
//! - One-hot encoding with an unknown-category policy
//! - Degree-2 polynomial expansion
//! - F-test feature selection

mod encoder;
mod imputer;
mod polynomial;
mod scaler;
pub mod feature_selection;

pub use encoder::{HandleUnknown, OneHotEncoder};
pub use feature_selection::{f_regression, SelectK, SelectKBest};
pub use imputer::{CategoricalImputer, ImputeStrategy, Imputer};
pub use polynomial::PolynomialFeatures;
pub use scaler::StandardScaler;
