//! Model zoo: candidate estimator families and their hyperparameter grids

use super::linear_models::{LassoRegression, RidgeRegression, RidgeSolver};
use super::models::Estimator;
use super::random_forest::RandomForestRegressor;
use super::svm::{Gamma, KernelType, SvrConfig, SvrRegressor};
use super::xgboost::{BoostingConfig, GradientBoostingRegressor};
use crate::error::{PricingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Str(_) => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Some(*v as usize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Plain JSON rendering for reports
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Int(v) => serde_json::Value::from(*v),
            ParamValue::Float(v) => serde_json::Value::from(*v),
            ParamValue::Str(s) => serde_json::Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// Hyperparameter name -> candidate values, iterated in key order
pub type ParamGrid = BTreeMap<String, Vec<ParamValue>>;

/// One point of a grid
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Render a parameter set as `a=1, b=x`
pub fn format_params(params: &ParamSet) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Cartesian product of a grid; the first key varies slowest.
pub fn expand_grid(grid: &ParamGrid) -> Vec<ParamSet> {
    let mut points = vec![ParamSet::new()];
    for (name, values) in grid {
        let mut next = Vec::with_capacity(points.len() * values.len());
        for point in &points {
            for value in values {
                let mut p = point.clone();
                p.insert(name.clone(), value.clone());
                next.push(p);
            }
        }
        points = next;
    }
    points
}

/// Estimator family a candidate draws from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelFamily {
    Ridge,
    Lasso,
    Svr,
    GradientBoosting { random_state: u64 },
    RandomForest { random_state: u64 },
}

impl ModelFamily {
    /// Build an unfitted estimator for one grid point
    pub fn build(&self, params: &ParamSet) -> Result<Estimator> {
        let reader = ParamReader::new(params);
        let estimator = match self {
            ModelFamily::Ridge => {
                let mut model = RidgeRegression::new(reader.f64_or("alpha", 1.0)?);
                model.solver = reader.str_or("solver", "auto")?.parse::<RidgeSolver>()?;
                Estimator::Ridge(model)
            }
            ModelFamily::Lasso => {
                let model = LassoRegression::new(reader.f64_or("alpha", 1.0)?)
                    .with_max_iter(reader.usize_or("max_iter", 1000)?);
                Estimator::Lasso(model)
            }
            ModelFamily::Svr => {
                let kernel = match reader.str_or("kernel", "rbf")? {
                    "rbf" => KernelType::Rbf { gamma: Gamma::Scale },
                    "linear" => KernelType::Linear,
                    other => return Err(invalid("kernel", other, "expected rbf or linear")),
                };
                Estimator::Svr(SvrRegressor::new(SvrConfig {
                    c: reader.f64_or("C", 1.0)?,
                    epsilon: reader.f64_or("epsilon", 0.1)?,
                    kernel,
                    ..Default::default()
                }))
            }
            ModelFamily::GradientBoosting { random_state } => {
                Estimator::GradientBoosting(GradientBoostingRegressor::new(BoostingConfig {
                    n_estimators: reader.usize_or("n_estimators", 100)?,
                    learning_rate: reader.f64_or("learning_rate", 0.3)?,
                    max_depth: reader.usize_or("max_depth", 6)?,
                    random_state: Some(*random_state),
                    ..Default::default()
                }))
            }
            ModelFamily::RandomForest { random_state } => {
                let model = RandomForestRegressor::new(reader.usize_or("n_estimators", 100)?)
                    .with_max_depth(reader.optional_usize("max_depth")?)
                    .with_min_samples_split(reader.usize_or("min_samples_split", 2)?)
                    .with_random_state(*random_state);
                Estimator::RandomForest(model)
            }
        };
        reader.reject_unused()?;
        Ok(estimator)
    }
}

fn invalid(name: &str, value: impl fmt::Display, reason: &str) -> PricingError {
    PricingError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Typed access to a grid point that remembers which keys were read
struct ParamReader<'a> {
    params: &'a ParamSet,
    used: std::cell::RefCell<Vec<&'a str>>,
}

impl<'a> ParamReader<'a> {
    fn new(params: &'a ParamSet) -> Self {
        Self {
            params,
            used: std::cell::RefCell::new(Vec::new()),
        }
    }

    fn get(&self, name: &str) -> Option<&'a ParamValue> {
        let (key, value) = self.params.get_key_value(name)?;
        self.used.borrow_mut().push(key.as_str());
        Some(value)
    }

    fn f64_or(&self, name: &str, default: f64) -> Result<f64> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v.as_f64().ok_or_else(|| invalid(name, v, "expected a number")),
        }
    }

    fn usize_or(&self, name: &str, default: usize) -> Result<usize> {
        Ok(self.optional_usize(name)?.unwrap_or(default))
    }

    fn optional_usize(&self, name: &str) -> Result<Option<usize>> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_usize()
                .map(Some)
                .ok_or_else(|| invalid(name, v, "expected a non-negative integer")),
        }
    }

    fn str_or(&self, name: &str, default: &'a str) -> Result<&'a str> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v.as_str().ok_or_else(|| invalid(name, v, "expected a string")),
        }
    }

    fn reject_unused(&self) -> Result<()> {
        let used = self.used.borrow();
        match self.params.keys().find(|k| !used.contains(&k.as_str())) {
            Some(extra) => Err(invalid(extra, &self.params[extra], "unknown hyperparameter")),
            None => Ok(()),
        }
    }
}

/// A named estimator family with its search grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub name: String,
    pub family: ModelFamily,
    pub use_poly: bool,
    pub grid: ParamGrid,
}

impl ModelCandidate {
    pub fn new(name: impl Into<String>, family: ModelFamily) -> Self {
        Self {
            name: name.into(),
            family,
            use_poly: false,
            grid: ParamGrid::new(),
        }
    }

    pub fn with_poly(mut self, use_poly: bool) -> Self {
        self.use_poly = use_poly;
        self
    }

    pub fn with_param<V: Into<ParamValue>>(mut self, name: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.grid
            .insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn grid_points(&self) -> Vec<ParamSet> {
        expand_grid(&self.grid)
    }
}

/// The candidate roster, in tie-break order
pub fn model_zoo(random_state: u64) -> Vec<ModelCandidate> {
    vec![
        ModelCandidate::new("Polynomial_Ridge", ModelFamily::Ridge)
            .with_poly(true)
            .with_param("alpha", [0.1, 1.0, 10.0])
            .with_param("solver", ["auto", "sparse_cg", "lsqr"]),
        ModelCandidate::new("Standard_Ridge", ModelFamily::Ridge)
            .with_param("alpha", [0.1, 1.0, 10.0])
            .with_param("solver", ["auto"]),
        ModelCandidate::new("Lasso", ModelFamily::Lasso)
            .with_param("alpha", [0.01, 0.1, 1.0])
            .with_param("max_iter", [10_000i64]),
        ModelCandidate::new("SVR", ModelFamily::Svr)
            .with_param("C", [0.1, 1.0])
            .with_param("kernel", ["rbf"])
            .with_param("epsilon", [0.1, 0.2]),
        ModelCandidate::new("XGBoost", ModelFamily::GradientBoosting { random_state })
            .with_param("n_estimators", [100i64, 200])
            .with_param("learning_rate", [0.05, 0.1])
            .with_param("max_depth", [3i64, 6]),
        ModelCandidate::new("Random_Forest", ModelFamily::RandomForest { random_state })
            .with_param("n_estimators", [100i64])
            .with_param("max_depth", [10i64, 20])
            .with_param("min_samples_split", [2i64, 5]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_grid_order() {
        let mut grid = ParamGrid::new();
        grid.insert("b".to_string(), vec![1i64.into(), 2i64.into()]);
        grid.insert("a".to_string(), vec!["x".into(), "y".into()]);

        let points = expand_grid(&grid);
        let rendered: Vec<String> = points.iter().map(format_params).collect();
        assert_eq!(rendered, vec!["a=x, b=1", "a=x, b=2", "a=y, b=1", "a=y, b=2"]);
    }

    #[test]
    fn test_empty_grid_has_one_point() {
        assert_eq!(expand_grid(&ParamGrid::new()), vec![ParamSet::new()]);
    }

    #[test]
    fn test_zoo_roster() {
        let zoo = model_zoo(42);
        let names: Vec<&str> = zoo.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Polynomial_Ridge", "Standard_Ridge", "Lasso", "SVR", "XGBoost", "Random_Forest"]
        );
        assert!(zoo[0].use_poly);
        assert!(zoo[1..].iter().all(|c| !c.use_poly));

        let sizes: Vec<usize> = zoo.iter().map(|c| c.grid_points().len()).collect();
        assert_eq!(sizes, vec![9, 3, 3, 4, 8, 4]);
    }

    #[test]
    fn test_every_zoo_point_builds() {
        for candidate in model_zoo(42) {
            for point in candidate.grid_points() {
                candidate.family.build(&point).unwrap();
            }
        }
    }

    #[test]
    fn test_build_rejects_unknown_param() {
        let mut params = ParamSet::new();
        params.insert("alpha".to_string(), 1.0.into());
        params.insert("gamma".to_string(), 1.0.into());
        let err = ModelFamily::Lasso.build(&params).unwrap_err();
        assert!(matches!(err, PricingError::InvalidParameter { name, .. } if name == "gamma"));
    }

    #[test]
    fn test_build_ridge_solver() {
        let mut params = ParamSet::new();
        params.insert("solver".to_string(), "lsqr".into());
        match ModelFamily::Ridge.build(&params).unwrap() {
            Estimator::Ridge(m) => assert_eq!(m.solver, RidgeSolver::Lsqr),
            other => panic!("unexpected estimator {}", other.kind()),
        }
    }
}
