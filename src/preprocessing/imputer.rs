//! Missing value imputation

use crate::error::{PricingError, Result};
use crate::features::ArrayTransform;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Strategy for filling `NaN` cells in a numeric matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Column mean of observed values
    Mean,
    /// Column median of observed values
    Median,
    /// A fixed value
    Constant(f64),
}

/// Numeric imputer over `NaN`-marked matrices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    statistics: Option<Vec<f64>>,
}

impl Imputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            statistics: None,
        }
    }

    pub fn median() -> Self {
        Self::new(ImputeStrategy::Median)
    }

    /// Fill value learned per column
    pub fn statistics(&self) -> Option<&[f64]> {
        self.statistics.as_deref()
    }

    fn compute_fill_value(&self, observed: &mut [f64]) -> Option<f64> {
        if observed.is_empty() {
            return match self.strategy {
                ImputeStrategy::Constant(v) => Some(v),
                _ => None,
            };
        }
        match self.strategy {
            ImputeStrategy::Mean => Some(observed.iter().sum::<f64>() / observed.len() as f64),
            ImputeStrategy::Median => Some(median(observed)),
            ImputeStrategy::Constant(v) => Some(v),
        }
    }
}

impl ArrayTransform for Imputer {
    fn fit(&mut self, x: &Array2<f64>, _y: Option<&Array1<f64>>) -> Result<&mut Self> {
        let mut statistics = Vec::with_capacity(x.ncols());
        for (idx, column) in x.columns().into_iter().enumerate() {
            let mut observed: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
            let fill = self.compute_fill_value(&mut observed).unwrap_or_else(|| {
                warn!(column = idx, "No observed values to impute from; filling with 0");
                0.0
            });
            statistics.push(fill);
        }
        self.statistics = Some(statistics);
        Ok(self)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let statistics = self.statistics.as_ref().ok_or(PricingError::ModelNotFitted)?;
        if statistics.len() != x.ncols() {
            return Err(PricingError::ShapeError {
                expected: format!("{} columns", statistics.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (mut column, &fill) in out.columns_mut().into_iter().zip(statistics.iter()) {
            column.mapv_inplace(|v| if v.is_nan() { fill } else { v });
        }
        Ok(out)
    }
}

/// Median with the two middle values averaged for even lengths
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Fills missing categorical cells with a constant label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalImputer {
    fill_value: String,
}

impl Default for CategoricalImputer {
    fn default() -> Self {
        Self::new("missing")
    }
}

impl CategoricalImputer {
    pub fn new(fill_value: impl Into<String>) -> Self {
        Self {
            fill_value: fill_value.into(),
        }
    }

    pub fn fill_value(&self) -> &str {
        &self.fill_value
    }

    /// Column-major input, column-major output
    pub fn transform(&self, columns: &[Vec<Option<String>>]) -> Vec<Vec<String>> {
        columns
            .iter()
            .map(|column| {
                column
                    .iter()
                    .map(|v| v.clone().unwrap_or_else(|| self.fill_value.clone()))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_median_imputer() {
        let x = array![[1.0, f64::NAN], [f64::NAN, 4.0], [3.0, 6.0], [10.0, 8.0]];
        let mut imputer = Imputer::median();
        let out = imputer.fit_transform(&x, None).unwrap();

        assert_eq!(imputer.statistics().unwrap(), &[3.0, 6.0]);
        assert_eq!(out[[1, 0]], 3.0);
        assert_eq!(out[[0, 1]], 6.0);
        assert_eq!(out[[3, 0]], 10.0);
    }

    #[test]
    fn test_all_missing_column_falls_back_to_zero() {
        let x = array![[f64::NAN], [f64::NAN]];
        let out = Imputer::median().fit_transform(&x, None).unwrap();
        assert_eq!(out[[0, 0]], 0.0);
    }

    #[test]
    fn test_mean_and_constant() {
        let x = array![[1.0], [f64::NAN], [3.0]];
        let out = Imputer::new(ImputeStrategy::Mean).fit_transform(&x, None).unwrap();
        assert_eq!(out[[1, 0]], 2.0);

        let out = Imputer::new(ImputeStrategy::Constant(-1.0)).fit_transform(&x, None).unwrap();
        assert_eq!(out[[1, 0]], -1.0);
    }

    #[test]
    fn test_transform_before_fit() {
        let x = array![[1.0]];
        assert!(matches!(
            Imputer::median().transform(&x),
            Err(PricingError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_categorical_imputer() {
        let cols = vec![vec![Some("a".to_string()), None]];
        let out = CategoricalImputer::default().transform(&cols);
        assert_eq!(out, vec![vec!["a".to_string(), "missing".to_string()]]);
    }
}
