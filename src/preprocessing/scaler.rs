//! Standardization

use crate::error::{PricingError, Result};
use crate::features::ArrayTransform;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Z-score scaling with population standard deviation.
///
/// Columns with zero variance are centred but not scaled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Vec<f64>>,
    scale: Option<Vec<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mean(&self) -> Option<&[f64]> {
        self.mean.as_deref()
    }

    pub fn scale(&self) -> Option<&[f64]> {
        self.scale.as_deref()
    }
}

impl ArrayTransform for StandardScaler {
    fn fit(&mut self, x: &Array2<f64>, _y: Option<&Array1<f64>>) -> Result<&mut Self> {
        let mut means = Vec::with_capacity(x.ncols());
        let mut scales = Vec::with_capacity(x.ncols());

        for column in x.columns() {
            let observed: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
            let n = observed.len() as f64;
            if observed.is_empty() {
                means.push(0.0);
                scales.push(1.0);
                continue;
            }
            let mean = observed.iter().sum::<f64>() / n;
            let var = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();

            means.push(mean);
            scales.push(if std > 0.0 { std } else { 1.0 });
        }

        self.mean = Some(means);
        self.scale = Some(scales);
        Ok(self)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (means, scales) = match (&self.mean, &self.scale) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(PricingError::ModelNotFitted),
        };
        if means.len() != x.ncols() {
            return Err(PricingError::ShapeError {
                expected: format!("{} columns", means.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (j, mut column) in out.columns_mut().into_iter().enumerate() {
            let (center, scale) = (means[j], scales[j]);
            column.mapv_inplace(|v| (v - center) / scale);
        }
        Ok(out)
    }
}
