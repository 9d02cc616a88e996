//! Log-scaling of heavy-tailed counts

use super::{ArrayTransform, FrameTransform};
use crate::data::numeric_values;
use crate::error::{PricingError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// `v -> ln(1 + max(v, 0))`, missing stays missing.
///
/// On a table the transform targets the named columns (every numeric column
/// when unnamed). On a matrix it targets the positions it was bound to with
/// [`LogTransformer::bind`], or every column when unbound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogTransformer {
    columns: Option<Vec<String>>,
    positions: Option<Vec<usize>>,
}

impl LogTransformer {
    pub fn new(columns: Option<Vec<String>>) -> Self {
        Self {
            columns,
            positions: None,
        }
    }

    /// Transformer for a fixed set of column names
    pub fn for_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        Self::new(Some(columns.iter().map(|c| c.as_ref().to_string()).collect()))
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Resolve configured names against the column order of a matrix.
    ///
    /// Names that are not part of `layout` are skipped with a warning.
    pub fn bind(&mut self, layout: &[String]) -> &mut Self {
        if let Some(columns) = &self.columns {
            let mut positions = Vec::with_capacity(columns.len());
            for name in columns {
                match layout.iter().position(|c| c == name) {
                    Some(pos) => positions.push(pos),
                    None => warn!(column = %name, "Log transform column not in numeric branch"),
                }
            }
            self.positions = Some(positions);
        }
        self
    }

    pub fn positions(&self) -> Option<&[usize]> {
        self.positions.as_deref()
    }

    #[inline]
    pub fn apply(v: f64) -> f64 {
        if v.is_nan() {
            v
        } else {
            v.max(0.0).ln_1p()
        }
    }
}

impl FrameTransform for LogTransformer {
    fn fit(&mut self, _df: &DataFrame) -> Result<&mut Self> {
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let targets: Vec<String> = match &self.columns {
            Some(columns) => columns.clone(),
            None => df
                .get_columns()
                .iter()
                .filter(|c| is_numeric_dtype(c.dtype()))
                .map(|c| c.name().to_string())
                .collect(),
        };

        let mut result = df.clone();
        for name in &targets {
            let Some(values) = numeric_values(df, name)? else {
                warn!(column = %name, "Log transform column absent; passing through");
                continue;
            };
            let logged: Vec<Option<f64>> = values.into_iter().map(|v| v.map(Self::apply)).collect();
            result.with_column(Column::new(name.as_str().into(), logged))?;
        }
        Ok(result)
    }
}

impl ArrayTransform for LogTransformer {
    fn fit(&mut self, _x: &Array2<f64>, _y: Option<&Array1<f64>>) -> Result<&mut Self> {
        Ok(self)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let mut out = x.clone();
        match &self.positions {
            None => out.mapv_inplace(Self::apply),
            Some(positions) => {
                for &pos in positions {
                    if pos >= out.ncols() {
                        return Err(PricingError::ShapeError {
                            expected: format!("more than {pos} columns"),
                            actual: format!("{} columns", out.ncols()),
                        });
                    }
                    out.column_mut(pos).mapv_inplace(Self::apply);
                }
            }
        }
        Ok(out)
    }
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}
