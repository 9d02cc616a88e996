//! Numeric and categorical column branches

use crate::data::{numeric_values, string_values};
use crate::error::{PricingError, Result};
use crate::features::{ArrayTransform, LogTransformer};
use crate::preprocessing::{CategoricalImputer, Imputer, OneHotEncoder, PolynomialFeatures, StandardScaler};
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One step of the numeric branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NumericStep {
    Impute(Imputer),
    Log(LogTransformer),
    Scale(StandardScaler),
    Poly(PolynomialFeatures),
}

impl NumericStep {
    pub fn name(&self) -> &'static str {
        match self {
            NumericStep::Impute(_) => "impute",
            NumericStep::Log(_) => "log",
            NumericStep::Scale(_) => "scale",
            NumericStep::Poly(_) => "poly",
        }
    }
}

impl ArrayTransform for NumericStep {
    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<&mut Self> {
        match self {
            NumericStep::Impute(t) => {
                t.fit(x, y)?;
            }
            NumericStep::Log(t) => {
                ArrayTransform::fit(t, x, y)?;
            }
            NumericStep::Scale(t) => {
                t.fit(x, y)?;
            }
            NumericStep::Poly(t) => {
                t.fit(x, y)?;
            }
        }
        Ok(self)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        match self {
            NumericStep::Impute(t) => t.transform(x),
            NumericStep::Log(t) => ArrayTransform::transform(t, x),
            NumericStep::Scale(t) => t.transform(x),
            NumericStep::Poly(t) => t.transform(x),
        }
    }
}

/// Configured numeric columns pushed through an ordered list of steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericBranch {
    columns: Vec<String>,
    steps: Vec<NumericStep>,
    fitted: bool,
}

impl NumericBranch {
    pub fn new(columns: Vec<String>, steps: Vec<NumericStep>) -> Self {
        Self {
            columns,
            steps,
            fitted: false,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn steps(&self) -> &[NumericStep] {
        &self.steps
    }

    /// Dense matrix of the branch columns; missing cells and absent columns are NaN
    fn extract(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let n_rows = df.height();
        let mut x = Array2::from_elem((n_rows, self.columns.len()), f64::NAN);
        let mut absent = Vec::new();

        for (j, name) in self.columns.iter().enumerate() {
            match numeric_values(df, name)? {
                Some(values) => {
                    for (i, v) in values.into_iter().enumerate() {
                        if let Some(v) = v {
                            x[[i, j]] = v;
                        }
                    }
                }
                None => absent.push(name.as_str()),
            }
        }

        if !absent.is_empty() {
            warn!(columns = ?absent, "Numeric columns absent; treating as missing");
        }
        Ok(x)
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        let mut x = self.extract(df)?;
        for step in &mut self.steps {
            x = step.fit_transform(&x, None)?;
        }
        self.fitted = true;
        Ok(x)
    }

    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.fitted {
            return Err(PricingError::ModelNotFitted);
        }
        let mut x = self.extract(df)?;
        for step in &self.steps {
            x = step.transform(&x)?;
        }
        Ok(x)
    }

    /// Output column names after every step
    pub fn output_names(&self) -> Vec<String> {
        let mut names = self.columns.clone();
        for step in &self.steps {
            if let NumericStep::Poly(poly) = step {
                names = poly.feature_names(&names);
            }
        }
        names
    }
}

/// Configured categorical columns: constant fill, then one-hot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalBranch {
    columns: Vec<String>,
    imputer: CategoricalImputer,
    encoder: OneHotEncoder,
}

impl CategoricalBranch {
    pub fn new(columns: Vec<String>, imputer: CategoricalImputer, encoder: OneHotEncoder) -> Self {
        Self {
            columns,
            imputer,
            encoder,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    fn extract(&self, df: &DataFrame) -> Result<Vec<Vec<String>>> {
        let n_rows = df.height();
        let mut raw = Vec::with_capacity(self.columns.len());
        let mut absent = Vec::new();

        for name in &self.columns {
            match string_values(df, name)? {
                Some(values) => raw.push(values),
                None => {
                    absent.push(name.as_str());
                    raw.push(vec![None; n_rows]);
                }
            }
        }

        if !absent.is_empty() {
            warn!(columns = ?absent, "Categorical columns absent; treating as missing");
        }
        Ok(self.imputer.transform(&raw))
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        let filled = self.extract(df)?;
        self.encoder.fit_transform(&filled)
    }

    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let filled = self.extract(df)?;
        self.encoder.transform(&filled)
    }

    pub fn output_names(&self) -> Vec<String> {
        self.encoder.feature_names(&self.columns)
    }
}
