//! One-hot encoding of categorical columns

use crate::error::{PricingError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What to do with a category not seen during fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HandleUnknown {
    /// Emit an all-zero indicator slice
    #[default]
    Ignore,
    /// Fail the transform
    Error,
}

/// One-hot encoder with a sorted per-column vocabulary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    handle_unknown: HandleUnknown,
    categories: Option<Vec<Vec<String>>>,
}

impl OneHotEncoder {
    pub fn new(handle_unknown: HandleUnknown) -> Self {
        Self {
            handle_unknown,
            categories: None,
        }
    }

    /// Learned vocabulary per input column, sorted
    pub fn categories(&self) -> Option<&[Vec<String>]> {
        self.categories.as_deref()
    }

    /// Total width of the encoded output
    pub fn n_output_features(&self) -> usize {
        self.categories
            .as_ref()
            .map(|c| c.iter().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// `{column}_{category}` for each output column
    pub fn feature_names(&self, input_names: &[String]) -> Vec<String> {
        let Some(categories) = &self.categories else {
            return Vec::new();
        };
        input_names
            .iter()
            .zip(categories)
            .flat_map(|(name, cats)| cats.iter().map(move |c| format!("{name}_{c}")))
            .collect()
    }

    /// Learn the vocabulary from column-major data
    pub fn fit(&mut self, columns: &[Vec<String>]) -> Result<&mut Self> {
        let categories = columns
            .iter()
            .map(|column| {
                column
                    .iter()
                    .cloned()
                    .collect::<BTreeSet<String>>()
                    .into_iter()
                    .collect()
            })
            .collect();
        self.categories = Some(categories);
        Ok(self)
    }

    /// Encode column-major data into a dense indicator matrix
    pub fn transform(&self, columns: &[Vec<String>]) -> Result<Array2<f64>> {
        let categories = self.categories.as_ref().ok_or(PricingError::ModelNotFitted)?;
        if categories.len() != columns.len() {
            return Err(PricingError::ShapeError {
                expected: format!("{} categorical columns", categories.len()),
                actual: format!("{} categorical columns", columns.len()),
            });
        }

        let n_rows = columns.first().map(Vec::len).unwrap_or(0);
        let mut out = Array2::zeros((n_rows, self.n_output_features()));

        let mut offset = 0;
        for (column, vocab) in columns.iter().zip(categories) {
            for (row, value) in column.iter().enumerate() {
                match vocab.binary_search(value) {
                    Ok(pos) => out[[row, offset + pos]] = 1.0,
                    Err(_) if self.handle_unknown == HandleUnknown::Ignore => {}
                    Err(_) => {
                        return Err(PricingError::DataFormat(format!(
                            "unknown category '{value}'"
                        )))
                    }
                }
            }
            offset += vocab.len();
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, columns: &[Vec<String>]) -> Result<Array2<f64>> {
        self.fit(columns)?;
        self.transform(columns)
    }
}
