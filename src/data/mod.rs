//! Data ingestion, cleaning and splitting
//!
//! Raw listings arrive as text. This module turns them into a typed frame
//! (numeric features as `Float64`, categories and amenities as `String`,
//! target as non-null `Float64`) and partitions it for training.

mod cleaning;
mod loader;
mod split;

pub use cleaning::{clean_listings, parse_numeric_cell, parse_price, CleaningSummary};
pub use loader::DataLoader;
pub use split::{take_rows, train_test_split, DatasetSplit};

use crate::error::{PricingError, Result};
use ndarray::Array1;
use polars::prelude::*;

/// Read a column as optional floats.
///
/// Returns `Ok(None)` when the column is absent. Text columns are parsed cell
/// by cell (blank is missing); any other dtype is cast.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<f64>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let series = column.as_materialized_series();

    if series.dtype() == &DataType::String {
        let ca = series.str()?;
        let values = ca
            .into_iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                None => Ok(None),
                Some(raw) => parse_numeric_cell(raw).map_err(|_| {
                    PricingError::DataFormat(format!(
                        "column '{name}' row {row}: '{raw}' is not numeric"
                    ))
                }),
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(Some(values));
    }

    let cast = series.cast(&DataType::Float64)?;
    let values = cast.f64()?.into_iter().collect();
    Ok(Some(values))
}

/// Read a column as optional strings, casting non-text dtypes.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<String>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let cast = column.as_materialized_series().cast(&DataType::String)?;
    let values = cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(Some(values))
}

/// Extract a fully populated target vector.
pub fn target_values(df: &DataFrame, target: &str) -> Result<Array1<f64>> {
    let values = numeric_values(df, target)?
        .ok_or_else(|| PricingError::MissingColumn(target.to_string()))?;

    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| PricingError::DataFormat(format!("target '{target}' is null at row {row}")))
        })
        .collect::<Result<Vec<f64>>>()
        .map(Array1::from)
}
