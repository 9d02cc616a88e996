//! Row-level cleaning of raw listings

use super::{numeric_values, string_values};
use crate::config::PricingConfig;
use crate::error::{PricingError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Counts reported by [`clean_listings`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub rows_read: usize,
    pub rows_kept: usize,
    /// Rows whose price was empty or not a number
    pub dropped_price: usize,
    /// Rows with a numeric feature that could not be parsed
    pub dropped_format: usize,
    /// Configured feature columns absent from the input
    pub missing_columns: Vec<String>,
}

/// Parse a currency string such as `"$1,250.00"`.
pub fn parse_price(raw: &str) -> Result<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Err(PricingError::DataFormat("empty price".to_string()));
    }

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(PricingError::DataFormat(format!("invalid price '{raw}'"))),
    }
}

/// Parse one numeric feature cell. Blank cells are missing.
pub fn parse_numeric_cell(raw: &str) -> Result<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(PricingError::DataFormat(format!("'{raw}' is not numeric"))),
    }
}

/// Type the raw text frame and drop rows that cannot be used for training.
///
/// The result holds the configured feature columns (absent ones as all-null),
/// the amenities column when present, and the target as `Float64`.
pub fn clean_listings(df: &DataFrame, config: &PricingConfig) -> Result<(DataFrame, CleaningSummary)> {
    let n_rows = df.height();
    let mut summary = CleaningSummary {
        rows_read: n_rows,
        ..Default::default()
    };

    let raw_target = string_values(df, &config.target)?
        .ok_or_else(|| PricingError::MissingColumn(config.target.clone()))?;

    let mut keep = vec![true; n_rows];
    let mut prices = vec![0.0; n_rows];
    for (row, cell) in raw_target.iter().enumerate() {
        match cell.as_deref().map(parse_price) {
            Some(Ok(price)) => prices[row] = price,
            Some(Err(e)) => {
                debug!(row, error = %e, "Dropping row");
                keep[row] = false;
                summary.dropped_price += 1;
            }
            None => {
                debug!(row, "Dropping row with missing price");
                keep[row] = false;
                summary.dropped_price += 1;
            }
        }
    }

    let mut numeric = Vec::with_capacity(config.numerical_features.len());
    for name in &config.numerical_features {
        let values = match df.column(name) {
            Err(_) => {
                warn!(column = %name, "Numeric feature absent; treating as missing");
                summary.missing_columns.push(name.clone());
                vec![None; n_rows]
            }
            Ok(_) => parse_numeric_column(df, name, &mut keep, &mut summary)?,
        };
        numeric.push((name, values));
    }

    let mut categorical = Vec::with_capacity(config.categorical_features.len());
    for name in &config.categorical_features {
        let values = match string_values(df, name)? {
            Some(values) => values
                .into_iter()
                .map(|v| v.filter(|s| !s.trim().is_empty()))
                .collect(),
            None => {
                warn!(column = %name, "Categorical feature absent; treating as missing");
                summary.missing_columns.push(name.clone());
                vec![None; n_rows]
            }
        };
        categorical.push((name, values));
    }

    let amenities = string_values(df, &config.amenities_column)?;

    let kept_rows: Vec<usize> = (0..n_rows).filter(|&r| keep[r]).collect();
    summary.rows_kept = kept_rows.len();

    let mut columns: Vec<Column> = Vec::new();
    for (name, values) in numeric {
        let kept: Vec<Option<f64>> = kept_rows.iter().map(|&r| values[r]).collect();
        columns.push(Column::new(name.as_str().into(), kept));
    }
    for (name, values) in categorical {
        let kept: Vec<Option<String>> = kept_rows.iter().map(|&r| values[r].clone()).collect();
        columns.push(Column::new(name.as_str().into(), kept));
    }
    if let Some(values) = amenities {
        let kept: Vec<Option<String>> = kept_rows.iter().map(|&r| values[r].clone()).collect();
        columns.push(Column::new(config.amenities_column.as_str().into(), kept));
    }
    let target: Vec<f64> = kept_rows.iter().map(|&r| prices[r]).collect();
    columns.push(Column::new(config.target.as_str().into(), target));

    let cleaned = DataFrame::new(columns)?;

    if summary.dropped_price > 0 {
        warn!(count = summary.dropped_price, "Dropped rows with unparseable price");
    }
    if summary.dropped_format > 0 {
        warn!(count = summary.dropped_format, "Dropped rows with malformed numeric features");
    }
    info!(
        rows_read = summary.rows_read,
        rows_kept = summary.rows_kept,
        "Cleaned listings"
    );

    Ok((cleaned, summary))
}

fn parse_numeric_column(
    df: &DataFrame,
    name: &str,
    keep: &mut [bool],
    summary: &mut CleaningSummary,
) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.as_materialized_series();
    if column.dtype() != &DataType::String {
        return Ok(numeric_values(df, name)?.unwrap_or_default());
    }

    let mut values = Vec::with_capacity(column.len());
    for (row, cell) in column.str()?.into_iter().enumerate() {
        let parsed = match cell {
            None => None,
            Some(raw) => match parse_numeric_cell(raw) {
                Ok(v) => v,
                Err(e) => {
                    debug!(row, column = %name, error = %e, "Dropping row");
                    if keep[row] {
                        keep[row] = false;
                        summary.dropped_format += 1;
                    }
                    None
                }
            },
        };
        values.push(parsed);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("$1,250.00").unwrap(), 1250.0);
        assert_eq!(parse_price(" $85 ").unwrap(), 85.0);
        assert_eq!(parse_price("120").unwrap(), 120.0);
        assert!(parse_price("").is_err());
        assert!(parse_price("$").is_err());
        assert!(parse_price("call us").is_err());
        assert!(parse_price("NaN").is_err());
    }

    #[test]
    fn test_parse_numeric_cell() {
        assert_eq!(parse_numeric_cell("2.5").unwrap(), Some(2.5));
        assert_eq!(parse_numeric_cell("  ").unwrap(), None);
        assert!(parse_numeric_cell("2 beds").is_err());
    }

    #[test]
    fn test_clean_listings_drops_bad_rows() {
        let config = PricingConfig::default();
        let df = df!(
            "price" => &[Some("$100.00"), Some("n/a"), None, Some("$1,000"), Some("$50")],
            "accommodates" => &[Some("2"), Some("2"), Some("3"), Some("many"), Some("")],
            "bathrooms" => &["1", "1", "1", "1", "1"],
            "bedrooms" => &["1", "1", "1", "1", "1"],
            "beds" => &["1", "1", "1", "1", "1"],
            "minimum_nights" => &["2", "2", "2", "2", "30"],
            "neighbourhood_cleansed" => &["A", "B", "C", "D", "E"],
            "property_type" => &["Apt", "Apt", "Apt", "Apt", ""],
            "room_type" => &["Entire", "Entire", "Entire", "Entire", "Private"],
            "amenities" => &["{TV}", "{}", "{}", "{}", "{Wifi,TV}"]
        )
        .unwrap();

        let (cleaned, summary) = clean_listings(&df, &config).unwrap();

        assert_eq!(summary.rows_read, 5);
        assert_eq!(summary.rows_kept, 2);
        assert_eq!(summary.dropped_price, 2);
        assert_eq!(summary.dropped_format, 1);

        let price = cleaned.column("price").unwrap().f64().unwrap();
        assert_eq!(price.get(0), Some(100.0));
        assert_eq!(price.get(1), Some(50.0));

        let acc = cleaned.column("accommodates").unwrap().f64().unwrap();
        assert_eq!(acc.get(1), None);

        let prop = cleaned.column("property_type").unwrap().str().unwrap();
        assert_eq!(prop.get(1), None);
    }

    #[test]
    fn test_clean_listings_missing_feature_column() {
        let config = PricingConfig::default();
        let df = df!(
            "price" => &["$10", "$20"],
            "beds" => &["1", "2"]
        )
        .unwrap();

        let (cleaned, summary) = clean_listings(&df, &config).unwrap();
        assert_eq!(summary.rows_kept, 2);
        assert!(summary.missing_columns.contains(&"bedrooms".to_string()));
        assert_eq!(cleaned.column("bedrooms").unwrap().null_count(), 2);
        assert!(cleaned.column("amenities").is_err());
    }

    #[test]
    fn test_clean_listings_missing_target_is_fatal() {
        let config = PricingConfig::default();
        let df = df!("beds" => &["1"]).unwrap();
        let err = clean_listings(&df, &config).unwrap_err();
        assert!(matches!(err, PricingError::MissingColumn(c) if c == "price"));
    }
}
