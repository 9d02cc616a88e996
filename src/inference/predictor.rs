//! Single-record price prediction

use super::ModelArtifact;
use crate::data::parse_numeric_cell;
use crate::error::{PricingError, Result};
use polars::prelude::*;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// A raw request record: field name to JSON value
pub type Record = serde_json::Map<String, Value>;

/// Alternate field names accepted from callers, as `(alias, canonical)`.
///
/// `cleaning_fee` feeding `beds` is inherited from the deployed service.
pub const FIELD_ALIASES: &[(&str, &str)] = &[
    ("min_nights", "minimum_nights"),
    ("neighborhood", "neighbourhood_cleansed"),
    ("cleaning_fee", "beds"),
];

/// Rewrite aliased keys to their canonical names. A canonical key already
/// present wins over its alias.
pub fn apply_aliases(record: &Record) -> Record {
    let mut out = record.clone();
    for (alias, canonical) in FIELD_ALIASES {
        if let Some(value) = out.remove(*alias) {
            if !out.contains_key(*canonical) {
                out.insert(canonical.to_string(), value);
            }
        }
    }
    out
}

/// Round to cents
pub fn round_price(p: f64) -> f64 {
    (p * 100.0).round() / 100.0
}

/// Loaded champion ready to price listings
#[derive(Debug, Clone)]
pub struct PricingPredictor {
    artifact: ModelArtifact,
    numeric_columns: Vec<String>,
    text_columns: Vec<String>,
}

impl PricingPredictor {
    pub fn new(artifact: ModelArtifact) -> Self {
        let all = artifact.pipeline.input_columns();
        let numeric = artifact.pipeline.numeric().columns();
        let (numeric_columns, text_columns): (Vec<String>, Vec<String>) = all.into_iter().partition(|c| numeric.contains(c));
        Self {
            artifact,
            numeric_columns,
            text_columns,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(ModelArtifact::load(path)?))
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn model_name(&self) -> &str {
        &self.artifact.model_name
    }

    /// Fields a record may carry; anything else is ignored
    pub fn expected_fields(&self) -> Vec<String> {
        self.numeric_columns
            .iter()
            .chain(self.text_columns.iter())
            .cloned()
            .collect()
    }

    /// Price one listing, rounded to cents
    pub fn predict(&self, record: &Record) -> Result<f64> {
        let prices = self.predict_batch(std::slice::from_ref(record))?;
        prices
            .into_iter()
            .next()
            .ok_or_else(|| PricingError::Inference("empty prediction".to_string()))
    }

    /// Price a JSON value that must be an object
    pub fn predict_value(&self, value: &Value) -> Result<f64> {
        match value {
            Value::Object(record) => self.predict(record),
            other => Err(PricingError::DataFormat(format!(
                "expected a JSON object, got {}",
                json_type(other)
            ))),
        }
    }

    pub fn predict_batch(&self, records: &[Record]) -> Result<Vec<f64>> {
        let records: Vec<Record> = records.iter().map(apply_aliases).collect();
        let frame = self.build_frame(&records)?;
        let raw = self.artifact.pipeline.predict(&frame)?;

        raw.iter()
            .enumerate()
            .map(|(i, &p)| {
                if p.is_finite() {
                    Ok(round_price(p))
                } else {
                    Err(PricingError::Inference(format!("non-finite estimate {p} for record {i}")))
                }
            })
            .collect()
    }

    /// One row per record over exactly the expected columns; absent fields are null
    fn build_frame(&self, records: &[Record]) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.numeric_columns.len() + self.text_columns.len());

        for name in &self.numeric_columns {
            let values = records
                .iter()
                .map(|r| numeric_field(name, r.get(name)))
                .collect::<Result<Vec<Option<f64>>>>()?;
            columns.push(Column::new(name.as_str().into(), values));
        }
        for name in &self.text_columns {
            let values = records
                .iter()
                .map(|r| text_field(name, r.get(name)))
                .collect::<Result<Vec<Option<String>>>>()?;
            columns.push(Column::new(name.as_str().into(), values));
        }

        let df = DataFrame::new(columns)?;
        debug!(rows = df.height(), columns = df.width(), "Request frame built");
        Ok(df)
    }
}

fn numeric_field(name: &str, value: Option<&Value>) -> Result<Option<f64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => parse_numeric_cell(s)
            .map_err(|_| PricingError::DataFormat(format!("field '{name}': '{s}' is not numeric"))),
        Some(other) => Err(PricingError::DataFormat(format!(
            "field '{name}': expected a number, got {}",
            json_type(other)
        ))),
    }
}

fn text_field(name: &str, value: Option<&Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(PricingError::DataFormat(format!(
            "field '{name}': expected a string, got {}",
            json_type(other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_aliases_rewrite_keys() {
        let out = apply_aliases(&record(json!({
            "min_nights": 3,
            "neighborhood": "Mission",
            "cleaning_fee": 2
        })));
        assert_eq!(out.get("minimum_nights"), Some(&json!(3)));
        assert_eq!(out.get("neighbourhood_cleansed"), Some(&json!("Mission")));
        assert_eq!(out.get("beds"), Some(&json!(2)));
        assert!(!out.contains_key("min_nights"));
    }

    #[test]
    fn test_canonical_key_wins() {
        let out = apply_aliases(&record(json!({"minimum_nights": 5, "min_nights": 1})));
        assert_eq!(out.get("minimum_nights"), Some(&json!(5)));
    }

    #[test]
    fn test_round_price() {
        assert_eq!(round_price(123.456), 123.46);
        assert_eq!(round_price(99.0), 99.0);
    }

    #[test]
    fn test_numeric_field_coercion() {
        assert_eq!(numeric_field("beds", Some(&json!(2))).unwrap(), Some(2.0));
        assert_eq!(numeric_field("beds", Some(&json!("2.5"))).unwrap(), Some(2.5));
        assert_eq!(numeric_field("beds", Some(&json!(""))).unwrap(), None);
        assert_eq!(numeric_field("beds", None).unwrap(), None);
        assert!(matches!(
            numeric_field("beds", Some(&json!("two"))),
            Err(PricingError::DataFormat(_))
        ));
        assert!(matches!(
            numeric_field("beds", Some(&json!(true))),
            Err(PricingError::DataFormat(_))
        ));
    }

    #[test]
    fn test_text_field_rejects_arrays() {
        assert_eq!(text_field("room_type", Some(&json!("Private room"))).unwrap().as_deref(), Some("Private room"));
        assert!(text_field("room_type", Some(&json!(["a"]))).is_err());
    }
}
