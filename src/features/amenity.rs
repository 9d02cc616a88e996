//! Amenity count feature

use super::FrameTransform;
use crate::config::AMENITY_SCORE_COLUMN;
use crate::data::string_values;
use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Replaces the raw amenities string with the number of comma-separated
/// tokens it holds.
///
/// The count is taken literally: `"{TV,Wifi,Pool}"` scores 3 and an empty
/// string scores 1. A null cell counts as a single token, so it also scores 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmenityScoreTransformer {
    column: String,
    output: String,
}

impl Default for AmenityScoreTransformer {
    fn default() -> Self {
        Self::new("amenities")
    }
}

impl AmenityScoreTransformer {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            output: AMENITY_SCORE_COLUMN.to_string(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn score(raw: &str) -> f64 {
        raw.split(',').count() as f64
    }
}

impl FrameTransform for AmenityScoreTransformer {
    fn fit(&mut self, _df: &DataFrame) -> Result<&mut Self> {
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let Some(values) = string_values(df, &self.column)? else {
            warn!(column = %self.column, "Amenities column absent; passing through");
            return Ok(df.clone());
        };

        let scores: Vec<f64> = values
            .iter()
            .map(|v| v.as_deref().map_or(1.0, Self::score))
            .collect();

        let mut result = df.drop(&self.column)?;
        result.with_column(Column::new(self.output.as_str().into(), scores))?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_counts_tokens() {
        assert_eq!(AmenityScoreTransformer::score("{TV,Wifi,Pool}"), 3.0);
        assert_eq!(AmenityScoreTransformer::score("{TV}"), 1.0);
        assert_eq!(AmenityScoreTransformer::score(""), 1.0);
    }

    #[test]
    fn test_transform_replaces_column() {
        let df = df!(
            "amenities" => &[Some("{TV,Wifi,Pool}"), Some(""), None],
            "beds" => &[1.0, 2.0, 3.0]
        )
        .unwrap();

        let out = AmenityScoreTransformer::default().transform(&df).unwrap();

        assert!(out.column("amenities").is_err());
        let score = out.column("amenity_score").unwrap().f64().unwrap();
        assert_eq!(score.get(0), Some(3.0));
        assert_eq!(score.get(1), Some(1.0));
        assert_eq!(score.get(2), Some(1.0));
        assert_eq!(score.null_count(), 0);
    }

    #[test]
    fn test_absent_column_passes_through() {
        let df = df!("beds" => &[1.0, 2.0]).unwrap();
        let out = AmenityScoreTransformer::default().transform(&df).unwrap();
        assert_eq!(out.width(), 1);
        assert!(out.column("amenity_score").is_err());
    }
}
