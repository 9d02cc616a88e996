//! Pricing configuration
//!
//! Column routing, file locations and search settings for one training run.
//! Defaults read environment overrides so deployments can relocate the data
//! and the model file without code changes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the column derived from the amenities string
pub const AMENITY_SCORE_COLUMN: &str = "amenity_score";

/// Configuration for training and serving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Raw listings CSV
    pub raw_data_path: PathBuf,

    /// Where the champion artifact is written and read
    pub model_save_path: PathBuf,

    /// Columns routed through the numeric branch
    pub numerical_features: Vec<String>,

    /// Columns routed through the categorical branch
    pub categorical_features: Vec<String>,

    /// Columns the log-scale step applies to (must be numeric features)
    pub log_features: Vec<String>,

    /// Raw amenities string column
    pub amenities_column: String,

    /// Route the derived amenity score through the numeric branch. Off by
    /// default: the score is computed and then dropped by routing.
    pub use_amenity_score: bool,

    /// Target column name
    pub target: String,

    /// Seed for the train/test shuffle and seeded estimators
    pub random_state: u64,

    /// Fraction of rows held out for the final evaluation
    pub test_size: f64,

    /// Number of cross-validation folds
    pub cv_folds: usize,

    /// Cores left free when sizing the search worker pool
    pub reserved_cores: usize,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            raw_data_path: std::env::var("PRICING_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/raw/listings.csv")),
            model_save_path: std::env::var("PRICING_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models/pricing_model_v1.bin")),
            numerical_features: to_strings(&[
                "accommodates",
                "bathrooms",
                "bedrooms",
                "beds",
                "minimum_nights",
            ]),
            categorical_features: to_strings(&[
                "neighbourhood_cleansed",
                "property_type",
                "room_type",
            ]),
            log_features: to_strings(&["minimum_nights"]),
            amenities_column: "amenities".to_string(),
            use_amenity_score: false,
            target: "price".to_string(),
            random_state: 42,
            test_size: 0.2,
            cv_folds: 3,
            reserved_cores: 1,
        }
    }
}

impl PricingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw_data_path = path.into();
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_save_path = path.into();
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_amenity_score(mut self, enabled: bool) -> Self {
        self.use_amenity_score = enabled;
        self
    }

    /// Numeric branch columns in routing order (configured features, then the
    /// derived amenity score when enabled)
    pub fn numeric_branch_columns(&self) -> Vec<String> {
        let mut cols = self.numerical_features.clone();
        if self.use_amenity_score {
            cols.push(AMENITY_SCORE_COLUMN.to_string());
        }
        cols
    }

    /// Every raw input column a fitted pipeline reads
    pub fn required_input_columns(&self) -> Vec<String> {
        let mut cols = self.numerical_features.clone();
        cols.extend(self.categorical_features.iter().cloned());
        cols.push(self.amenities_column.clone());
        cols
    }

    /// Size of the cross-validation worker pool
    pub fn search_threads(&self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        cores.saturating_sub(self.reserved_cores).max(1)
    }
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routing() {
        let config = PricingConfig::default();
        assert_eq!(config.numerical_features.len(), 5);
        assert_eq!(config.categorical_features.len(), 3);
        assert_eq!(config.target, "price");
        assert_eq!(config.cv_folds, 3);
    }

    #[test]
    fn test_amenity_score_is_opt_in() {
        let config = PricingConfig::default();
        assert_eq!(config.numeric_branch_columns(), config.numerical_features);

        let config = config.with_amenity_score(true);
        let cols = config.numeric_branch_columns();
        assert_eq!(cols.len(), 6);
        assert_eq!(cols.last().map(String::as_str), Some(AMENITY_SCORE_COLUMN));
    }

    #[test]
    fn test_required_input_columns() {
        let config = PricingConfig::default();
        let cols = config.required_input_columns();
        assert_eq!(cols.len(), 9);
        assert!(cols.contains(&"amenities".to_string()));
        assert!(!cols.contains(&"price".to_string()));
    }

    #[test]
    fn test_search_threads_at_least_one() {
        let mut config = PricingConfig::default();
        config.reserved_cores = 10_000;
        assert_eq!(config.search_threads(), 1);
    }
}
