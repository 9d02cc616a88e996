//! End-to-end pricing pipeline

use super::branches::{CategoricalBranch, NumericBranch, NumericStep};
use crate::config::PricingConfig;
use crate::error::{PricingError, Result};
use crate::features::{ArrayTransform, AmenityScoreTransformer, FrameTransform, LogTransformer};
use crate::preprocessing::{
    CategoricalImputer, HandleUnknown, Imputer, OneHotEncoder, PolynomialFeatures, SelectK, SelectKBest,
    StandardScaler,
};
use crate::training::{Estimator, Regressor};
use ndarray::{concatenate, Array1, Array2, Axis};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Raw listing frame in, price estimate out.
///
/// Stages run in a fixed order: amenity scoring on the raw frame, the numeric
/// and categorical branches (numeric columns first in the combined matrix),
/// univariate feature selection, then the estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingPipeline {
    amenity: Option<AmenityScoreTransformer>,
    numeric: NumericBranch,
    categorical: CategoricalBranch,
    selector: SelectKBest,
    estimator: Estimator,
    use_poly: bool,
    feature_names: Vec<String>,
    is_fitted: bool,
}

impl PricingPipeline {
    pub fn new(
        amenity: Option<AmenityScoreTransformer>,
        numeric: NumericBranch,
        categorical: CategoricalBranch,
        selector: SelectKBest,
        estimator: Estimator,
        use_poly: bool,
    ) -> Self {
        Self {
            amenity,
            numeric,
            categorical,
            selector,
            estimator,
            use_poly,
            feature_names: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit every stage on a cleaned frame and its target
    pub fn fit(&mut self, df: &DataFrame, y: &Array1<f64>) -> Result<&mut Self> {
        if df.height() != y.len() {
            return Err(PricingError::ShapeError {
                expected: format!("{} target values", df.height()),
                actual: format!("{} target values", y.len()),
            });
        }
        let start = Instant::now();

        let scored = self.score_amenities(df)?;
        let numeric = self.numeric.fit_transform(&scored)?;
        let categorical = self.categorical.fit_transform(&scored)?;
        let combined = concatenate(Axis(1), &[numeric.view(), categorical.view()])?;

        let selected = self.selector.fit_transform(&combined, Some(y))?;
        self.estimator.fit(&selected, y)?;

        let mut names = self.numeric.output_names();
        names.extend(self.categorical.output_names());
        self.feature_names = match self.selector.selected_indices() {
            Some(indices) => indices.iter().filter_map(|&i| names.get(i).cloned()).collect(),
            None => names,
        };
        self.is_fitted = true;

        debug!(
            estimator = self.estimator.kind(),
            rows = df.height(),
            features = self.feature_names.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pipeline fitted"
        );
        Ok(self)
    }

    /// Model-ready feature matrix for a raw frame
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PricingError::ModelNotFitted);
        }
        let scored = self.score_amenities(df)?;
        let numeric = self.numeric.transform(&scored)?;
        let categorical = self.categorical.transform(&scored)?;
        let combined = concatenate(Axis(1), &[numeric.view(), categorical.view()])?;
        self.selector.transform(&combined)
    }

    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let x = self.transform(df)?;
        self.estimator.predict(&x)
    }

    fn score_amenities(&self, df: &DataFrame) -> Result<DataFrame> {
        match &self.amenity {
            Some(t) => t.transform(df),
            None => Ok(df.clone()),
        }
    }

    /// Names of the columns the estimator sees
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn numeric(&self) -> &NumericBranch {
        &self.numeric
    }

    pub fn categorical(&self) -> &CategoricalBranch {
        &self.categorical
    }

    pub fn use_poly(&self) -> bool {
        self.use_poly
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Every raw column the pipeline reads
    pub fn input_columns(&self) -> Vec<String> {
        let mut cols: Vec<String> = self
            .numeric
            .columns()
            .iter()
            .filter(|c| self.amenity.as_ref().map_or(true, |a| a.output() != c.as_str()))
            .cloned()
            .collect();
        cols.extend(self.categorical.columns().iter().cloned());
        if let Some(amenity) = &self.amenity {
            cols.push(amenity.column().to_string());
        }
        cols
    }
}

/// Builds unfitted pipelines with the configured routing
#[derive(Debug, Clone)]
pub struct PipelineFactory {
    config: PricingConfig,
    select_k: SelectK,
}

impl PipelineFactory {
    pub fn new(config: PricingConfig) -> Self {
        Self {
            config,
            select_k: SelectK::All,
        }
    }

    pub fn with_select_k(mut self, select_k: SelectK) -> Self {
        self.select_k = select_k;
        self
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn create_pipeline(&self, estimator: Estimator, use_poly: bool) -> PricingPipeline {
        let numeric_columns = self.config.numeric_branch_columns();

        let mut log = LogTransformer::for_columns(&self.config.log_features);
        log.bind(&numeric_columns);

        let mut steps = vec![
            NumericStep::Impute(Imputer::median()),
            NumericStep::Log(log),
            NumericStep::Scale(StandardScaler::new()),
        ];
        if use_poly {
            steps.push(NumericStep::Poly(PolynomialFeatures::new()));
        }

        // The score is always derived; routing decides whether it reaches the model
        let amenity = AmenityScoreTransformer::new(self.config.amenities_column.clone());

        PricingPipeline::new(
            Some(amenity),
            NumericBranch::new(numeric_columns, steps),
            CategoricalBranch::new(
                self.config.categorical_features.clone(),
                CategoricalImputer::default(),
                OneHotEncoder::new(HandleUnknown::Ignore),
            ),
            SelectKBest::new(self.select_k),
            estimator,
            use_poly,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::RidgeRegression;
    use polars::prelude::*;

    fn listings() -> (DataFrame, Array1<f64>) {
        let df = df!(
            "accommodates" => &[2.0, 4.0, 2.0, 6.0, 3.0, 5.0],
            "bathrooms" => &[Some(1.0), Some(2.0), None, Some(2.5), Some(1.0), Some(2.0)],
            "bedrooms" => &[1.0, 2.0, 1.0, 3.0, 1.0, 2.0],
            "beds" => &[1.0, 2.0, 1.0, 3.0, 2.0, 3.0],
            "minimum_nights" => &[1.0, 3.0, 30.0, 2.0, 1.0, 7.0],
            "neighbourhood_cleansed" => &["Mission", "SoMa", "Mission", "Marina", "SoMa", "Marina"],
            "property_type" => &["Apartment", "House", "Apartment", "House", "Condo", "House"],
            "room_type" => &[Some("Private room"), Some("Entire home/apt"), None, Some("Entire home/apt"), Some("Private room"), Some("Entire home/apt")],
            "amenities" => &[Some("{TV,Wifi}"), Some("{TV,Wifi,Pool,Kitchen}"), None, Some("{TV,Wifi,Pool}"), Some("{Wifi}"), Some("{TV,Wifi,Kitchen}")]
        )
        .unwrap();
        let y = Array1::from(vec![80.0, 200.0, 70.0, 320.0, 95.0, 260.0]);
        (df, y)
    }

    fn factory() -> PipelineFactory {
        PipelineFactory::new(PricingConfig::default())
    }

    #[test]
    fn test_fit_predict_shapes() {
        let (df, y) = listings();
        let mut pipeline = factory().create_pipeline(Estimator::Ridge(RidgeRegression::new(1.0)), false);
        pipeline.fit(&df, &y).unwrap();

        // 5 numeric + 3 neighbourhoods + 3 property types + 3 room types
        assert_eq!(pipeline.feature_names().len(), 14);
        assert!(pipeline.feature_names()[5].starts_with("neighbourhood_cleansed_"));

        let preds = pipeline.predict(&df).unwrap();
        assert_eq!(preds.len(), 6);
        assert!(preds.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_poly_widens_numeric_block() {
        let (df, y) = listings();
        let mut pipeline = factory().create_pipeline(Estimator::Ridge(RidgeRegression::new(1.0)), true);
        pipeline.fit(&df, &y).unwrap();
        assert_eq!(pipeline.transform(&df).unwrap().ncols(), 5 + 15 + 9);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let (df, y) = listings();
        let mut pipeline = factory().create_pipeline(Estimator::Ridge(RidgeRegression::new(1.0)), false);
        pipeline.fit(&df, &y).unwrap();
        assert_eq!(pipeline.transform(&df).unwrap(), pipeline.transform(&df).unwrap());
    }

    #[test]
    fn test_target_length_mismatch() {
        let (df, _) = listings();
        let mut pipeline = factory().create_pipeline(Estimator::Ridge(RidgeRegression::new(1.0)), false);
        let err = pipeline.fit(&df, &Array1::zeros(2)).unwrap_err();
        assert!(matches!(err, PricingError::ShapeError { .. }));
    }

    #[test]
    fn test_predict_before_fit() {
        let (df, _) = listings();
        let pipeline = factory().create_pipeline(Estimator::Ridge(RidgeRegression::new(1.0)), false);
        assert!(matches!(pipeline.predict(&df), Err(PricingError::ModelNotFitted)));
    }

    #[test]
    fn test_input_columns() {
        let pipeline = factory().create_pipeline(Estimator::Ridge(RidgeRegression::new(1.0)), false);
        let cols = pipeline.input_columns();
        assert_eq!(cols.len(), 9);
        assert!(!cols.contains(&"amenity_score".to_string()));
        assert_eq!(cols.last().map(String::as_str), Some("amenities"));
    }
}
