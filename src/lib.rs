//! Pricing Engine - rental listing price regression
//!
//! This crate provides the full path from a raw listings export to a served
//! nightly price estimate:
//! - Cleaning and typing of raw CSV listings
//! - Feature transforms and a two-branch preprocessing pipeline
//! - A model zoo searched with k-fold cross-validation by MAE
//! - A persisted champion artifact and a single-record predictor
//! - HTTP server and CLI interfaces
//!
//! # Modules
//!
//! ## Data
//! - [`config`] - Column routing, paths and search settings
//! - [`data`] - CSV loading, cleaning, train/test split
//!
//! ## Modelling
//! - [`features`] - Log-scale and amenity score transforms
//! - [`preprocessing`] - Imputation, scaling, one-hot, polynomial, selection
//! - [`pipeline`] - Pipeline assembly from configuration
//! - [`training`] - Estimators, model zoo, grid search, training run
//!
//! ## Services
//! - [`inference`] - Artifact persistence, predictor, serving state
//! - [`server`] - HTTP prediction API
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Data
pub mod data;

// Modelling
pub mod features;
pub mod preprocessing;
pub mod pipeline;
pub mod training;

// Services
pub mod inference;
pub mod server;
pub mod cli;

pub use error::{PricingError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PricingError, Result};

    // Configuration and data
    pub use crate::config::PricingConfig;
    pub use crate::data::{clean_listings, train_test_split, DataLoader};

    // Transforms
    pub use crate::features::{AmenityScoreTransformer, ArrayTransform, FrameTransform, LogTransformer};

    // Pipeline
    pub use crate::pipeline::{PipelineFactory, PricingPipeline};

    // Training
    pub use crate::training::{model_zoo, Estimator, ModelCandidate, ModelSearch, Regressor, TrainEngine, TrainingReport};

    // Inference
    pub use crate::inference::{ModelArtifact, PricingPredictor, Record, ServingState};
}
