//! Serving-side model access
//!
//! A [`ModelArtifact`] is written once by training and read back at startup.
//! [`PricingPredictor`] turns loosely typed request records into a frame the
//! fitted pipeline accepts, and [`ServingState`] holds the one predictor a
//! process serves from.

mod artifact;
mod predictor;
mod state;

pub use artifact::ModelArtifact;
pub use predictor::{apply_aliases, round_price, PricingPredictor, Record, FIELD_ALIASES};
pub use state::ServingState;
