//! Pricing pipeline assembly
//!
//! A [`PricingPipeline`] owns every fitted stage between a raw listing frame
//! and a price estimate. [`PipelineFactory`] builds unfitted pipelines with
//! the routing declared in [`crate::config::PricingConfig`].

mod branches;
mod pricing;

pub use branches::{CategoricalBranch, NumericBranch, NumericStep};
pub use pricing::{PipelineFactory, PricingPipeline};
