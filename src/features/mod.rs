//! Feature transforms
//!
//! Every stage of the pricing pipeline speaks one of two contracts: a
//! table-level [`FrameTransform`] over a polars `DataFrame` with named
//! columns, or an [`ArrayTransform`] over a dense `Array2<f64>` where missing
//! values are `NaN`.

mod amenity;
mod log_transform;

pub use amenity::AmenityScoreTransformer;
pub use log_transform::LogTransformer;

use crate::error::Result;
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;

/// Transform over a labelled table
pub trait FrameTransform {
    /// Learn whatever statistics the transform needs
    fn fit(&mut self, df: &DataFrame) -> Result<&mut Self>;

    /// Apply the fitted transform; never mutates `self`
    fn transform(&self, df: &DataFrame) -> Result<DataFrame>;

    fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }
}

/// Transform over an unlabelled numeric matrix
pub trait ArrayTransform {
    /// Learn statistics; `y` is only read by supervised steps
    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<&mut Self>;

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    fn fit_transform(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<Array2<f64>> {
        self.fit(x, y)?;
        self.transform(x)
    }
}
