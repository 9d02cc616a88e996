//! Error types for the pricing engine

use thiserror::Error;

/// Result type alias for pricing operations
pub type Result<T> = std::result::Result<T, PricingError>;

/// Main error type for the pricing engine
#[derive(Error, Debug)]
pub enum PricingError {
    /// Malformed or uncoercible raw input (bad currency string, non-numeric cell)
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// A configured column is absent and no fallback applies
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Persisted artifact missing or unreadable
    #[error("Artifact not found at {path}: {reason}")]
    ArtifactNotFound { path: String, reason: String },

    /// A model-zoo candidate failed across its whole grid
    #[error("Candidate {name} failed: {reason}")]
    CandidateFit { name: String, reason: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Inference error: {0}")]
    Inference(String),

    /// No artifact is loaded in the serving state
    #[error("Model not loaded")]
    Unavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl From<serde_json::Error> for PricingError {
    fn from(err: serde_json::Error) -> Self {
        PricingError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for PricingError {
    fn from(err: bincode::Error) -> Self {
        PricingError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PricingError {
    fn from(err: ndarray::ShapeError) -> Self {
        PricingError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PricingError::DataFormat("price '$abc'".to_string());
        assert_eq!(err.to_string(), "Data format error: price '$abc'");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PricingError = io_err.into();
        assert!(matches!(err, PricingError::Io(_)));
    }

    #[test]
    fn test_artifact_error_names_path() {
        let err = PricingError::ArtifactNotFound {
            path: "models/x.bin".to_string(),
            reason: "no such file".to_string(),
        };
        assert!(err.to_string().contains("models/x.bin"));
    }
}
