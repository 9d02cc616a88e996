//! Persisted champion artifact

use crate::error::{PricingError, Result};
use crate::pipeline::PricingPipeline;
use crate::training::ParamSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// The fitted champion pipeline plus how it was chosen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub pipeline: PricingPipeline,
    pub model_name: String,
    pub best_params: ParamSet,
    pub cv_mae: f64,
    pub test_mae: Option<f64>,
    pub trained_at: DateTime<Utc>,
    pub crate_version: String,
}

impl ModelArtifact {
    pub fn new(pipeline: PricingPipeline, model_name: impl Into<String>, best_params: ParamSet, cv_mae: f64) -> Self {
        Self {
            pipeline,
            model_name: model_name.into(),
            best_params,
            cv_mae,
            test_mae: None,
            trained_at: Utc::now(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_test_mae(mut self, test_mae: f64) -> Self {
        self.test_mae = Some(test_mae);
        self
    }

    /// Write the artifact as a single bincode file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let bytes = bincode::serialize(self)?;
        fs::write(path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), model = %self.model_name, "Artifact saved");
        Ok(())
    }

    /// Read an artifact; a missing, unreadable or unfitted file is `ArtifactNotFound`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let not_found = |reason: String| PricingError::ArtifactNotFound {
            path: path.display().to_string(),
            reason,
        };

        let bytes = fs::read(path).map_err(|e| not_found(e.to_string()))?;
        let artifact: Self =
            bincode::deserialize(&bytes).map_err(|e| not_found(format!("corrupt artifact: {e}")))?;
        if !artifact.pipeline.is_fitted() {
            return Err(not_found("pipeline is not fitted".to_string()));
        }

        info!(
            path = %path.display(),
            model = %artifact.model_name,
            cv_mae = artifact.cv_mae,
            trained_at = %artifact.trained_at,
            "Artifact loaded"
        );
        Ok(artifact)
    }
}
