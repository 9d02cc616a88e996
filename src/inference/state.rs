//! Process-wide holder for the loaded predictor

use super::PricingPredictor;
use crate::error::{PricingError, Result};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Absent until a load succeeds; the loaded predictor is shared read-only
#[derive(Debug, Default)]
pub struct ServingState {
    predictor: RwLock<Option<Arc<PricingPredictor>>>,
}

impl ServingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an artifact from disk. On failure the current state is kept.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<PricingPredictor>> {
        let path = path.as_ref();
        match PricingPredictor::load(path) {
            Ok(predictor) => Ok(self.set(predictor)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Model load failed");
                Err(err)
            }
        }
    }

    /// Install a predictor, replacing any previous one
    pub fn set(&self, predictor: PricingPredictor) -> Arc<PricingPredictor> {
        let predictor = Arc::new(predictor);
        *self.predictor.write() = Some(Arc::clone(&predictor));
        info!(model = %predictor.model_name(), "Predictor installed");
        predictor
    }

    pub fn clear(&self) {
        if self.predictor.write().take().is_some() {
            info!("Predictor cleared");
        }
    }

    /// The loaded predictor, or `Unavailable`
    pub fn predictor(&self) -> Result<Arc<PricingPredictor>> {
        self.predictor.read().clone().ok_or(PricingError::Unavailable)
    }

    pub fn is_loaded(&self) -> bool {
        self.predictor.read().is_some()
    }
}
