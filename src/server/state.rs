//! Application state shared across handlers

use super::ServerConfig;
use crate::inference::ServingState;
use chrono::{DateTime, Utc};

pub struct AppState {
    pub config: ServerConfig,
    pub serving: ServingState,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            serving: ServingState::new(),
            started_at: Utc::now(),
        }
    }
}
