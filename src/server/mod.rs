//! Prediction HTTP service
//!
//! Serves the champion artifact over a small JSON API:
//! - `POST /predict` prices one listing
//! - `POST /predict/batch` prices an array of listings
//! - `GET /model` describes the loaded artifact
//! - `GET /health` reports liveness and whether a model is loaded

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use crate::config::PricingConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            model_path: PricingConfig::default().model_save_path,
        }
    }
}

impl ServerConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }
}

/// Load the artifact and serve until ctrl+c.
///
/// A missing or corrupt artifact does not stop the server; prediction routes
/// answer 503 until a model is available.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    let state = Arc::new(AppState::new(config.clone()));

    match state.serving.load(&config.model_path) {
        Ok(predictor) => info!(
            model = %predictor.model_name(),
            path = %config.model_path.display(),
            "Model loaded"
        ),
        Err(err) => warn!(
            path = %config.model_path.display(),
            error = %err,
            "Starting without a model; predictions will return 503"
        ),
    }

    let app = create_router(Arc::clone(&state));
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        pid = std::process::id(),
        started_at = %start_time.to_rfc3339(),
        "Pricing server listening"
    );

    let shutdown_signal = async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for ctrl+c");
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    state.serving.clear();
    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = ServerConfig::default()
            .with_host("127.0.0.1")
            .with_port(9000)
            .with_model_path("m.bin");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.model_path, PathBuf::from("m.bin"));
    }
}
