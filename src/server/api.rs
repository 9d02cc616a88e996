//! API route definitions

use super::{handlers, state::AppState};
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": true,
            "message": "Not found. POST /predict to price a listing or GET /health for status.",
        })),
    )
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict))
        .route("/predict/batch", post(handlers::predict_batch))
        .route("/model", get(handlers::model_info))
        .route("/health", get(handlers::health_check))
        .fallback(handle_404)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
