//! Error types for the server

use crate::error::PricingError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Model not loaded")]
    Unavailable,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PricingError> for ServerError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::DataFormat(_) | PricingError::MissingColumn(_) => {
                ServerError::BadRequest(err.to_string())
            }
            PricingError::Unavailable => ServerError::Unavailable,
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed".to_string())
            }
        };

        (status, Json(json!({ "error": true, "message": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
