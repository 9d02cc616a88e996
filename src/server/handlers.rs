//! Request handlers

use super::error::{Result, ServerError};
use super::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predicted_price: f64,
    pub currency: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BatchPredictResponse {
    pub predictions: Vec<f64>,
    pub currency: &'static str,
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let Json(body) = body?;
    let predictor = state.serving.predictor()?;
    let start = Instant::now();
    let price = predictor.predict_value(&body)?;
    debug!(price, latency_us = start.elapsed().as_micros() as u64, "Prediction served");

    Ok(Json(PredictResponse {
        predicted_price: price,
        currency: "USD",
    }))
}

pub async fn predict_batch(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchPredictResponse>> {
    let Json(body) = body?;
    let predictor = state.serving.predictor()?;
    let Value::Array(items) = body else {
        return Err(ServerError::BadRequest("expected a JSON array of records".to_string()));
    };
    let records = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(ServerError::BadRequest(format!("record {i} is not a JSON object"))),
        })
        .collect::<Result<Vec<_>>>()?;

    let start = Instant::now();
    let predictions = predictor.predict_batch(&records)?;
    info!(
        records = predictions.len(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Batch prediction served"
    );

    Ok(Json(BatchPredictResponse {
        predictions,
        currency: "USD",
    }))
}

pub async fn model_info(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let predictor = state.serving.predictor()?;
    let artifact = predictor.artifact();
    let params: serde_json::Map<String, Value> = artifact
        .best_params
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();

    Ok(Json(json!({
        "model_name": artifact.model_name,
        "best_params": params,
        "cv_mae": artifact.cv_mae,
        "test_mae": artifact.test_mae,
        "trained_at": artifact.trained_at.to_rfc3339(),
        "expected_fields": predictor.expected_fields(),
    })))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    Json(json!({
        "status": "ok",
        "model_loaded": state.serving.is_loaded(),
        "uptime_secs": uptime.num_seconds(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
