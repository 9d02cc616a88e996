//! Integration test: predictor and HTTP serving

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use ndarray::Array1;
use polars::prelude::*;
use pricing_engine::config::PricingConfig;
use pricing_engine::error::PricingError;
use pricing_engine::inference::{ModelArtifact, PricingPredictor, Record};
use pricing_engine::pipeline::PipelineFactory;
use pricing_engine::server::{create_router, AppState, ServerConfig};
use pricing_engine::training::{Estimator, ParamSet, ParamValue, RidgeRegression};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

fn artifact() -> ModelArtifact {
    let df = df!(
        "accommodates" => &[2.0, 4.0, 2.0, 6.0, 3.0, 5.0, 1.0, 4.0],
        "bathrooms" => &[1.0, 2.0, 1.0, 2.5, 1.0, 2.0, 1.0, 1.5],
        "bedrooms" => &[1.0, 2.0, 1.0, 3.0, 1.0, 2.0, 1.0, 2.0],
        "beds" => &[1.0, 2.0, 1.0, 3.0, 2.0, 3.0, 1.0, 2.0],
        "minimum_nights" => &[1.0, 3.0, 30.0, 2.0, 1.0, 7.0, 365.0, 2.0],
        "neighbourhood_cleansed" => &["Mission", "SoMa", "Mission", "Marina", "SoMa", "Marina", "Castro", "Mission"],
        "property_type" => &["Apartment", "House", "Apartment", "House", "Condo", "House", "Apartment", "Condo"],
        "room_type" => &["Private room", "Entire home/apt", "Private room", "Entire home/apt", "Private room", "Entire home/apt", "Shared room", "Entire home/apt"],
        "amenities" => &["{TV,Wifi}", "{TV,Wifi,Pool,Kitchen}", "{Wifi}", "{TV,Wifi,Pool}", "{Wifi}", "{TV,Wifi,Kitchen}", "", "{TV,Wifi}"]
    )
    .unwrap();
    let y = Array1::from(vec![80.0, 200.0, 70.0, 320.0, 95.0, 260.0, 35.0, 180.0]);

    let mut pipeline = PipelineFactory::new(PricingConfig::default())
        .create_pipeline(Estimator::Ridge(RidgeRegression::new(1.0)), false);
    pipeline.fit(&df, &y).unwrap();

    let mut params = ParamSet::new();
    params.insert("alpha".to_string(), ParamValue::Float(1.0));
    ModelArtifact::new(pipeline, "Standard_Ridge", params, 12.5)
}

fn saved_artifact(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("models/pricing_model_v1.bin");
    artifact().save(&path).unwrap();
    path
}

fn example_record() -> Record {
    match json!({
        "accommodates": 2,
        "bathrooms": 1.0,
        "bedrooms": 1,
        "beds": 1,
        "minimum_nights": 3,
        "neighbourhood_cleansed": "Mission",
        "property_type": "Apartment",
        "room_type": "Private room",
        "amenities": "{TV,Wifi,Kitchen}"
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn has_at_most_two_decimals(p: f64) -> bool {
    ((p * 100.0).round() / 100.0 - p).abs() < 1e-9
}

#[test]
fn test_artifact_round_trip_preserves_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let original = artifact();
    let path = dir.path().join("a.bin");
    original.save(&path).unwrap();

    let loaded = PricingPredictor::load(&path).unwrap();
    let fresh = PricingPredictor::new(original);
    assert_eq!(
        loaded.predict(&example_record()).unwrap(),
        fresh.predict(&example_record()).unwrap()
    );
    assert_eq!(loaded.model_name(), "Standard_Ridge");
}

#[test]
fn test_example_record_prices_to_cents() {
    let predictor = PricingPredictor::new(artifact());
    let price = predictor.predict(&example_record()).unwrap();
    assert!(price.is_finite());
    assert!(has_at_most_two_decimals(price));
}

#[test]
fn test_extra_fields_are_ignored() {
    let predictor = PricingPredictor::new(artifact());
    let mut record = example_record();
    record.insert("host_name".to_string(), json!("Alex"));
    record.insert("review_scores".to_string(), json!([4.5, 5.0]));
    assert_eq!(
        predictor.predict(&record).unwrap(),
        predictor.predict(&example_record()).unwrap()
    );
}

#[test]
fn test_missing_amenities_is_not_an_error() {
    let predictor = PricingPredictor::new(artifact());
    let mut record = example_record();
    record.remove("amenities");
    assert!(predictor.predict(&record).unwrap().is_finite());
}

#[test]
fn test_aliases_match_canonical_fields() {
    let predictor = PricingPredictor::new(artifact());
    let mut aliased = example_record();
    let nights = aliased.remove("minimum_nights").unwrap();
    let hood = aliased.remove("neighbourhood_cleansed").unwrap();
    aliased.insert("min_nights".to_string(), nights);
    aliased.insert("neighborhood".to_string(), hood);

    assert_eq!(
        predictor.predict(&aliased).unwrap(),
        predictor.predict(&example_record()).unwrap()
    );
}

#[test]
fn test_numeric_strings_are_accepted() {
    let predictor = PricingPredictor::new(artifact());
    let mut record = example_record();
    record.insert("accommodates".to_string(), json!("2"));
    assert_eq!(
        predictor.predict(&record).unwrap(),
        predictor.predict(&example_record()).unwrap()
    );
}

#[test]
fn test_non_numeric_field_is_data_format() {
    let predictor = PricingPredictor::new(artifact());
    let mut record = example_record();
    record.insert("bedrooms".to_string(), json!("several"));
    assert!(matches!(predictor.predict(&record), Err(PricingError::DataFormat(_))));
}

#[test]
fn test_missing_artifact_is_not_found() {
    let err = PricingPredictor::load("/definitely/not/here.bin").unwrap_err();
    assert!(matches!(err, PricingError::ArtifactNotFound { .. }));
}

// ─── HTTP ──────────────────────────────────────────────────────────────────────

fn app(model_path: Option<&Path>) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(ServerConfig::default()));
    if let Some(path) = model_path {
        state.serving.load(path).unwrap();
    }
    (create_router(Arc::clone(&state)), state)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_predict_without_model_is_503() {
    let (app, _) = app(None);
    let response = app
        .oneshot(post_json("/predict", &Value::Object(example_record())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await,
        json!({"error": true, "message": "Model not loaded"})
    );
}

#[tokio::test]
async fn test_predict_returns_price_in_usd() {
    let dir = tempfile::tempdir().unwrap();
    let path = saved_artifact(dir.path());
    let (app, _) = app(Some(&path));

    let response = app
        .oneshot(post_json("/predict", &Value::Object(example_record())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["currency"], json!("USD"));
    let price = body["predicted_price"].as_f64().unwrap();
    assert!(has_at_most_two_decimals(price));
}

#[tokio::test]
async fn test_bad_field_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let path = saved_artifact(dir.path());
    let (app, _) = app(Some(&path));

    let mut record = example_record();
    record.insert("beds".to_string(), json!(true));
    let response = app.oneshot(post_json("/predict", &Value::Object(record))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], json!(true));
}

#[tokio::test]
async fn test_malformed_body_gets_error_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = saved_artifact(dir.path());

    let broken = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from("{\"accommodates\": 4,"))
        .unwrap();
    let untyped = Request::builder()
        .method("POST")
        .uri("/predict/batch")
        .body(Body::from("[]"))
        .unwrap();

    for request in [broken, untyped] {
        let (app, _) = app(Some(&path));
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], json!(true));
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}

#[tokio::test]
async fn test_batch_predict() {
    let dir = tempfile::tempdir().unwrap();
    let path = saved_artifact(dir.path());
    let (app, _) = app(Some(&path));

    let records = json!([example_record(), example_record()]);
    let response = app.oneshot(post_json("/predict/batch", &records)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0], predictions[1]);
}

#[tokio::test]
async fn test_health_reports_model_state() {
    let (app, state) = app(None);
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["model_loaded"], json!(false));

    let dir = tempfile::tempdir().unwrap();
    state.serving.load(saved_artifact(dir.path())).unwrap();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(response).await["model_loaded"], json!(true));
}

#[tokio::test]
async fn test_model_info() {
    let dir = tempfile::tempdir().unwrap();
    let path = saved_artifact(dir.path());
    let (app, _) = app(Some(&path));

    let response = app
        .oneshot(Request::builder().uri("/model").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["model_name"], json!("Standard_Ridge"));
    assert_eq!(body["best_params"]["alpha"], json!(1.0));
}
