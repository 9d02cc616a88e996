//! Integration test: training run end-to-end

use pricing_engine::config::PricingConfig;
use pricing_engine::data::DataLoader;
use pricing_engine::error::PricingError;
use pricing_engine::inference::ModelArtifact;
use pricing_engine::training::{ModelCandidate, ModelFamily, TrainEngine};
use polars::prelude::*;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const HOODS: [&str; 4] = ["Mission", "SoMa", "Marina", "Castro"];
const ROOMS: [&str; 3] = ["Entire home/apt", "Private room", "Shared room"];
const AMENITIES: [&str; 3] = ["{TV,Wifi}", "{TV,Wifi,Pool,Kitchen}", "{Wifi}"];

/// Raw listings as the scraper exports them, plus three unusable rows
fn write_listings(dir: &Path, n: usize) -> PathBuf {
    let mut csv = String::from(
        "id,price,accommodates,bathrooms,bedrooms,beds,minimum_nights,neighbourhood_cleansed,property_type,room_type,amenities\n",
    );
    for i in 0..n {
        let accommodates = 1 + i % 6;
        let bedrooms = 1 + i % 3;
        let room_bonus = [60.0, 0.0, -20.0][i % 3];
        let price = 40.0 + 25.0 * accommodates as f64 + 15.0 * bedrooms as f64 + room_bonus + (i % 4) as f64 * 10.0;
        let bathrooms = if i % 7 == 0 { String::new() } else { format!("{}", 1.0 + (i % 2) as f64 * 0.5) };
        writeln!(
            csv,
            "{i},\"${price:.2}\",{accommodates},{bathrooms},{bedrooms},{},{},{},{},{},\"{}\"",
            1 + i % 4,
            1 + i % 5,
            HOODS[i % 4],
            if i % 2 == 0 { "Apartment" } else { "House" },
            ROOMS[i % 3],
            AMENITIES[i % 3],
        )
        .unwrap();
    }
    csv.push_str("900,,2,1,1,1,2,Mission,House,Private room,\"{TV}\"\n");
    csv.push_str("901,\"$abc\",2,1,1,1,2,Mission,House,Private room,\"{TV}\"\n");
    csv.push_str("902,\"$1,200.00\",2,1,1,two,2,Mission,House,Private room,\"{TV}\"\n");

    let path = dir.join("listings.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

fn linear_candidates() -> Vec<ModelCandidate> {
    vec![
        ModelCandidate::new("Standard_Ridge", ModelFamily::Ridge)
            .with_param("alpha", [0.1, 1.0])
            .with_param("solver", ["auto"]),
        ModelCandidate::new("Lasso", ModelFamily::Lasso)
            .with_param("alpha", [0.01])
            .with_param("max_iter", [10_000i64]),
    ]
}

#[test]
fn test_run_writes_artifact_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_listings(dir.path(), 60);
    let model_path = dir.path().join("models/nested/pricing.bin");

    let config = PricingConfig::default()
        .with_data_path(&data)
        .with_model_path(&model_path);
    let report = TrainEngine::new(config)
        .with_candidates(linear_candidates())
        .run()
        .unwrap();

    assert_eq!(report.cleaning.rows_read, 63);
    assert_eq!(report.cleaning.dropped_price, 2);
    assert_eq!(report.cleaning.dropped_format, 1);
    assert_eq!(report.n_train + report.n_test, 60);
    assert_eq!(report.n_test, 12);
    assert_eq!(report.candidates.len(), 2);
    assert!(report.cv_mae.is_finite());
    assert!(report.test_mae.is_finite());
    assert_eq!(report.model_path.as_deref(), Some(model_path.as_path()));
    assert!(report.render().contains(&report.champion));

    let artifact = ModelArtifact::load(&model_path).unwrap();
    assert_eq!(artifact.model_name, report.champion);
    assert_eq!(artifact.cv_mae, report.cv_mae);
}

#[test]
fn test_report_serializes_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_listings(dir.path(), 40);
    let raw = DataLoader::new().load_csv(&data).unwrap();

    let (_, report) = TrainEngine::new(PricingConfig::default())
        .with_candidates(linear_candidates())
        .fit(&raw)
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["champion"], serde_json::json!(report.champion));
    assert!(json["candidates"].as_array().unwrap().len() == 2);
}

#[test]
fn test_full_zoo_champion_has_lowest_cv_mae() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_listings(dir.path(), 60);
    let raw = DataLoader::new().load_csv(&data).unwrap();

    let (artifact, report) = TrainEngine::new(PricingConfig::default()).fit(&raw).unwrap();

    let names: Vec<&str> = report.candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Polynomial_Ridge", "Standard_Ridge", "Lasso", "SVR", "XGBoost", "Random_Forest"]
    );

    let best = report
        .candidates
        .iter()
        .filter_map(|c| c.cv_mae)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(report.cv_mae, best);

    let first_best = report
        .candidates
        .iter()
        .find(|c| c.cv_mae == Some(best))
        .unwrap();
    assert_eq!(first_best.name, report.champion);
    assert_eq!(artifact.model_name, report.champion);
}

#[test]
fn test_missing_target_fails() {
    let raw = df!("accommodates" => &["2", "3"], "beds" => &["1", "1"]).unwrap();
    let err = TrainEngine::new(PricingConfig::default())
        .with_candidates(linear_candidates())
        .fit(&raw)
        .unwrap_err();
    assert!(matches!(err, PricingError::MissingColumn(ref c) if c == "price"));
}

#[test]
fn test_all_candidates_failing_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_listings(dir.path(), 30);
    let raw = DataLoader::new().load_csv(&data).unwrap();

    let broken = vec![ModelCandidate::new("Broken", ModelFamily::Svr).with_param("kernel", ["poly"])];
    let err = TrainEngine::new(PricingConfig::default())
        .with_candidates(broken)
        .fit(&raw)
        .unwrap_err();
    assert!(matches!(err, PricingError::CandidateFit { .. }));
}
