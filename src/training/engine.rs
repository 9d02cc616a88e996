//! Training run orchestration

use super::models::RegressionMetrics;
use super::search::{CandidateSummary, ModelSearch};
use super::zoo::ModelCandidate;
use super::Regressor;
use crate::config::PricingConfig;
use crate::data::{clean_listings, train_test_split, CleaningSummary, DataLoader};
use crate::error::Result;
use crate::inference::ModelArtifact;
use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Outcome of one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub champion: String,
    pub best_params: BTreeMap<String, serde_json::Value>,
    pub cv_mae: f64,
    pub test_mae: f64,
    pub test_rmse: f64,
    pub test_r2: f64,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    pub cleaning: CleaningSummary,
    pub candidates: Vec<CandidateSummary>,
    pub model_path: Option<PathBuf>,
    pub trained_at: DateTime<Utc>,
    pub training_time_secs: f64,
}

impl TrainingReport {
    /// Plain-text summary for terminals and logs
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Pricing Model Training Report ===\n");
        let _ = writeln!(out, "Champion:   {}", self.champion);
        let _ = writeln!(out, "CV MAE:     {:.4}", self.cv_mae);
        let _ = writeln!(out, "Test MAE:   {:.4}", self.test_mae);
        let _ = writeln!(out, "Test RMSE:  {:.4}", self.test_rmse);
        let _ = writeln!(out, "Test R2:    {:.4}", self.test_r2);
        let _ = writeln!(out, "Rows:       {} train / {} test", self.n_train, self.n_test);
        let _ = writeln!(out, "Features:   {}", self.n_features);
        let _ = writeln!(
            out,
            "Cleaning:   {} read, {} kept ({} bad price, {} bad numeric)",
            self.cleaning.rows_read, self.cleaning.rows_kept, self.cleaning.dropped_price, self.cleaning.dropped_format
        );

        let _ = writeln!(out, "\n--- Candidates ---");
        for c in &self.candidates {
            match (c.cv_mae, &c.error) {
                (Some(mae), _) => {
                    let _ = writeln!(out, "{:<18} MAE {:>10.4}  ({:.2}s)", c.name, mae, c.elapsed_secs);
                }
                (None, Some(err)) => {
                    let _ = writeln!(out, "{:<18} FAILED  {}", c.name, err);
                }
                (None, None) => {
                    let _ = writeln!(out, "{:<18} no score", c.name);
                }
            }
        }
        if let Some(path) = &self.model_path {
            let _ = writeln!(out, "\nArtifact:   {}", path.display());
        }
        out
    }
}

/// Runs load, clean, split, search, evaluate and persist
pub struct TrainEngine {
    config: PricingConfig,
    loader: DataLoader,
    candidates: Option<Vec<ModelCandidate>>,
}

impl TrainEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self {
            config,
            loader: DataLoader::new(),
            candidates: None,
        }
    }

    /// Replace the default model zoo
    pub fn with_candidates(mut self, candidates: Vec<ModelCandidate>) -> Self {
        self.candidates = Some(candidates);
        self
    }

    pub fn with_loader(mut self, loader: DataLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Train from the configured CSV and write the artifact to the configured path
    pub fn run(&self) -> Result<TrainingReport> {
        let raw = self.loader.load_csv(&self.config.raw_data_path)?;
        let (artifact, mut report) = self.fit(&raw)?;
        artifact.save(&self.config.model_save_path)?;
        report.model_path = Some(self.config.model_save_path.clone());
        Ok(report)
    }

    /// Train on a raw frame without persisting anything
    pub fn fit(&self, raw: &DataFrame) -> Result<(ModelArtifact, TrainingReport)> {
        let start = Instant::now();

        let (clean, cleaning) = clean_listings(raw, &self.config)?;
        let split = train_test_split(&clean, &self.config.target, self.config.test_size, self.config.random_state)?;
        info!(
            train_rows = split.x_train.height(),
            test_rows = split.x_test.height(),
            "Data split"
        );

        let mut search = ModelSearch::new(&self.config);
        if let Some(candidates) = &self.candidates {
            search = search.with_candidates(candidates.clone());
        }
        let outcome = search.run(&split.x_train, &split.y_train)?;
        let champion = outcome.champion;

        let predictions = champion.pipeline.predict(&split.x_test)?;
        let metrics = RegressionMetrics::compute(&split.y_test, &predictions);
        info!(
            champion = %champion.name,
            test_mae = metrics.mae,
            test_r2 = metrics.r2,
            "Champion evaluated on hold-out split"
        );
        if let Some(importances) = champion.pipeline.estimator().feature_importances() {
            let names = champion.pipeline.feature_names();
            let mut ranked: Vec<(&String, f64)> = names.iter().zip(importances.iter().copied()).collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            for (name, importance) in ranked.into_iter().take(5) {
                info!(feature = %name, importance, "Top feature");
            }
        }

        let report = TrainingReport {
            champion: champion.name.clone(),
            best_params: champion
                .best_params
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
            cv_mae: champion.cv_mae,
            test_mae: metrics.mae,
            test_rmse: metrics.rmse,
            test_r2: metrics.r2,
            n_train: split.x_train.height(),
            n_test: split.x_test.height(),
            n_features: champion.pipeline.feature_names().len(),
            cleaning,
            candidates: outcome.summaries,
            model_path: None,
            trained_at: Utc::now(),
            training_time_secs: start.elapsed().as_secs_f64(),
        };

        let artifact = ModelArtifact::new(champion.pipeline, champion.name, champion.best_params, champion.cv_mae)
            .with_test_mae(metrics.mae);
        Ok((artifact, report))
    }
}
