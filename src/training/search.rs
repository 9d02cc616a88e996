//! Cross-validated grid search over the model zoo

use super::cross_validation::{CVSplit, KFold};
use super::models::mean_absolute_error;
use super::zoo::{format_params, model_zoo, ModelCandidate, ParamSet};
use crate::config::PricingConfig;
use crate::data::take_rows;
use crate::error::{PricingError, Result};
use crate::pipeline::{PipelineFactory, PricingPipeline};
use ndarray::Array1;
use polars::prelude::{DataFrame, IdxSize};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Cross-validated score of one grid point
#[derive(Debug, Clone)]
pub struct GridPointScore {
    pub params: ParamSet,
    pub fold_maes: Vec<f64>,
    /// Mean fold MAE; NaN when any fold failed
    pub mean_mae: f64,
}

/// A candidate's best grid point refit on the full training split
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub name: String,
    pub best_params: ParamSet,
    pub cv_mae: f64,
    pub pipeline: PricingPipeline,
    pub grid: Vec<GridPointScore>,
}

/// Reportable outcome of one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub name: String,
    pub best_params: BTreeMap<String, serde_json::Value>,
    pub cv_mae: Option<f64>,
    pub grid_points: usize,
    pub failed_points: usize,
    pub elapsed_secs: f64,
    pub error: Option<String>,
}

impl CandidateSummary {
    fn succeeded(result: &CandidateResult, elapsed_secs: f64) -> Self {
        Self {
            name: result.name.clone(),
            best_params: result
                .best_params
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
            cv_mae: Some(result.cv_mae),
            grid_points: result.grid.len(),
            failed_points: result.grid.iter().filter(|g| g.mean_mae.is_nan()).count(),
            elapsed_secs,
            error: None,
        }
    }

    fn failed(candidate: &ModelCandidate, err: &PricingError, elapsed_secs: f64) -> Self {
        let grid_points = candidate.grid_points().len();
        Self {
            name: candidate.name.clone(),
            best_params: BTreeMap::new(),
            cv_mae: None,
            grid_points,
            failed_points: grid_points,
            elapsed_secs,
            error: Some(err.to_string()),
        }
    }
}

/// Champion plus the per-candidate record of the search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub champion: CandidateResult,
    pub summaries: Vec<CandidateSummary>,
}

/// Index of the lowest score; strict `<` so the earliest wins ties.
/// NaN scores are never selected.
pub fn select_champion(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, best_score)) => score < best_score,
        };
        if better {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Rows of one fold, materialized once and shared by every grid point
struct FoldData {
    x_train: DataFrame,
    y_train: Array1<f64>,
    x_valid: DataFrame,
    y_valid: Array1<f64>,
}

impl FoldData {
    fn new(x: &DataFrame, y: &Array1<f64>, split: &CVSplit) -> Result<Self> {
        Ok(Self {
            x_train: take_rows(x, &to_idx(&split.train_indices))?,
            y_train: split.train_indices.iter().map(|&i| y[i]).collect(),
            x_valid: take_rows(x, &to_idx(&split.test_indices))?,
            y_valid: split.test_indices.iter().map(|&i| y[i]).collect(),
        })
    }
}

fn to_idx(indices: &[usize]) -> Vec<IdxSize> {
    indices.iter().map(|&i| i as IdxSize).collect()
}

/// K-fold grid search across a roster of candidates
pub struct ModelSearch {
    factory: PipelineFactory,
    candidates: Vec<ModelCandidate>,
    cv: KFold,
    n_threads: usize,
}

impl ModelSearch {
    pub fn new(config: &PricingConfig) -> Self {
        Self {
            factory: PipelineFactory::new(config.clone()),
            candidates: model_zoo(config.random_state),
            cv: KFold::new(config.cv_folds),
            n_threads: config.search_threads(),
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<ModelCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_factory(mut self, factory: PipelineFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = n_threads.max(1);
        self
    }

    pub fn candidates(&self) -> &[ModelCandidate] {
        &self.candidates
    }

    /// Search every candidate and keep the lowest-MAE pipeline
    pub fn run(&self, x: &DataFrame, y: &Array1<f64>) -> Result<SearchOutcome> {
        if x.height() != y.len() {
            return Err(PricingError::ShapeError {
                expected: format!("{} target values", x.height()),
                actual: format!("{} target values", y.len()),
            });
        }

        let folds = self
            .cv
            .split(x.height())?
            .iter()
            .map(|split| FoldData::new(x, y, split))
            .collect::<Result<Vec<_>>>()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.n_threads)
            .build()
            .map_err(|e| PricingError::ComputationError(format!("failed to build worker pool: {e}")))?;

        info!(
            candidates = self.candidates.len(),
            folds = folds.len(),
            threads = self.n_threads,
            rows = x.height(),
            "Starting model search"
        );

        let mut results = Vec::new();
        let mut summaries = Vec::with_capacity(self.candidates.len());

        for candidate in &self.candidates {
            let start = Instant::now();
            match self.evaluate_candidate(&pool, candidate, x, y, &folds) {
                Ok(result) => {
                    let elapsed = start.elapsed().as_secs_f64();
                    info!(
                        candidate = %result.name,
                        cv_mae = result.cv_mae,
                        params = %format_params(&result.best_params),
                        elapsed_secs = elapsed,
                        "Candidate evaluated"
                    );
                    summaries.push(CandidateSummary::succeeded(&result, elapsed));
                    results.push(result);
                }
                Err(err) => {
                    error!(candidate = %candidate.name, error = %err, "Candidate excluded");
                    summaries.push(CandidateSummary::failed(candidate, &err, start.elapsed().as_secs_f64()));
                }
            }
        }

        let scores: Vec<f64> = results.iter().map(|r| r.cv_mae).collect();
        let champion_idx = select_champion(&scores).ok_or_else(|| PricingError::CandidateFit {
            name: "all".to_string(),
            reason: "no candidate produced a usable model".to_string(),
        })?;
        let champion = results.swap_remove(champion_idx);

        info!(champion = %champion.name, cv_mae = champion.cv_mae, "Champion selected");
        Ok(SearchOutcome { champion, summaries })
    }

    fn evaluate_candidate(
        &self,
        pool: &rayon::ThreadPool,
        candidate: &ModelCandidate,
        x: &DataFrame,
        y: &Array1<f64>,
        folds: &[FoldData],
    ) -> Result<CandidateResult> {
        let points = candidate.grid_points();
        let jobs: Vec<(usize, usize)> = (0..points.len())
            .flat_map(|p| (0..folds.len()).map(move |f| (p, f)))
            .collect();

        // collect() keeps submission order regardless of completion order
        let fold_results: Vec<Result<f64>> = pool.install(|| {
            jobs.par_iter()
                .map(|&(p, f)| self.score_fold(candidate, &points[p], &folds[f]))
                .collect()
        });

        let mut grid = Vec::with_capacity(points.len());
        let mut last_error = None;
        for (p, params) in points.iter().enumerate() {
            let chunk = &fold_results[p * folds.len()..(p + 1) * folds.len()];
            let mut fold_maes = Vec::with_capacity(chunk.len());
            let mut failed = false;
            for result in chunk {
                match result {
                    Ok(mae) => fold_maes.push(*mae),
                    Err(err) => {
                        warn!(
                            candidate = %candidate.name,
                            params = %format_params(params),
                            error = %err,
                            "Fold fit failed"
                        );
                        last_error = Some(err.to_string());
                        failed = true;
                    }
                }
            }
            let mean_mae = if failed {
                f64::NAN
            } else {
                fold_maes.iter().sum::<f64>() / fold_maes.len() as f64
            };
            debug!(candidate = %candidate.name, params = %format_params(params), mean_mae, "Grid point scored");
            grid.push(GridPointScore {
                params: params.clone(),
                fold_maes,
                mean_mae,
            });
        }

        let scores: Vec<f64> = grid.iter().map(|g| g.mean_mae).collect();
        let best = select_champion(&scores).ok_or_else(|| PricingError::CandidateFit {
            name: candidate.name.clone(),
            reason: last_error.unwrap_or_else(|| "every grid point scored NaN".to_string()),
        })?;
        let best_params = grid[best].params.clone();

        let refit = || -> Result<PricingPipeline> {
            let estimator = candidate.family.build(&best_params)?;
            let mut pipeline = self.factory.create_pipeline(estimator, candidate.use_poly);
            pipeline.fit(x, y)?;
            Ok(pipeline)
        };
        let pipeline = refit().map_err(|err| PricingError::CandidateFit {
            name: candidate.name.clone(),
            reason: format!("refit failed: {err}"),
        })?;

        Ok(CandidateResult {
            name: candidate.name.clone(),
            best_params,
            cv_mae: scores[best],
            pipeline,
            grid,
        })
    }

    fn score_fold(&self, candidate: &ModelCandidate, params: &ParamSet, fold: &FoldData) -> Result<f64> {
        let estimator = candidate.family.build(params)?;
        let mut pipeline = self.factory.create_pipeline(estimator, candidate.use_poly);
        pipeline.fit(&fold.x_train, &fold.y_train)?;
        let predictions = pipeline.predict(&fold.x_valid)?;
        let mae = mean_absolute_error(&fold.y_valid, &predictions);
        if !mae.is_finite() {
            return Err(PricingError::ComputationError(format!("non-finite fold MAE {mae}")));
        }
        Ok(mae)
    }
}
