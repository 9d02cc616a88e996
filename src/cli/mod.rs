//! Command-line interface for training, prediction and serving

use clap::{Parser, Subcommand};
use colored::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PricingConfig;
use crate::inference::{PricingPredictor, Record};
use crate::training::{TrainEngine, TrainingReport};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "pricing")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rental listing price model: train, predict and serve")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search the model zoo and persist the champion
    Train {
        /// Raw listings CSV (defaults to PRICING_DATA_PATH or data/raw/listings.csv)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Artifact output path (defaults to PRICING_MODEL_PATH or models/pricing_model_v1.bin)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of cross-validation folds
        #[arg(long)]
        cv_folds: Option<usize>,

        /// Seed for the hold-out split and seeded estimators
        #[arg(long)]
        seed: Option<u64>,

        /// Write the training report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Price listings with a trained artifact
    Predict {
        /// Trained artifact
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// JSON file or inline JSON: one record object or an array of them
        #[arg(short, long)]
        input: String,
    },

    /// Start the prediction server
    Serve {
        /// Trained artifact
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Server host (defaults to API_HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Server port (defaults to API_PORT or 8000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    data: Option<PathBuf>,
    output: Option<PathBuf>,
    cv_folds: Option<usize>,
    seed: Option<u64>,
    report_path: Option<&Path>,
) -> anyhow::Result<()> {
    let mut config = PricingConfig::default();
    if let Some(path) = data {
        config = config.with_data_path(path);
    }
    if let Some(path) = output {
        config = config.with_model_path(path);
    }
    if let Some(folds) = cv_folds {
        config = config.with_cv_folds(folds);
    }
    if let Some(seed) = seed {
        config = config.with_random_state(seed);
    }

    section("Train");
    println!("  {}", kv("Data   ", &config.raw_data_path.display().to_string()));
    println!("  {}", kv("Folds  ", &config.cv_folds.to_string()));
    println!("  {}", kv("Threads", &config.search_threads().to_string()));

    let start = Instant::now();
    let report = TrainEngine::new(config).run()?;
    step_ok(&format!("Search finished in {:.1?}", start.elapsed()));

    print_candidates(&report);
    print_champion(&report);

    if let Some(path) = report_path {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        step_ok(&format!("Report written to {}", path.display()));
    }
    Ok(())
}

fn print_candidates(report: &TrainingReport) {
    section("Candidates");
    println!("  {:<20} {:>12} {:>10}", muted("Model"), muted("CV MAE"), muted("Time"));
    for c in &report.candidates {
        let marker = if c.name == report.champion { ok("*") } else { " ".normal() };
        match c.cv_mae {
            Some(mae) => println!("{} {:<20} {:>12.4} {:>9.2}s", marker, c.name, mae, c.elapsed_secs),
            None => println!(
                "{} {:<20} {:>12}",
                marker,
                c.name,
                format!("err: {}", c.error.as_deref().unwrap_or("no score")).red()
            ),
        }
    }
}

fn print_champion(report: &TrainingReport) {
    let params = report
        .best_params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ");

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{} {}", "Champion".white().bold(), report.champion.green().bold()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("CV MAE   ", &format!("{:.4}", report.cv_mae)));
    line_box(&kv("Test MAE ", &format!("{:.4}", report.test_mae)));
    line_box(&kv("Test R2  ", &format!("{:.4}", report.test_r2)));
    line_box(&kv("Params   ", &params));
    if let Some(path) = &report.model_path {
        line_box(&kv("Artifact ", &path.display().to_string()));
    }
    line_box_empty();
    line_box_bottom();
    println!();
}

/// Inline JSON when `input` parses, otherwise a path to a JSON file
pub fn read_records(input: &str) -> anyhow::Result<Vec<Record>> {
    let value: Value = match serde_json::from_str(input) {
        Ok(v) => v,
        Err(_) => serde_json::from_str(&std::fs::read_to_string(input)?)?,
    };
    match value {
        Value::Object(record) => Ok(vec![record]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(record) => Ok(record),
                _ => anyhow::bail!("record {i} is not a JSON object"),
            })
            .collect(),
        _ => anyhow::bail!("input must be a JSON object or an array of objects"),
    }
}

pub fn cmd_predict(model: Option<PathBuf>, input: &str) -> anyhow::Result<()> {
    let model = model.unwrap_or_else(|| PricingConfig::default().model_save_path);
    let predictor = PricingPredictor::load(&model)?;
    let records = read_records(input)?;
    let prices = predictor.predict_batch(&records)?;

    for price in prices {
        println!(
            "{}",
            serde_json::json!({ "predicted_price": price, "currency": "USD" })
        );
    }
    Ok(())
}

pub async fn cmd_serve(model: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let mut config = ServerConfig::default();
    if let Some(model) = model {
        config = config.with_model_path(model);
    }
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }

    let base = format!("http://{}:{}", config.host, config.port);
    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Pricing Engine".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Predict", &format!("{base}/predict")));
    line_box(&kv("Health ", &format!("{base}/health")));
    line_box(&kv("Model  ", &config.model_path.display().to_string()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_train() {
        let cli = Cli::parse_from(["pricing", "train", "--cv-folds", "5", "--report", "r.json"]);
        match cli.command {
            Commands::Train { cv_folds, report, data, .. } => {
                assert_eq!(cv_folds, Some(5));
                assert_eq!(report, Some(PathBuf::from("r.json")));
                assert!(data.is_none());
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_read_records_inline() {
        let one = read_records(r#"{"beds": 2}"#).unwrap();
        assert_eq!(one.len(), 1);
        let many = read_records(r#"[{"beds": 2}, {"beds": 3}]"#).unwrap();
        assert_eq!(many.len(), 2);
        assert!(read_records("[1, 2]").is_err());
    }

    #[test]
    fn test_read_records_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record.json");
        std::fs::write(&path, r#"{"room_type": "Private room"}"#).unwrap();
        let records = read_records(path.to_str().unwrap()).unwrap();
        assert_eq!(records[0].get("room_type").and_then(|v| v.as_str()), Some("Private room"));
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[1mbold\x1b[0m"), "bold");
    }
}
