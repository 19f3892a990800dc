//! Tabular ML CLI Module
//!
//! Command-line interface for inspecting, cleaning, exploring, training on and
//! predicting with tabular datasets.

use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::eda::{EdaConfig, EdaEngine};
use crate::inference::{FeaturePayload, InferenceEngine};
use crate::pipeline;
use crate::preprocessing::{CleaningConfig, DataCleaner};
use crate::table::ColumnType;
use crate::training::{ModelArtifact, ProblemType, TrainingConfig};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn row(key: &str, value: impl std::fmt::Display) {
    println!("  {:<24} {}", muted(key), value.to_string().white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tabular-ml")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clean, explore, train on and predict with tabular datasets")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show shape and column types of a dataset
    Info {
        /// Input data file (CSV, XLSX or XLS)
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Clean a dataset and write cleaned_<name>.csv next to it
    Clean {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Placeholder for missing categorical values
        #[arg(long, default_value = "Unknown")]
        placeholder: String,

        /// Keep duplicate rows
        #[arg(long)]
        keep_duplicates: bool,
    },

    /// Compute correlation, distributions and summary statistics
    Eda {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Histogram bin count
        #[arg(long, default_value = "10")]
        bins: usize,

        /// Write the report as JSON instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train a gradient-boosted model
    Train {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: String,

        /// Problem type (regression, classification)
        #[arg(short, long)]
        problem_type: String,

        /// JSON training configuration; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fraction of rows held out for evaluation
        #[arg(long)]
        test_size: Option<f64>,

        /// Seed for the split and the boosting RNG
        #[arg(long)]
        seed: Option<u64>,

        /// Number of boosting rounds
        #[arg(long)]
        n_estimators: Option<usize>,

        /// Learning rate
        #[arg(long)]
        learning_rate: Option<f64>,

        /// Maximum tree depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Output artifact file (default: model_<name>_<problem_type>.json next to the data)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Predict with a saved model artifact
    Predict {
        /// Model artifact file
        #[arg(short, long)]
        model: PathBuf,

        /// JSON object or array of objects, or @file to read it from a file
        #[arg(short, long)]
        input: String,

        /// Write predictions as JSON instead of printing them
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Info { data } => cmd_info(&data),
        Commands::Clean { data, placeholder, keep_duplicates } => {
            cmd_clean(&data, &placeholder, keep_duplicates)
        }
        Commands::Eda { data, bins, output } => cmd_eda(&data, bins, output.as_deref()),
        Commands::Train {
            data,
            target,
            problem_type,
            config,
            test_size,
            seed,
            n_estimators,
            learning_rate,
            max_depth,
            output,
        } => {
            let mut training = match config {
                Some(path) => TrainingConfig::from_json_file(path)?,
                None => TrainingConfig::default(),
            };
            if let Some(v) = test_size { training = training.with_test_size(v); }
            if let Some(v) = seed { training = training.with_random_state(v); }
            if let Some(v) = n_estimators { training = training.with_n_estimators(v); }
            if let Some(v) = learning_rate { training = training.with_learning_rate(v); }
            if let Some(v) = max_depth { training = training.with_max_depth(v); }

            cmd_train(&data, &target, &problem_type, &training, output.as_deref())
        }
        Commands::Predict { model, input, output } => cmd_predict(&model, &input, output.as_deref()),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let table = DataLoader::new().load(data_path)?;

    row("File", data_path.display());
    row("Rows", table.height());
    row("Columns", table.width());
    println!();

    println!("  {:<24} {:<12} {:>6}", muted("Column"), muted("Type"), muted("Nulls"));
    println!("  {}", dim(&"─".repeat(44)));

    for column in table.columns() {
        let kind = match column.column_type() {
            ColumnType::Numeric => "numeric",
            ColumnType::Categorical => "categorical",
            ColumnType::Temporal => "temporal",
        };
        println!(
            "  {:<24} {:<12} {:>6}",
            column.name(),
            kind.truecolor(140, 140, 140),
            column.null_count()
        );
    }

    println!();
    Ok(())
}

pub fn cmd_clean(data_path: &Path, placeholder: &str, keep_duplicates: bool) -> anyhow::Result<()> {
    section("Clean");

    let config = CleaningConfig::default()
        .with_missing_placeholder(placeholder)
        .with_drop_duplicates(!keep_duplicates);

    step_run("Cleaning");
    let start = Instant::now();
    let (output, report) = pipeline::clean_dataset_with(data_path, &DataCleaner::new(config))?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    row("Rows before", report.rows_before);
    row("Rows after", report.rows_after);
    row("Duplicates removed", report.rows_removed_as_duplicate);
    row("Date columns", report.date_columns_converted.join(", "));
    if !report.unfilled_columns.is_empty() {
        row("Unfilled columns", report.unfilled_columns.join(", ").yellow());
    }
    row("Written to", output.display());
    println!();
    Ok(())
}

pub fn cmd_eda(data_path: &Path, bins: usize, output: Option<&Path>) -> anyhow::Result<()> {
    let config = EdaConfig::default().with_bins(bins);
    config.validate()?;

    let report = pipeline::generate_eda_with(data_path, &EdaEngine::new(config))?;
    let json = serde_json::to_string_pretty(&report)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            section("EDA");
            row("Numeric columns", report.summary_stats.len());
            row("Written to", path.display());
            println!();
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub fn cmd_train(
    data_path: &Path,
    target: &str,
    problem_type: &str,
    config: &TrainingConfig,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Train");

    let parsed: ProblemType = problem_type.parse()?;

    step_run(&format!("Training {} on {}", parsed.as_str().cyan(), target.cyan()));
    let start = Instant::now();
    let artifact = pipeline::train_model(data_path, target, problem_type, config)?;
    step_done(&format!("{:?}", start.elapsed()));

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let stem = data_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "dataset".to_string());
            data_path.with_file_name(ModelArtifact::file_name(stem, parsed))
        }
    };
    artifact.save(&output)?;

    println!();
    for (name, value) in artifact.metrics.values() {
        println!("  {:<24} {}", muted(name), format!("{:.4}", value).white().bold());
    }
    row("Features", artifact.schema.len());
    row("Model", output.display());
    println!();
    Ok(())
}

/// Inline JSON, or the contents of a file when prefixed with `@`
fn read_payload(input: &str) -> anyhow::Result<FeaturePayload> {
    let json = match input.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => input.to_string(),
    };
    Ok(serde_json::from_str(&json)?)
}

pub fn cmd_predict(model_path: &Path, input: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let engine = InferenceEngine::load(model_path)?;
    let payload = read_payload(input)?;
    let predictions = engine.predict(payload)?;
    let json = serde_json::to_string_pretty(&predictions)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            section("Predict");
            row("Predictions", predictions.len());
            row("Written to", path.display());
            println!();
        }
        None => println!("{}", json),
    }
    Ok(())
}
