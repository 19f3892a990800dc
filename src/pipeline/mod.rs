//! End-to-end operations on files
//!
//! Each function takes a path to a stored dataset (or model artifact), runs one
//! pipeline step and returns plain, serializable results. Persisting outputs
//! other than the cleaned CSV is left to the caller.

use crate::eda::{EdaEngine, EdaReport};
use crate::error::Result;
use crate::inference::{FeaturePayload, InferenceEngine};
use crate::preprocessing::{CleaningReport, DataCleaner};
use crate::training::{ModelArtifact, Prediction, ProblemType, TrainEngine, TrainingConfig};
use crate::utils::{cleaned_file_path, DataLoader, DataSaver};
use std::path::{Path, PathBuf};
use tracing::info;

/// Clean a dataset file and write `cleaned_<stem>.csv` next to it
pub fn clean_dataset(path: impl AsRef<Path>) -> Result<(PathBuf, CleaningReport)> {
    clean_dataset_with(path, &DataCleaner::default())
}

pub fn clean_dataset_with(
    path: impl AsRef<Path>,
    cleaner: &DataCleaner,
) -> Result<(PathBuf, CleaningReport)> {
    let path = path.as_ref();
    let table = DataLoader::new().load(path)?;
    let (cleaned, report) = cleaner.clean(table);

    let output = cleaned_file_path(path);
    DataSaver::save_csv(&cleaned, &output)?;
    info!(
        input = %path.display(),
        output = %output.display(),
        rows_after = report.rows_after,
        "Wrote cleaned dataset"
    );
    Ok((output, report))
}

/// Load a dataset file and compute its EDA report
pub fn generate_eda(path: impl AsRef<Path>) -> Result<EdaReport> {
    generate_eda_with(path, &EdaEngine::default())
}

pub fn generate_eda_with(path: impl AsRef<Path>, engine: &EdaEngine) -> Result<EdaReport> {
    let table = DataLoader::new().load(path)?;
    Ok(engine.analyze(&table))
}

/// Train a model on a dataset file.
///
/// The problem type is parsed before the file is touched, so an invalid one
/// fails without any work done.
pub fn train_model(
    path: impl AsRef<Path>,
    target_column: &str,
    problem_type: &str,
    config: &TrainingConfig,
) -> Result<ModelArtifact> {
    let problem_type: ProblemType = problem_type.parse()?;
    config.validate()?;

    let table = DataLoader::new().load(path)?;
    let outcome = TrainEngine::new(config.clone()).train(&table, target_column, problem_type)?;
    Ok(ModelArtifact::new(outcome, target_column))
}

/// Score a payload with a saved model artifact
pub fn predict_with_artifact(
    artifact_path: impl AsRef<Path>,
    payload: FeaturePayload,
) -> Result<Vec<Prediction>> {
    InferenceEngine::load(artifact_path)?.predict(payload)
}
