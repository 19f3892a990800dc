//! Persisted model artifact: a trained model stored together with its schema

use super::config::ProblemType;
use super::engine::{TrainedModel, TrainingOutcome};
use super::models::ModelMetrics;
use crate::error::{Result, TabularError};
use crate::preprocessing::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Everything needed to serve predictions for one trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub problem_type: ProblemType,
    pub target_column: String,
    pub model: TrainedModel,
    pub schema: FeatureSchema,
    pub metrics: ModelMetrics,
}

impl ModelArtifact {
    pub fn new(outcome: TrainingOutcome, target_column: impl Into<String>) -> Self {
        Self {
            problem_type: outcome.model.problem_type(),
            target_column: target_column.into(),
            model: outcome.model,
            schema: outcome.schema,
            metrics: outcome.metrics,
        }
    }

    /// Conventional file name for the model trained on a dataset
    pub fn file_name(dataset_id: impl std::fmt::Display, problem_type: ProblemType) -> String {
        format!("model_{}_{}.json", dataset_id, problem_type)
    }

    /// Save the artifact as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), problem_type = %self.problem_type, "Saved model artifact");
        Ok(())
    }

    /// Load an artifact saved by [`ModelArtifact::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let artifact: Self = serde_json::from_str(&json)?;
        if artifact.model.problem_type() != artifact.problem_type {
            return Err(TabularError::SerializationError(format!(
                "artifact declares {} but holds a {} model",
                artifact.problem_type,
                artifact.model.problem_type()
            )));
        }
        Ok(artifact)
    }
}
