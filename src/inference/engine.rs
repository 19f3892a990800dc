//! Inference engine implementation
//!
//! Scores raw feature records against a trained model:
//! - Realigns records to the training feature schema
//! - Shares the model across threads (Arc)
//! - Counts served predictions

use super::FeaturePayload;
use crate::error::{Result, TabularError};
use crate::preprocessing::{encode_for_inference, FeatureRecord, FeatureSchema};
use crate::training::{ModelArtifact, Prediction, TrainedModel};
use ndarray::Array2;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Prediction service for one trained model
#[derive(Debug)]
pub struct InferenceEngine {
    model: Arc<TrainedModel>,
    schema: FeatureSchema,
    total_predictions: AtomicU64,
}

impl InferenceEngine {
    /// Create an engine from a model and the schema it was trained with
    pub fn new(model: TrainedModel, schema: FeatureSchema) -> Self {
        Self {
            model: Arc::new(model),
            schema,
            total_predictions: AtomicU64::new(0),
        }
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        Self::new(artifact.model, artifact.schema)
    }

    /// Load from a saved model artifact
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        ModelArtifact::load(path).map(Self::from_artifact)
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Number of predictions served so far
    pub fn total_predictions(&self) -> u64 {
        self.total_predictions.load(Ordering::Relaxed)
    }

    /// Encode records into the model's feature layout
    pub fn encode(&self, records: &[FeatureRecord]) -> Result<Array2<f64>> {
        if self.schema.is_empty() {
            return Err(TabularError::SchemaMismatch(
                "model has an empty feature schema".to_string(),
            ));
        }
        encode_for_inference(records, &self.schema)
    }

    /// One prediction per input record, in input order
    pub fn predict(&self, payload: FeaturePayload) -> Result<Vec<Prediction>> {
        self.predict_records(&payload.into_records())
    }

    pub fn predict_records(&self, records: &[FeatureRecord]) -> Result<Vec<Prediction>> {
        let start = Instant::now();
        let x = self.encode(records)?;
        let predictions = self.model.predict(&x)?;

        self.total_predictions
            .fetch_add(predictions.len() as u64, Ordering::Relaxed);
        debug!(
            records = records.len(),
            latency_us = start.elapsed().as_micros() as u64,
            "Served predictions"
        );
        Ok(predictions)
    }

    /// Class probabilities per record, `None` for regression models
    pub fn predict_proba(&self, payload: FeaturePayload) -> Result<Option<Array2<f64>>> {
        let x = self.encode(&payload.into_records())?;
        self.model.predict_proba(&x)
    }
}

/// Score records against a model and its training schema
pub fn predict(
    model: &TrainedModel,
    schema: &FeatureSchema,
    payload: FeaturePayload,
) -> Result<Vec<Prediction>> {
    if schema.is_empty() {
        return Err(TabularError::SchemaMismatch(
            "model has an empty feature schema".to_string(),
        ));
    }
    let x = encode_for_inference(&payload.into_records(), schema)?;
    model.predict(&x)
}
