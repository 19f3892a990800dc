//! Inference engine module
//!
//! Serves predictions from a trained model and its feature schema. Payloads
//! are one JSON object or an array of them; every record is realigned to the
//! schema before scoring, so unseen categories and unknown keys never fail.

mod engine;

pub use engine::{predict, InferenceEngine};

use crate::preprocessing::FeatureRecord;
use serde::{Deserialize, Serialize};

/// Prediction input: a lone record or a batch of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeaturePayload {
    One(FeatureRecord),
    Many(Vec<FeatureRecord>),
}

impl FeaturePayload {
    /// Normalize to a sequence; a lone record becomes a one-element batch
    pub fn into_records(self) -> Vec<FeatureRecord> {
        match self {
            FeaturePayload::One(record) => vec![record],
            FeaturePayload::Many(records) => records,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FeaturePayload::One(_) => 1,
            FeaturePayload::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<FeatureRecord> for FeaturePayload {
    fn from(record: FeatureRecord) -> Self {
        FeaturePayload::One(record)
    }
}

impl From<Vec<FeatureRecord>> for FeaturePayload {
    fn from(records: Vec<FeatureRecord>) -> Self {
        FeaturePayload::Many(records)
    }
}
