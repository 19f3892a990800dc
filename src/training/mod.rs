//! Model training module
//!
//! Gradient-boosted trees for regression and classification:
//! - Second-order regression trees as the base learner
//! - Seeded train/test split and held-out evaluation
//! - JSON model artifacts bundling model, schema and metrics

mod artifact;
mod config;
mod engine;
mod models;
pub mod decision_tree;
pub mod gradient_boosting;

pub use artifact::ModelArtifact;
pub use config::{ProblemType, TrainingConfig};
pub use decision_tree::{RegressionTree, TreeNode};
pub use engine::{TrainEngine, TrainedModel, TrainingOutcome, TrainingStage};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig, GradientBoostingRegressor};
pub use models::{Model, ModelMetrics, Prediction};

use crate::error::Result;
use crate::table::Table;

/// Train with the default configuration
pub fn train(table: &Table, target_column: &str, problem_type: ProblemType) -> Result<TrainingOutcome> {
    TrainEngine::default().train(table, target_column, problem_type)
}
