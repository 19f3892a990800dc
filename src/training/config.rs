//! Training configuration

use super::gradient_boosting::GradientBoostingConfig;
use crate::error::{Result, TabularError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Problem type, selecting the algorithm family and the metric set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemType {
    Regression,
    Classification,
}

impl ProblemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::Regression => "regression",
            ProblemType::Classification => "classification",
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProblemType {
    type Err = TabularError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "regression" => Ok(ProblemType::Regression),
            "classification" => Ok(ProblemType::Classification),
            other => Err(TabularError::InvalidProblemType(other.to_string())),
        }
    }
}

/// Configuration for a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation
    pub test_size: f64,

    /// Seed for the train/test split and the boosting RNG
    pub random_state: u64,

    /// Decimal digits kept in reported metrics
    pub metric_precision: u32,

    /// Boosting hyperparameters shared by both problem types
    pub boosting: GradientBoostingConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
            metric_precision: 4,
            boosting: GradientBoostingConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method to set the held-out fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Builder method to set the seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set the number of boosting rounds
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.boosting.n_estimators = n;
        self
    }

    /// Builder method to set the learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.boosting.learning_rate = lr;
        self
    }

    /// Builder method to set the maximum tree depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.boosting.max_depth = depth;
        self
    }

    /// Boosting configuration seeded from `random_state`
    pub fn seeded_boosting(&self) -> GradientBoostingConfig {
        GradientBoostingConfig {
            random_state: Some(self.random_state),
            ..self.boosting.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(TabularError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        self.boosting.validate()
    }
}
