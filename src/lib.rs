//! Tabular ML - cleaning, exploration and gradient-boosted modelling of tabular data
//!
//! This crate provides a small end-to-end pipeline over CSV and spreadsheet files:
//! - Loading into explicitly typed columns
//! - Cleaning (imputation, date normalization, duplicate removal)
//! - Exploratory analysis (correlation, histograms, summary statistics)
//! - One-hot encoding with a fixed, persisted feature schema
//! - Gradient-boosted regression and classification with held-out metrics
//! - Prediction from raw JSON records realigned to the training schema
//!
//! # Modules
//!
//! ## Data
//! - [`table`] - Typed in-memory table
//! - [`utils`] - File loading and saving
//!
//! ## Pipeline stages
//! - [`preprocessing`] - Cleaning and feature encoding
//! - [`eda`] - Exploratory data analysis
//! - [`training`] - Model training and artifacts
//! - [`inference`] - Prediction service
//! - [`pipeline`] - File-level operations chaining the stages
//!
//! ## Services
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data
pub mod table;
pub mod utils;

// Pipeline stages
pub mod preprocessing;
pub mod eda;
pub mod training;
pub mod inference;
pub mod pipeline;

// Services
pub mod cli;

pub use error::{Result, TabularError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, TabularError};

    // Data
    pub use crate::table::{Column, ColumnData, ColumnType, Table, TemporalCell};
    pub use crate::utils::{DataLoader, DataSaver};

    // Preprocessing
    pub use crate::preprocessing::{
        CleaningConfig, CleaningReport, DataCleaner, FeatureRecord, FeatureSchema, OneHotEncoder,
    };

    // EDA
    pub use crate::eda::{EdaConfig, EdaEngine, EdaReport};

    // Training
    pub use crate::training::{
        ModelArtifact, ModelMetrics, Prediction, ProblemType, TrainEngine, TrainedModel, TrainingConfig,
    };

    // Inference
    pub use crate::inference::{FeaturePayload, InferenceEngine};
}
