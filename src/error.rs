//! Error types for the tabular ML pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, TabularError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum TabularError {
    /// The loader could not read or parse the input file
    #[error("Unreadable file '{path}': {reason}")]
    UnreadableFile { path: String, reason: String },

    /// Training was requested against a column the dataset does not have
    #[error("Target column not found in dataset: {0}")]
    TargetColumnMissing(String),

    /// Problem type string is neither regression nor classification
    #[error("Invalid problem type '{0}'. Use regression or classification.")]
    InvalidProblemType(String),

    /// Realignment cannot produce a usable column set
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TabularError {
    /// Build an [`TabularError::UnreadableFile`] from any displayable cause
    pub fn unreadable(path: impl AsRef<std::path::Path>, reason: impl std::fmt::Display) -> Self {
        TabularError::UnreadableFile {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for TabularError {
    fn from(err: polars::error::PolarsError) -> Self {
        TabularError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for TabularError {
    fn from(err: serde_json::Error) -> Self {
        TabularError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TabularError {
    fn from(err: ndarray::ShapeError) -> Self {
        TabularError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
