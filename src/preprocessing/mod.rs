//! Data preprocessing module
//!
//! Provides the cleaning and encoding stages of the pipeline:
//! - Missing value imputation (median for numeric, mode for everything else)
//! - Date-like column detection and best-effort temporal conversion
//! - Exact-duplicate row removal
//! - One-hot encoding with realignment to a fixed feature schema

mod cleaner;
mod config;
mod dates;
mod encoder;
mod imputer;

pub use cleaner::{clean, CleaningReport, DataCleaner};
pub use config::CleaningConfig;
pub use dates::{convert_column, parse_temporal, DateColumnDetector, NameSubstringDetector};
pub use encoder::{
    encode_for_inference, encode_for_training, table_from_records, EncodedDataset, FeatureRecord,
    FeatureSchema, OneHotEncoder, TargetVector,
};
pub use imputer::{impute_column, median, mode, ImputeOutcome};
