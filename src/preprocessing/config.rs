//! Cleaning configuration

use serde::{Deserialize, Serialize};

/// Configuration for data cleaning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Fill value for non-numeric columns that have no mode
    pub missing_placeholder: String,

    /// Case-insensitive name fragments that mark a column as date-like
    pub date_keywords: Vec<String>,

    /// Whether exact-duplicate rows are removed
    pub drop_duplicates: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            missing_placeholder: "Unknown".to_string(),
            date_keywords: vec!["date".to_string(), "time".to_string()],
            drop_duplicates: true,
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the placeholder for all-missing text columns
    pub fn with_missing_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.missing_placeholder = placeholder.into();
        self
    }

    /// Builder method to set the date-like name fragments
    pub fn with_date_keywords<S: Into<String>>(mut self, keywords: impl IntoIterator<Item = S>) -> Self {
        self.date_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to toggle duplicate removal
    pub fn with_drop_duplicates(mut self, drop: bool) -> Self {
        self.drop_duplicates = drop;
        self
    }
}
