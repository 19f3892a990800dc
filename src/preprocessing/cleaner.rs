//! Dataset cleaning: imputation, date normalization and duplicate removal

use super::config::CleaningConfig;
use super::dates::{convert_column, DateColumnDetector, NameSubstringDetector};
use super::imputer::{impute_column, ImputeOutcome};
use crate::table::{ColumnData, Table, TemporalCell};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Summary of one cleaning run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_before: usize,
    pub rows_after: usize,
    pub rows_removed_as_duplicate: usize,
    /// Date-like columns that were converted to temporal cells
    pub date_columns_converted: Vec<String>,
    /// Numeric columns left with missing values because they had no values at all
    pub unfilled_columns: Vec<String>,
}

/// Hashable view of one cell, used to compare whole rows
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CellKey<'a> {
    Missing,
    Number(u64),
    Text(&'a str),
    Time(&'a TemporalCell),
}

fn cell_key(data: &ColumnData, row: usize) -> CellKey<'_> {
    match data {
        ColumnData::Numeric(values) => match values[row] {
            // -0.0 and 0.0 compare equal
            Some(v) => CellKey::Number((v + 0.0).to_bits()),
            None => CellKey::Missing,
        },
        ColumnData::Categorical(values) => values[row]
            .as_deref()
            .map_or(CellKey::Missing, CellKey::Text),
        ColumnData::Temporal(values) => values[row].as_ref().map_or(CellKey::Missing, CellKey::Time),
    }
}

/// Rows to keep after dropping exact duplicates, first occurrence wins
fn unique_rows(table: &Table) -> Vec<usize> {
    let mut seen = HashSet::with_capacity(table.height());
    (0..table.height())
        .filter(|&row| {
            let key: Vec<CellKey<'_>> = table
                .columns()
                .iter()
                .map(|c| cell_key(c.data(), row))
                .collect();
            seen.insert(key)
        })
        .collect()
}

/// Cleaning engine
#[derive(Debug)]
pub struct DataCleaner {
    config: CleaningConfig,
    detector: Box<dyn DateColumnDetector>,
}

impl Default for DataCleaner {
    fn default() -> Self {
        Self::new(CleaningConfig::default())
    }
}

impl DataCleaner {
    /// Create a cleaner whose date detector matches the configured keywords
    pub fn new(config: CleaningConfig) -> Self {
        let detector = Box::new(NameSubstringDetector::new(&config.date_keywords));
        Self { config, detector }
    }

    /// Replace the date-like column heuristic
    pub fn with_detector(mut self, detector: Box<dyn DateColumnDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Clean a table.
    ///
    /// Steps run in a fixed order so that later steps see imputed values:
    /// impute numeric columns with the median and other columns with the mode
    /// (or the placeholder), convert date-like columns, then drop duplicate rows.
    /// The input is consumed; the returned table is the cleaned dataset.
    pub fn clean(&self, mut table: Table) -> (Table, CleaningReport) {
        let start = Instant::now();
        let rows_before = table.height();

        let mut unfilled_columns = Vec::new();
        let mut filled_cells = 0usize;
        for column in table.columns_mut() {
            match impute_column(column.data_mut(), &self.config.missing_placeholder) {
                ImputeOutcome::Filled(n) => {
                    debug!(column = column.name(), filled = n, "Imputed missing values");
                    filled_cells += n;
                }
                ImputeOutcome::Unfilled => {
                    warn!(column = column.name(), "Column is entirely missing, left unfilled");
                    unfilled_columns.push(column.name().to_string());
                }
                ImputeOutcome::Complete => {}
            }
        }

        let mut date_columns_converted = Vec::new();
        for column in table.columns_mut() {
            if !self.detector.is_date_column(column.name()) {
                continue;
            }
            match convert_column(column.data()) {
                Some(converted) => {
                    column.set_data(converted);
                    date_columns_converted.push(column.name().to_string());
                }
                None => debug!(column = column.name(), "Date-like column left unconverted"),
            }
        }

        let table = if self.config.drop_duplicates {
            let keep = unique_rows(&table);
            if keep.len() == table.height() {
                table
            } else {
                table.take_rows(&keep)
            }
        } else {
            table
        };

        let rows_after = table.height();
        let report = CleaningReport {
            rows_before,
            rows_after,
            rows_removed_as_duplicate: rows_before - rows_after,
            date_columns_converted,
            unfilled_columns,
        };

        info!(
            rows_before,
            rows_after,
            filled_cells,
            dates_converted = report.date_columns_converted.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Cleaned dataset"
        );
        (table, report)
    }
}

/// Clean a table with the default configuration
pub fn clean(table: Table) -> (Table, CleaningReport) {
    DataCleaner::default().clean(table)
}
