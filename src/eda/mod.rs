//! Exploratory data analysis
//!
//! Computes correlation, histograms and descriptive statistics over the
//! numeric columns of a [`Table`]. Categorical and temporal columns are
//! ignored. The report is a pure function of the input: the same table always
//! produces the same (rounded) numbers, keyed in the table's column order.

mod correlation;
mod distribution;
mod summary;

pub use correlation::{correlation_matrix, pearson, CorrelationMatrix};
pub use distribution::{histogram, Histogram};
pub use summary::SummaryStats;

use crate::error::{Result, TabularError};
use crate::table::Table;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// EDA configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdaConfig {
    /// Histogram bin count
    pub bins: usize,
    /// Decimal digits kept in every reported number
    pub precision: u32,
}

impl Default for EdaConfig {
    fn default() -> Self {
        Self {
            bins: 10,
            precision: 4,
        }
    }
}

impl EdaConfig {
    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins;
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.bins == 0 {
            return Err(TabularError::ConfigError("bins must be positive".to_string()));
        }
        Ok(())
    }
}

/// Exploratory statistics for one table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdaReport {
    pub correlation: CorrelationMatrix,
    pub distributions: IndexMap<String, Histogram>,
    pub summary_stats: IndexMap<String, SummaryStats>,
}

/// EDA engine
#[derive(Debug, Clone, Default)]
pub struct EdaEngine {
    config: EdaConfig,
}

impl EdaEngine {
    pub fn new(config: EdaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EdaConfig {
        &self.config
    }

    /// Analyze the numeric columns of `table`. Never fails: a table without
    /// numeric columns yields an empty report.
    pub fn analyze(&self, table: &Table) -> EdaReport {
        let numeric: Vec<(&str, &[Option<f64>])> = table
            .numeric_columns()
            .filter_map(|c| c.as_numeric().map(|v| (c.name(), v)))
            .collect();

        let bins = self.config.bins.max(1);
        let precision = self.config.precision;

        let per_column: Vec<(Histogram, SummaryStats)> = numeric
            .par_iter()
            .map(|(_, values)| {
                (
                    histogram(values, bins, precision),
                    SummaryStats::compute(values, precision),
                )
            })
            .collect();

        let mut report = EdaReport {
            correlation: correlation_matrix(&numeric, precision),
            ..EdaReport::default()
        };
        for ((name, _), (hist, stats)) in numeric.iter().zip(per_column) {
            report.distributions.insert(name.to_string(), hist);
            report.summary_stats.insert(name.to_string(), stats);
        }

        info!(
            numeric_columns = numeric.len(),
            rows = table.height(),
            "Computed EDA report"
        );
        report
    }
}

/// Analyze a table with the default configuration
pub fn analyze(table: &Table) -> EdaReport {
    EdaEngine::default().analyze(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    #[test]
    fn test_no_numeric_columns() {
        let table = Table::new(vec![Column::categorical("city", vec![Some("NY"), Some("LA")])]).unwrap();
        let report = analyze(&table);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "correlation": {"columns": [], "matrix": []},
                "distributions": {},
                "summary_stats": {}
            })
        );
    }

    #[test]
    fn test_report_in_column_order() {
        let table = Table::new(vec![
            Column::numeric("z", vec![Some(1.0), Some(2.0), Some(4.0)]),
            Column::categorical("label", vec![Some("a"), Some("b"), Some("c")]),
            Column::numeric("a", vec![Some(3.0), None, Some(1.0)]),
        ])
        .unwrap();
        let report = analyze(&table);

        assert_eq!(report.correlation.columns, vec!["z", "a"]);
        let keys: Vec<&String> = report.distributions.keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
        assert_eq!(report.summary_stats["a"].count, 2);
        assert_eq!(report.correlation.get("z", "a"), Some(-1.0));
    }

    #[test]
    fn test_deterministic() {
        let table = Table::new(vec![
            Column::numeric("x", vec![Some(0.1), Some(0.7), Some(0.3333)]),
            Column::numeric("y", vec![Some(2.0), Some(1.0), Some(0.5)]),
        ])
        .unwrap();
        assert_eq!(analyze(&table), analyze(&table));
    }

    #[test]
    fn test_config_bins() {
        let table = Table::new(vec![Column::numeric("x", vec![Some(1.0), Some(2.0)])]).unwrap();
        let report = EdaEngine::new(EdaConfig::default().with_bins(4)).analyze(&table);
        assert_eq!(report.distributions["x"].counts.len(), 4);
        assert!(EdaConfig::default().with_bins(0).validate().is_err());
    }
}
