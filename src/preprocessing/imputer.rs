//! Missing value imputation for table columns

use crate::table::{ColumnData, TemporalCell};
use std::collections::HashMap;
use std::hash::Hash;

/// Result of imputing one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImputeOutcome {
    /// Nothing was missing
    Complete,
    /// Number of cells that were filled
    Filled(usize),
    /// Entirely missing numeric column; no median exists so nothing was filled
    Unfilled,
}

/// Median of the non-missing values, averaging the middle pair for even counts
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.total_cmp(b));

    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

/// Most frequent non-missing value; ties go to the smallest value
pub fn mode<T: Ord + Hash + Clone>(values: &[Option<T>]) -> Option<T> {
    let mut counts: HashMap<&T, usize> = HashMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then_with(|| vb.cmp(va)))
        .map(|(value, _)| value.clone())
}

fn fill<T: Clone>(values: &mut [Option<T>], with: &T) -> usize {
    let mut filled = 0;
    for slot in values.iter_mut().filter(|v| v.is_none()) {
        *slot = Some(with.clone());
        filled += 1;
    }
    filled
}

/// Fill the missing cells of a column in place.
///
/// Numeric columns take their median. Other columns take their mode, or
/// `placeholder` when they have no values at all.
pub fn impute_column(data: &mut ColumnData, placeholder: &str) -> ImputeOutcome {
    if data.null_count() == 0 {
        return ImputeOutcome::Complete;
    }

    let filled = match data {
        ColumnData::Numeric(values) => match median(values) {
            Some(m) => fill(values, &m),
            None => return ImputeOutcome::Unfilled,
        },
        ColumnData::Categorical(values) => {
            let with = mode(values).unwrap_or_else(|| placeholder.to_string());
            fill(values, &with)
        }
        ColumnData::Temporal(values) => {
            let with = mode(values).unwrap_or_else(|| TemporalCell::Unparsed(placeholder.to_string()));
            fill(values, &with)
        }
    };

    ImputeOutcome::Filled(filled)
}
