//! Descriptive statistics

use crate::utils::round_to;
use serde::{Deserialize, Serialize};

/// count/mean/std/min/quartiles/max of one numeric column.
///
/// Statistics that are undefined for the column (no values, or `std` of a
/// single value) are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub q50: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Linear interpolation between the two nearest ranks of sorted data
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let t = pos - lo as f64;

    let (a, b) = (sorted[lo], sorted[hi]);
    let diff = b - a;
    // interpolate from the nearer end
    Some(if t >= 0.5 { b - diff * (1.0 - t) } else { a + diff * t })
}

impl SummaryStats {
    /// Compute statistics over the present values, rounded to `precision` digits
    pub fn compute(values: &[Option<f64>], precision: u32) -> Self {
        let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let count = sorted.len();
        let n = count as f64;
        let mean = (count > 0).then(|| sorted.iter().sum::<f64>() / n);
        let std = mean.filter(|_| count > 1).map(|m| {
            let ss: f64 = sorted.iter().map(|v| (v - m) * (v - m)).sum();
            (ss / (n - 1.0)).sqrt()
        });

        let round = |v: Option<f64>| v.map(|x| round_to(x, precision));
        Self {
            count,
            mean: round(mean),
            std: round(std),
            min: round(sorted.first().copied()),
            q25: round(quantile(&sorted, 0.25)),
            q50: round(quantile(&sorted, 0.5)),
            q75: round(quantile(&sorted, 0.75)),
            max: round(sorted.last().copied()),
        }
    }
}
