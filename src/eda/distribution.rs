//! Equal-width histograms

use crate::utils::round_to;
use serde::{Deserialize, Serialize};

/// Histogram of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// `bins + 1` edges, rounded
    pub bin_edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Number of values counted
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    let step = (stop - start) / n as f64;
    let mut edges: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
    edges.push(stop);
    edges
}

/// Histogram over the finite present values with `bins` equal-width bins.
///
/// The range is `[min, max]`, widened by 0.5 on each side for a constant
/// column and `[0, 1]` when there are no values. Every bin is half-open except
/// the last, which includes `max`.
pub fn histogram(values: &[Option<f64>], bins: usize, precision: u32) -> Histogram {
    let bins = bins.max(1);
    let data: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();

    let (mut first, mut last) = data
        .iter()
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0.0, 1.0));
    if first == last {
        first -= 0.5;
        last += 0.5;
    }

    let edges = linspace(first, last, bins);
    let norm = bins as f64 / (last - first);
    let mut counts = vec![0usize; bins];

    for &v in &data {
        let mut idx = (((v - first) * norm) as usize).min(bins - 1);
        // float error in the scaled index can land one bin off
        if idx > 0 && v < edges[idx] {
            idx -= 1;
        } else if idx + 1 < bins && v >= edges[idx + 1] {
            idx += 1;
        }
        counts[idx] += 1;
    }

    Histogram {
        bin_edges: edges.into_iter().map(|e| round_to(e, precision)).collect(),
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_histogram() {
        let values: Vec<Option<f64>> = (0..=10).map(|i| Some(i as f64)).collect();
        let h = histogram(&values, 10, 4);

        assert_eq!(h.bin_edges.len(), 11);
        assert_eq!(h.bin_edges[0], 0.0);
        assert_eq!(h.bin_edges[10], 10.0);
        // last bin is closed on the right
        assert_eq!(h.counts, vec![1, 1, 1, 1, 1, 1, 1, 1, 1, 2]);
    }

    #[test]
    fn test_missing_values_ignored() {
        let h = histogram(&[Some(1.0), None, Some(2.0), Some(f64::INFINITY)], 10, 4);
        assert_eq!(h.total(), 2);
    }

    #[test]
    fn test_constant_column() {
        let h = histogram(&[Some(3.0), Some(3.0)], 10, 4);
        assert_eq!(h.bin_edges[0], 2.5);
        assert_eq!(h.bin_edges[10], 3.5);
        assert_eq!(h.counts[5], 2);
        assert_eq!(h.total(), 2);
    }

    #[test]
    fn test_empty_column() {
        let h = histogram(&[None, None], 10, 4);
        assert_eq!(h.bin_edges[0], 0.0);
        assert_eq!(h.bin_edges[1], 0.1);
        assert_eq!(h.bin_edges[10], 1.0);
        assert_eq!(h.counts, vec![0; 10]);
    }

    #[test]
    fn test_edges_rounded() {
        let h = histogram(&[Some(0.0), Some(1.0)], 3, 4);
        assert_eq!(h.bin_edges, vec![0.0, 0.3333, 0.6667, 1.0]);
    }
}
