//! Model capability trait, prediction values and evaluation metrics

use crate::error::Result;
use crate::utils::round_to;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Trait for ML models
pub trait Model: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Get feature importances (if available)
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}

/// One scalar prediction: a number for regression or numeric class labels,
/// the original text for text class labels
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prediction {
    Number(f64),
    Label(String),
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Number(v) => write!(f, "{}", v),
            Prediction::Label(s) => f.write_str(s),
        }
    }
}

/// Metrics for model evaluation on the held-out partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelMetrics {
    Regression { rmse: f64, r2: f64 },
    Classification { accuracy: f64, f1_score: f64 },
}

impl ModelMetrics {
    /// Compute regression metrics.
    ///
    /// R² of a constant `y_true` is 1.0 for a perfect fit and 0.0 otherwise.
    pub fn compute_regression(y_true: &[f64], y_pred: &[f64], precision: u32) -> Self {
        let n = y_true.len() as f64;
        let ss_res: f64 = y_true
            .iter()
            .zip(y_pred)
            .map(|(t, p)| (t - p).powi(2))
            .sum();
        let rmse = if n > 0.0 { (ss_res / n).sqrt() } else { 0.0 };

        let y_mean = y_true.iter().sum::<f64>() / n.max(1.0);
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        ModelMetrics::Regression {
            rmse: round_to(rmse, precision),
            r2: round_to(r2, precision),
        }
    }

    /// Compute accuracy and support-weighted F1
    pub fn compute_classification<T: Ord>(y_true: &[T], y_pred: &[T], precision: u32) -> Self {
        let n = y_true.len();
        let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
        let accuracy = if n > 0 { correct as f64 / n as f64 } else { 0.0 };

        // per label: (true positives, predicted count, support)
        let mut stats: BTreeMap<&T, (usize, usize, usize)> = BTreeMap::new();
        for (t, p) in y_true.iter().zip(y_pred) {
            stats.entry(t).or_default().2 += 1;
            stats.entry(p).or_default().1 += 1;
            if t == p {
                stats.entry(t).or_default().0 += 1;
            }
        }

        let weighted_f1: f64 = stats
            .values()
            .filter(|(_, _, support)| *support > 0)
            .map(|&(tp, predicted, support)| {
                let precision = if predicted > 0 { tp as f64 / predicted as f64 } else { 0.0 };
                let recall = tp as f64 / support as f64;
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                f1 * support as f64
            })
            .sum::<f64>()
            / n.max(1) as f64;

        ModelMetrics::Classification {
            accuracy: round_to(accuracy, precision),
            f1_score: round_to(weighted_f1, precision),
        }
    }

    /// Metric values by name
    pub fn values(&self) -> Vec<(&'static str, f64)> {
        match *self {
            ModelMetrics::Regression { rmse, r2 } => vec![("rmse", rmse), ("r2", r2)],
            ModelMetrics::Classification { accuracy, f1_score } => {
                vec![("accuracy", accuracy), ("f1_score", f1_score)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regression_metrics() {
        let y_true = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y_pred = [1.1, 2.0, 2.9, 4.1, 5.0];

        let metrics = ModelMetrics::compute_regression(&y_true, &y_pred, 4);
        match metrics {
            ModelMetrics::Regression { rmse, r2 } => {
                assert_eq!(rmse, 0.0775);
                assert_eq!(r2, 0.997);
            }
            other => panic!("unexpected metrics {:?}", other),
        }
    }

    #[test]
    fn test_constant_target_r2() {
        assert_eq!(
            ModelMetrics::compute_regression(&[3.0, 3.0], &[3.0, 3.0], 4),
            ModelMetrics::Regression { rmse: 0.0, r2: 1.0 }
        );
        assert_eq!(
            ModelMetrics::compute_regression(&[3.0, 3.0], &[2.0, 4.0], 4),
            ModelMetrics::Regression { rmse: 1.0, r2: 0.0 }
        );
    }

    #[test]
    fn test_classification_metrics() {
        let y_true = ["a", "a", "b", "b", "c", "c"];
        let y_pred = ["a", "b", "b", "b", "c", "a"];

        let metrics = ModelMetrics::compute_classification(&y_true, &y_pred, 4);
        // a: p=1/2 r=1/2 f1=0.5, b: p=2/3 r=1 f1=0.8, c: p=1 r=1/2 f1=2/3
        assert_eq!(
            metrics,
            ModelMetrics::Classification {
                accuracy: 0.6667,
                f1_score: 0.6556
            }
        );
    }

    #[test]
    fn test_metrics_serialize_flat() {
        let json = serde_json::to_string(&ModelMetrics::Classification {
            accuracy: 1.0,
            f1_score: 1.0,
        })
        .unwrap();
        assert_eq!(json, r#"{"accuracy":1.0,"f1_score":1.0}"#);
    }

    #[test]
    fn test_prediction_serialize() {
        let preds = vec![Prediction::Number(1.5), Prediction::Label("yes".into())];
        assert_eq!(serde_json::to_string(&preds).unwrap(), r#"[1.5,"yes"]"#);
    }
}
