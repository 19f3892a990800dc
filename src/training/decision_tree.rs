//! Second-order regression tree used as the boosting base learner
//!
//! The tree is grown on per-row gradients and hessians of the boosting loss:
//! - leaf weight: `w = -G / (H + lambda)`
//! - split gain: `GL²/(HL+λ) + GR²/(HR+λ) - G²/(H+λ)`
//!
//! Rows whose split feature is `NaN` always follow the right branch, both while
//! growing and at prediction time.

use crate::error::{Result, TabularError};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const MIN_GAIN: f64 = 1e-12;

/// Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with output weight
    Leaf { value: f64, n_samples: usize },
    /// Internal node; `value <= threshold` goes left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        gain: f64,
    },
}

impl TreeNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// Gradient statistics of one training row
#[derive(Debug, Clone, Copy)]
struct GradPair {
    grad: f64,
    hess: f64,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Regression tree fitted to gradient/hessian pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RegressionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: 6,
            min_samples_leaf: 1,
            reg_lambda: 1.0,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set L2 regularization
    pub fn with_reg_lambda(mut self, lambda: f64) -> Self {
        self.reg_lambda = lambda.max(0.0);
        self
    }

    /// Grow the tree on `rows` of `x`, considering only `features`.
    ///
    /// `grad` and `hess` are indexed by row of `x`. Feature indices in the
    /// fitted tree refer to columns of `x`.
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        grad: &[f64],
        hess: &[f64],
        rows: &[usize],
        features: &[usize],
    ) -> Result<&mut Self> {
        if grad.len() != x.nrows() || hess.len() != x.nrows() {
            return Err(TabularError::ShapeError {
                expected: format!("{} gradients and hessians", x.nrows()),
                actual: format!("{} gradients, {} hessians", grad.len(), hess.len()),
            });
        }
        if rows.is_empty() {
            return Err(TabularError::TrainingError(
                "cannot grow a tree on zero rows".to_string(),
            ));
        }

        let pairs: Vec<GradPair> = grad
            .iter()
            .zip(hess)
            .map(|(&g, &h)| GradPair { grad: g, hess: h })
            .collect();

        self.n_features = x.ncols();
        let mut importances = vec![0.0; self.n_features];
        self.root = Some(self.build(x, &pairs, rows, features, 0, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.reg_lambda;
        if denom <= 0.0 {
            0.0
        } else {
            -g / denom
        }
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.reg_lambda;
        if denom <= 0.0 {
            0.0
        } else {
            g * g / denom
        }
    }

    fn build(
        &self,
        x: &Array2<f64>,
        pairs: &[GradPair],
        rows: &[usize],
        features: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = rows.len();
        let g: f64 = rows.iter().map(|&i| pairs[i].grad).sum();
        let h: f64 = rows.iter().map(|&i| pairs[i].hess).sum();
        let leaf = TreeNode::Leaf {
            value: self.leaf_weight(g, h),
            n_samples,
        };

        if depth >= self.max_depth || n_samples < 2 * self.min_samples_leaf {
            return leaf;
        }

        let Some(best) = self.find_best_split(x, pairs, rows, features, g, h) else {
            return leaf;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&i| x[[i, best.feature_idx]] <= best.threshold);
        if left_rows.is_empty() || right_rows.is_empty() {
            return leaf;
        }

        importances[best.feature_idx] += best.gain;

        let left = Box::new(self.build(x, pairs, &left_rows, features, depth + 1, importances));
        let right = Box::new(self.build(x, pairs, &right_rows, features, depth + 1, importances));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            gain: best.gain,
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        pairs: &[GradPair],
        rows: &[usize],
        features: &[usize],
        g_total: f64,
        h_total: f64,
    ) -> Option<SplitCandidate> {
        let parent_score = self.score(g_total, h_total);

        // Each feature finds its own best split; results keep feature order
        let per_feature: Vec<Option<SplitCandidate>> = features
            .par_iter()
            .map(|&feature_idx| {
                let mut present: Vec<(f64, GradPair)> = rows
                    .iter()
                    .map(|&i| (x[[i, feature_idx]], pairs[i]))
                    .filter(|(v, _)| !v.is_nan())
                    .collect();
                present.sort_by(|a, b| a.0.total_cmp(&b.0));

                // rows with NaN stay on the right of every threshold
                let n_missing = rows.len() - present.len();

                let mut g_left = 0.0;
                let mut h_left = 0.0;
                let mut best: Option<SplitCandidate> = None;

                for pos in 0..present.len().saturating_sub(1) {
                    let (value, pair) = present[pos];
                    g_left += pair.grad;
                    h_left += pair.hess;

                    let next = present[pos + 1].0;
                    if next <= value {
                        continue;
                    }

                    let n_left = pos + 1;
                    let n_right = present.len() - n_left + n_missing;
                    if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                        continue;
                    }

                    let gain = self.score(g_left, h_left)
                        + self.score(g_total - g_left, h_total - h_left)
                        - parent_score;

                    if gain > MIN_GAIN && best.map_or(true, |b| gain > b.gain) {
                        let mid = value + (next - value) / 2.0;
                        best = Some(SplitCandidate {
                            feature_idx,
                            threshold: if mid < next { mid } else { value },
                            gain,
                        });
                    }
                }

                best
            })
            .collect();

        // Ties go to the earliest feature
        per_feature
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<SplitCandidate>, cand| match acc {
                Some(best) if best.gain >= cand.gain => Some(best),
                _ => Some(cand),
            })
    }

    /// Predict every row of `x`
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(TabularError::ModelNotFitted)?;
        self.check_width(x)?;
        Ok(x.rows().into_iter().map(|row| root.predict(row)).collect())
    }

    /// Predict one row; an unfitted tree contributes zero
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.root.as_ref().map_or(0.0, |root| root.predict(row))
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(TabularError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Get feature importances (normalized total gain)
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::n_leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Squared-error gradients at a zero prediction
    fn squared_error(y: &[f64]) -> (Vec<f64>, Vec<f64>) {
        (y.iter().map(|v| -v).collect(), vec![1.0; y.len()])
    }

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (g, h) = squared_error(&y);

        let mut tree = RegressionTree::new().with_reg_lambda(0.0);
        tree.fit(&x, &g, &h, &[0, 1, 2, 3, 4], &[0]).unwrap();

        let predictions = tree.predict(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 1e-9, "MSE too high: {}", mse);
    }

    #[test]
    fn test_leaf_weight_regularized() {
        let x = array![[1.0], [1.0]];
        let (g, h) = squared_error(&[2.0, 4.0]);

        let mut tree = RegressionTree::new().with_reg_lambda(1.0);
        tree.fit(&x, &g, &h, &[0, 1], &[0]).unwrap();

        // constant feature: single leaf with 6 / (2 + 1)
        assert_eq!(tree.get_n_leaves(), 1);
        assert_eq!(tree.predict_row(x.row(0)), 2.0);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let (g, h) = squared_error(&[0.0, 1.0, 2.0, 3.0]);

        let mut tree = RegressionTree::new().with_max_depth(1);
        tree.fit(&x, &g, &h, &[0, 1, 2, 3], &[0, 1]).unwrap();

        assert!(tree.get_depth() <= 2);
        assert!(tree.get_n_leaves() <= 2);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let (g, h) = squared_error(&[0.0, 0.0, 1.0, 1.0]);

        let mut tree = RegressionTree::new();
        tree.fit(&x, &g, &h, &[0, 1, 2, 3], &[0, 1]).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_nan_goes_right() {
        let x = array![[1.0], [2.0], [f64::NAN], [10.0]];
        let (g, h) = squared_error(&[0.0, 0.0, 5.0, 5.0]);

        let mut tree = RegressionTree::new().with_reg_lambda(0.0);
        tree.fit(&x, &g, &h, &[0, 1, 2, 3], &[0]).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions[2], predictions[3]);
        assert!(predictions[2] > predictions[0]);
    }

    #[test]
    fn test_unfitted_and_width_checks() {
        let tree = RegressionTree::new();
        assert!(matches!(
            tree.predict(&array![[1.0]]),
            Err(TabularError::ModelNotFitted)
        ));

        let mut tree = RegressionTree::new();
        let (g, h) = squared_error(&[1.0, 2.0]);
        tree.fit(&array![[1.0], [2.0]], &g, &h, &[0, 1], &[0]).unwrap();
        assert!(tree.predict(&array![[1.0, 2.0]]).is_err());
    }
}
