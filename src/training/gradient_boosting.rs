//! Gradient Boosting implementation
//!
//! Gradient boosted regression trees for squared error (regression) and
//! log-loss (binary and multiclass classification). Every round fits trees on
//! a row and column subsample, then updates the raw scores of all rows.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::decision_tree::RegressionTree;
use super::models::Model;
use crate::error::{Result, TabularError};

const PROB_EPS: f64 = 1e-15;
const MIN_HESS: f64 = 1e-16;

/// Gradient Boosting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Subsample ratio for each tree
    pub subsample: f64,
    /// Column subsample ratio
    pub colsample_bytree: f64,
    /// L2 regularization
    pub reg_lambda: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            min_samples_leaf: 1,
            subsample: 0.8,
            colsample_bytree: 0.8,
            reg_lambda: 1.0,
            random_state: Some(42),
        }
    }
}

impl GradientBoostingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(TabularError::ConfigError(
                "n_estimators must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(TabularError::ConfigError(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        for (name, ratio) in [("subsample", self.subsample), ("colsample_bytree", self.colsample_bytree)] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(TabularError::ConfigError(format!(
                    "{} must be in (0, 1], got {}",
                    name, ratio
                )));
            }
        }
        if self.reg_lambda < 0.0 {
            return Err(TabularError::ConfigError(
                "reg_lambda must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    fn rng(&self) -> Xoshiro256PlusPlus {
        match self.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        }
    }

    fn new_tree(&self) -> RegressionTree {
        RegressionTree::new()
            .with_max_depth(self.max_depth)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_reg_lambda(self.reg_lambda)
    }

    fn sample_indices(&self, n: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let sample_size = (((n as f64) * ratio).ceil() as usize).clamp(1, n.max(1));
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size);
        indices.sort_unstable();
        indices
    }
}

fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(TabularError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(TabularError::TrainingError(
            "cannot fit on an empty dataset".to_string(),
        ));
    }
    Ok(())
}

fn accumulate_importances(total: &mut [f64], tree: &RegressionTree) {
    if let Some(imp) = tree.feature_importances() {
        for (acc, &v) in total.iter_mut().zip(imp.iter()) {
            *acc += v;
        }
    }
}

fn normalize(importances: &mut [f64]) {
    let total: f64 = importances.iter().sum();
    if total > 0.0 {
        for imp in importances.iter_mut() {
            *imp /= total;
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(scores: ArrayView1<f64>) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Gradient Boosting Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
    trees: Vec<RegressionTree>,
    initial_prediction: f64,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_prediction: 0.0,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}

impl Model for GradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();

        self.trees.clear();
        self.n_features = n_features;
        self.initial_prediction = y.mean().unwrap_or(0.0);
        self.feature_importances = vec![0.0; n_features];

        let mut predictions = Array1::from_elem(n_samples, self.initial_prediction);
        let mut rng = self.config.rng();
        let hess = vec![1.0; n_samples];

        for round in 0..self.config.n_estimators {
            // squared error: gradient is the negative residual
            let grad: Vec<f64> = predictions.iter().zip(y.iter()).map(|(p, t)| p - t).collect();

            let rows = self.config.sample_indices(n_samples, self.config.subsample, &mut rng);
            let cols = self.config.sample_indices(n_features, self.config.colsample_bytree, &mut rng);

            let mut tree = self.config.new_tree();
            tree.fit(x, &grad, &hess, &rows, &cols)?;

            for (i, row) in x.rows().into_iter().enumerate() {
                predictions[i] += self.config.learning_rate * tree.predict_row(row);
            }

            accumulate_importances(&mut self.feature_importances, &tree);
            self.trees.push(tree);

            if round % 25 == 0 {
                let mse = predictions
                    .iter()
                    .zip(y.iter())
                    .map(|(p, t)| (p - t).powi(2))
                    .sum::<f64>()
                    / n_samples as f64;
                debug!(round, train_mse = mse, "Boosting round");
            }
        }

        normalize(&mut self.feature_importances);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(TabularError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(TabularError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                self.initial_prediction
                    + self
                        .trees
                        .iter()
                        .map(|t| self.config.learning_rate * t.predict_row(row))
                        .sum::<f64>()
            })
            .collect())
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.is_fitted()
            .then(|| Array1::from_vec(self.feature_importances.clone()))
    }
}

/// Gradient Boosting Classifier
///
/// Targets are class indices `0..n_classes`. Two classes use a single logit;
/// three or more fit one tree per class per round on the softmax gradients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    /// `trees[round][output]`
    trees: Vec<Vec<RegressionTree>>,
    initial_scores: Vec<f64>,
    n_classes: usize,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_scores: Vec::new(),
            n_classes: 0,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    /// Fix the number of classes instead of inferring it from the targets
    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    fn n_outputs(&self) -> usize {
        if self.n_classes <= 2 {
            1
        } else {
            self.n_classes
        }
    }

    fn raw_scores(&self, x: &Array2<f64>) -> Array2<f64> {
        let k = self.n_outputs();
        let mut scores = Array2::zeros((x.nrows(), k));
        for (i, row) in x.rows().into_iter().enumerate() {
            for c in 0..k {
                scores[[i, c]] = self.initial_scores[c]
                    + self
                        .trees
                        .iter()
                        .map(|round| self.config.learning_rate * round[c].predict_row(row))
                        .sum::<f64>();
            }
        }
        scores
    }

    /// Class probabilities, one column per class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(TabularError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(TabularError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let scores = self.raw_scores(x);
        let n_cols = self.n_classes.max(2);
        let mut proba = Array2::zeros((x.nrows(), n_cols));
        for (i, row) in scores.rows().into_iter().enumerate() {
            if self.n_outputs() == 1 {
                let p = sigmoid(row[0]);
                proba[[i, 0]] = 1.0 - p;
                proba[[i, 1]] = p;
            } else {
                for (c, p) in softmax(row).into_iter().enumerate() {
                    proba[[i, c]] = p;
                }
            }
        }
        Ok(proba)
    }

    fn fit_binary(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let mut rng = self.config.rng();

        let p = y.mean().unwrap_or(0.5).clamp(PROB_EPS, 1.0 - PROB_EPS);
        self.initial_scores = vec![(p / (1.0 - p)).ln()];
        let mut log_odds = Array1::from_elem(n_samples, self.initial_scores[0]);

        for _ in 0..self.config.n_estimators {
            let probs: Vec<f64> = log_odds.iter().map(|&lo| sigmoid(lo)).collect();
            let grad: Vec<f64> = probs.iter().zip(y.iter()).map(|(p, t)| p - t).collect();
            let hess: Vec<f64> = probs.iter().map(|p| (p * (1.0 - p)).max(MIN_HESS)).collect();

            let rows = self.config.sample_indices(n_samples, self.config.subsample, &mut rng);
            let cols = self.config.sample_indices(n_features, self.config.colsample_bytree, &mut rng);

            let mut tree = self.config.new_tree();
            tree.fit(x, &grad, &hess, &rows, &cols)?;
            for (i, row) in x.rows().into_iter().enumerate() {
                log_odds[i] += self.config.learning_rate * tree.predict_row(row);
            }

            accumulate_importances(&mut self.feature_importances, &tree);
            self.trees.push(vec![tree]);
        }
        Ok(())
    }

    fn fit_multiclass(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let k = self.n_classes;
        let mut rng = self.config.rng();

        let mut counts = vec![0usize; k];
        for &label in y.iter() {
            counts[label as usize] += 1;
        }
        self.initial_scores = counts
            .iter()
            .map(|&c| ((c as f64 / n_samples as f64).max(PROB_EPS)).ln())
            .collect();

        let mut scores = Array2::zeros((n_samples, k));
        for mut row in scores.rows_mut() {
            row.assign(&Array1::from_vec(self.initial_scores.clone()));
        }

        for _ in 0..self.config.n_estimators {
            let probs: Vec<Vec<f64>> = scores.rows().into_iter().map(softmax).collect();

            let rows = self.config.sample_indices(n_samples, self.config.subsample, &mut rng);
            let cols = self.config.sample_indices(n_features, self.config.colsample_bytree, &mut rng);

            let mut round = Vec::with_capacity(k);
            for c in 0..k {
                let grad: Vec<f64> = (0..n_samples)
                    .map(|i| probs[i][c] - if y[i] as usize == c { 1.0 } else { 0.0 })
                    .collect();
                let hess: Vec<f64> = (0..n_samples)
                    .map(|i| (probs[i][c] * (1.0 - probs[i][c])).max(MIN_HESS))
                    .collect();

                let mut tree = self.config.new_tree();
                tree.fit(x, &grad, &hess, &rows, &cols)?;
                accumulate_importances(&mut self.feature_importances, &tree);
                round.push(tree);
            }

            for (i, row) in x.rows().into_iter().enumerate() {
                for (c, tree) in round.iter().enumerate() {
                    scores[[i, c]] += self.config.learning_rate * tree.predict_row(row);
                }
            }
            self.trees.push(round);
        }
        Ok(())
    }
}

impl Model for GradientBoostingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.config.validate()?;

        if let Some(bad) = y.iter().find(|v| v.fract() != 0.0 || **v < 0.0) {
            return Err(TabularError::TrainingError(format!(
                "class targets must be non-negative indices, got {}",
                bad
            )));
        }
        let max_label = y.iter().fold(0.0f64, |m, &v| m.max(v)) as usize;
        if self.n_classes == 0 {
            self.n_classes = max_label + 1;
        } else if max_label >= self.n_classes {
            return Err(TabularError::TrainingError(format!(
                "class index {} out of range for {} classes",
                max_label, self.n_classes
            )));
        }

        self.trees.clear();
        self.n_features = x.ncols();
        self.feature_importances = vec![0.0; x.ncols()];

        if self.n_outputs() == 1 {
            self.fit_binary(x, y)?;
        } else {
            self.fit_multiclass(x, y)?;
        }

        normalize(&mut self.feature_importances);
        debug!(
            classes = self.n_classes,
            rounds = self.trees.len(),
            "Fitted boosting classifier"
        );
        Ok(())
    }

    /// Predict class indices; ties go to the lowest index
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .axis_iter(Axis(0))
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0usize, f64::NEG_INFINITY), |best, (c, &p)| {
                        if p > best.1 {
                            (c, p)
                        } else {
                            best
                        }
                    })
                    .0 as f64
            })
            .collect())
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.is_fitted()
            .then(|| Array1::from_vec(self.feature_importances.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_regression_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((100, 2), (0..200).map(|i| i as f64 * 0.1).collect()).unwrap();

        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|row| row[0] * 2.0 + row[1] * 0.5 + 1.0)
            .collect();

        (x, y)
    }

    fn create_classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((100, 2), (0..200).map(|i| i as f64 * 0.1).collect()).unwrap();

        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|row| if row[0] + row[1] > 10.0 { 1.0 } else { 0.0 })
            .collect();

        (x, y)
    }

    fn accuracy(y: &Array1<f64>, pred: &Array1<f64>) -> f64 {
        let correct = y.iter().zip(pred.iter()).filter(|(a, b)| a == b).count();
        correct as f64 / y.len() as f64
    }

    #[test]
    fn test_gradient_boosting_regressor() {
        let (x, y) = create_regression_data();
        let config = GradientBoostingConfig {
            n_estimators: 20,
            max_depth: 3,
            ..Default::default()
        };

        let mut model = GradientBoostingRegressor::new(config);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions.len(), 100);

        let mse: f64 = y
            .iter()
            .zip(predictions.iter())
            .map(|(yi, pi)| (yi - pi).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        let y_var = y.var(0.0);
        assert!(mse < y_var, "MSE ({}) should be less than variance ({})", mse, y_var);
    }

    #[test]
    fn test_binary_classifier() {
        let (x, y) = create_classification_data();
        let config = GradientBoostingConfig {
            n_estimators: 10,
            max_depth: 3,
            ..Default::default()
        };

        let mut model = GradientBoostingClassifier::new(config);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.n_classes(), 2);

        let predictions = model.predict(&x).unwrap();
        assert!(accuracy(&y, &predictions) > 0.9);

        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.ncols(), 2);
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_multiclass_classifier() {
        let x = Array2::from_shape_vec((90, 1), (0..90).map(|i| i as f64).collect()).unwrap();
        let y: Array1<f64> = (0..90).map(|i| (i / 30) as f64).collect();

        let config = GradientBoostingConfig {
            n_estimators: 15,
            max_depth: 2,
            ..Default::default()
        };
        let mut model = GradientBoostingClassifier::new(config).with_n_classes(3);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        assert!(accuracy(&y, &predictions) > 0.9);
        assert_eq!(model.predict_proba(&x).unwrap().ncols(), 3);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let (x, y) = create_regression_data();
        let config = GradientBoostingConfig {
            n_estimators: 5,
            ..Default::default()
        };

        let mut a = GradientBoostingRegressor::new(config.clone());
        let mut b = GradientBoostingRegressor::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_feature_importances() {
        let (x, y) = create_regression_data();
        let config = GradientBoostingConfig {
            n_estimators: 10,
            ..Default::default()
        };

        let mut model = GradientBoostingRegressor::new(config);
        model.fit(&x, &y).unwrap();

        let importances = model.feature_importances();
        assert_eq!(importances.len(), 2);

        let sum: f64 = importances.iter().sum();
        assert!((sum - 1.0).abs() < 0.01, "Sum of importances ({}) should be ~1", sum);
    }

    #[test]
    fn test_invalid_config() {
        let config = GradientBoostingConfig {
            subsample: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let (x, y) = create_regression_data();
        let mut model = GradientBoostingRegressor::new(GradientBoostingConfig {
            n_estimators: 0,
            ..Default::default()
        });
        assert!(matches!(model.fit(&x, &y), Err(TabularError::ConfigError(_))));
    }

    #[test]
    fn test_unfitted_predict() {
        let model = GradientBoostingClassifier::new(GradientBoostingConfig::default());
        let x = Array2::zeros((1, 2));
        assert!(matches!(model.predict(&x), Err(TabularError::ModelNotFitted)));
    }
}
