//! Training engine implementation

use super::config::{ProblemType, TrainingConfig};
use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingRegressor};
use super::models::{Model, ModelMetrics, Prediction};
use crate::error::{Result, TabularError};
use crate::preprocessing::{encode_for_training, FeatureSchema, TargetVector};
use crate::table::Table;
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Progress of one training run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingStage {
    Created,
    Split,
    Fit,
    Evaluated,
}

impl fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrainingStage::Created => "created",
            TrainingStage::Split => "split",
            TrainingStage::Fit => "fit",
            TrainingStage::Evaluated => "evaluated",
        };
        f.write_str(name)
    }
}

/// A fitted model, one variant per problem type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    Regressor(GradientBoostingRegressor),
    Classifier {
        model: GradientBoostingClassifier,
        /// Original labels, indexed by class index
        classes: Vec<Prediction>,
    },
}

impl TrainedModel {
    pub fn problem_type(&self) -> ProblemType {
        match self {
            TrainedModel::Regressor(_) => ProblemType::Regression,
            TrainedModel::Classifier { .. } => ProblemType::Classification,
        }
    }

    /// Predict one value per row of an encoded feature matrix
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<Prediction>> {
        if x.nrows() == 0 {
            return Ok(Vec::new());
        }

        match self {
            TrainedModel::Regressor(model) => Ok(model
                .predict(x)?
                .into_iter()
                .map(Prediction::Number)
                .collect()),
            TrainedModel::Classifier { model, classes } => model
                .predict(x)?
                .iter()
                .map(|&idx| {
                    classes.get(idx as usize).cloned().ok_or_else(|| {
                        TabularError::TrainingError(format!("predicted unknown class index {}", idx))
                    })
                })
                .collect(),
        }
    }

    /// Class probabilities, for classifiers only
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        match self {
            TrainedModel::Regressor(_) => Ok(None),
            TrainedModel::Classifier { model, .. } => model.predict_proba(x).map(Some),
        }
    }

    pub fn classes(&self) -> Option<&[Prediction]> {
        match self {
            TrainedModel::Regressor(_) => None,
            TrainedModel::Classifier { classes, .. } => Some(classes),
        }
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        match self {
            TrainedModel::Regressor(model) => Model::feature_importances(model),
            TrainedModel::Classifier { model, .. } => Model::feature_importances(model),
        }
    }
}

/// Everything one training run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub metrics: ModelMetrics,
    pub schema: FeatureSchema,
}

/// Class labels sorted and deduplicated, plus each row's class index
fn label_classes(target: &TargetVector) -> (Vec<Prediction>, Vec<usize>) {
    match target {
        TargetVector::Numeric(values) => {
            let mut classes = values.clone();
            classes.sort_by(|a, b| a.total_cmp(b));
            classes.dedup();
            let idx = values
                .iter()
                .map(|v| classes.partition_point(|c| c.total_cmp(v).is_lt()))
                .collect();
            (classes.into_iter().map(Prediction::Number).collect(), idx)
        }
        TargetVector::Labels(values) => {
            let mut classes = values.clone();
            classes.sort();
            classes.dedup();
            let idx = values
                .iter()
                .map(|v| classes.partition_point(|c| c < v))
                .collect();
            (classes.into_iter().map(Prediction::Label).collect(), idx)
        }
    }
}

fn regression_target(target: &TargetVector, target_column: &str) -> Result<Vec<f64>> {
    match target {
        TargetVector::Numeric(values) => Ok(values.clone()),
        TargetVector::Labels(values) => values
            .iter()
            .map(|v| {
                v.trim().parse::<f64>().map_err(|_| {
                    TabularError::DataError(format!(
                        "target column '{}' has non-numeric value '{}'",
                        target_column, v
                    ))
                })
            })
            .collect(),
    }
}

/// Main training engine
#[derive(Debug, Clone, Default)]
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Seeded shuffle split; the first `ceil(n * test_size)` shuffled rows are
    /// the test partition
    pub fn split_indices(&self, n: usize) -> Result<(Vec<usize>, Vec<usize>)> {
        let n_test = (n as f64 * self.config.test_size).ceil() as usize;
        if n < 2 || n_test == 0 || n_test >= n {
            return Err(TabularError::TrainingError(format!(
                "need at least one training and one test row, dataset has {} usable rows",
                n
            )));
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut permutation: Vec<usize> = (0..n).collect();
        permutation.shuffle(&mut rng);

        let train = permutation.split_off(n_test);
        Ok((train, permutation))
    }

    /// Encode, split, fit and evaluate.
    ///
    /// Nothing is returned unless every stage succeeds.
    pub fn train(
        &self,
        table: &Table,
        target_column: &str,
        problem_type: ProblemType,
    ) -> Result<TrainingOutcome> {
        let start = Instant::now();
        self.config.validate()?;

        let mut stage = TrainingStage::Created;
        info!(%stage, target = target_column, %problem_type, rows = table.height(), "Training started");

        let encoded = encode_for_training(table, target_column)?;
        let x = encoded.features;

        stage = TrainingStage::Split;
        let (train_idx, test_idx) = self
            .split_indices(x.nrows())
            .map_err(|e| at_stage(stage, e))?;
        let x_train = x.select(Axis(0), &train_idx);
        let x_test = x.select(Axis(0), &test_idx);
        info!(%stage, train_rows = train_idx.len(), test_rows = test_idx.len(), "Split dataset");

        let precision = self.config.metric_precision;
        let boosting = self.config.seeded_boosting();

        let (model, metrics) = match problem_type {
            ProblemType::Regression => {
                let y = regression_target(&encoded.target, target_column)?;
                let y_train: Array1<f64> = train_idx.iter().map(|&i| y[i]).collect();
                let y_test: Vec<f64> = test_idx.iter().map(|&i| y[i]).collect();

                stage = TrainingStage::Fit;
                let mut model = GradientBoostingRegressor::new(boosting);
                model.fit(&x_train, &y_train).map_err(|e| at_stage(stage, e))?;
                debug!(%stage, trees = model.n_trees(), "Fitted regressor");

                let y_pred = model.predict(&x_test).map_err(|e| at_stage(stage, e))?;
                let metrics = ModelMetrics::compute_regression(&y_test, &y_pred.to_vec(), precision);
                (TrainedModel::Regressor(model), metrics)
            }
            ProblemType::Classification => {
                let (classes, y) = label_classes(&encoded.target);
                if classes.len() < 2 {
                    return Err(TabularError::DataError(format!(
                        "target column '{}' needs at least two classes, found {}",
                        target_column,
                        classes.len()
                    )));
                }
                let y_train: Array1<f64> = train_idx.iter().map(|&i| y[i] as f64).collect();
                let y_test: Vec<usize> = test_idx.iter().map(|&i| y[i]).collect();

                stage = TrainingStage::Fit;
                let mut model = GradientBoostingClassifier::new(boosting).with_n_classes(classes.len());
                model.fit(&x_train, &y_train).map_err(|e| at_stage(stage, e))?;
                debug!(%stage, classes = classes.len(), "Fitted classifier");

                let y_pred: Vec<usize> = model
                    .predict(&x_test)
                    .map_err(|e| at_stage(stage, e))?
                    .iter()
                    .map(|&p| p as usize)
                    .collect();
                let metrics = ModelMetrics::compute_classification(&y_test, &y_pred, precision);
                (TrainedModel::Classifier { model, classes }, metrics)
            }
        };

        stage = TrainingStage::Evaluated;
        info!(
            %stage,
            ?metrics,
            features = encoded.schema.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Training finished"
        );

        Ok(TrainingOutcome {
            model,
            metrics,
            schema: encoded.schema,
        })
    }
}

fn at_stage(stage: TrainingStage, err: TabularError) -> TabularError {
    TabularError::TrainingError(format!("{} stage failed: {}", stage, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn regression_table(n: usize) -> Table {
        let x: Vec<Option<f64>> = (0..n).map(|i| Some(i as f64)).collect();
        let color: Vec<Option<&str>> = (0..n).map(|i| Some(if i % 2 == 0 { "red" } else { "blue" })).collect();
        let y: Vec<Option<f64>> = (0..n)
            .map(|i| Some(3.0 * i as f64 + if i % 2 == 0 { 10.0 } else { 0.0 }))
            .collect();
        Table::new(vec![
            Column::numeric("x", x),
            Column::categorical("color", color),
            Column::numeric("y", y),
        ])
        .unwrap()
    }

    fn small_config() -> TrainingConfig {
        TrainingConfig::new().with_n_estimators(30).with_max_depth(3)
    }

    #[test]
    fn test_split_sizes_and_seed() {
        let engine = TrainEngine::default();
        let (train, test) = engine.split_indices(10).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);

        let (train2, test2) = engine.split_indices(10).unwrap();
        assert_eq!(train, train2);
        assert_eq!(test, test2);

        let (_, test) = engine.split_indices(11).unwrap();
        assert_eq!(test.len(), 3);

        assert!(engine.split_indices(1).is_err());
    }

    #[test]
    fn test_train_regression() {
        let engine = TrainEngine::new(small_config());
        let outcome = engine
            .train(&regression_table(60), "y", ProblemType::Regression)
            .unwrap();

        assert_eq!(outcome.schema.columns(), &["x", "color_blue", "color_red"]);
        assert_eq!(outcome.model.problem_type(), ProblemType::Regression);
        match outcome.metrics {
            ModelMetrics::Regression { rmse, r2 } => {
                assert!(rmse >= 0.0);
                assert!(r2 <= 1.0);
                assert!(r2 > 0.5, "r2 = {}", r2);
            }
            other => panic!("unexpected metrics {:?}", other),
        }
    }

    #[test]
    fn test_train_classification_keeps_labels() {
        let n = 40;
        let table = Table::new(vec![
            Column::numeric("score", (0..n).map(|i| Some(i as f64))),
            Column::categorical(
                "label",
                (0..n).map(|i| Some(if i < 20 { "low" } else { "high" })),
            ),
        ])
        .unwrap();

        let outcome = TrainEngine::new(small_config())
            .train(&table, "label", ProblemType::Classification)
            .unwrap();

        assert_eq!(
            outcome.model.classes().unwrap(),
            &[Prediction::Label("high".into()), Prediction::Label("low".into())]
        );
        match outcome.metrics {
            ModelMetrics::Classification { accuracy, f1_score } => {
                assert!((0.0..=1.0).contains(&accuracy));
                assert!((0.0..=1.0).contains(&f1_score));
            }
            other => panic!("unexpected metrics {:?}", other),
        }

        let x = ndarray::array![[0.0], [39.0]];
        let preds = outcome.model.predict(&x).unwrap();
        assert_eq!(preds, vec![Prediction::Label("low".into()), Prediction::Label("high".into())]);
    }

    #[test]
    fn test_deterministic_training() {
        let engine = TrainEngine::new(small_config());
        let table = regression_table(40);
        let a = engine.train(&table, "y", ProblemType::Regression).unwrap();
        let b = engine.train(&table, "y", ProblemType::Regression).unwrap();
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.schema, b.schema);
    }

    #[test]
    fn test_missing_target() {
        let result = TrainEngine::default().train(&regression_table(10), "price", ProblemType::Regression);
        assert!(matches!(result, Err(TabularError::TargetColumnMissing(_))));
    }

    #[test]
    fn test_text_target_for_regression() {
        let table = Table::new(vec![
            Column::numeric("x", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::categorical("y", vec![Some("a"), Some("b"), Some("c")]),
        ])
        .unwrap();
        let result = TrainEngine::default().train(&table, "y", ProblemType::Regression);
        assert!(matches!(result, Err(TabularError::DataError(_))));
    }

    #[test]
    fn test_too_few_rows() {
        let table = Table::new(vec![
            Column::numeric("x", vec![Some(1.0)]),
            Column::numeric("y", vec![Some(2.0)]),
        ])
        .unwrap();
        let result = TrainEngine::default().train(&table, "y", ProblemType::Regression);
        assert!(matches!(result, Err(TabularError::TrainingError(_))));
    }

    #[test]
    fn test_label_classes_numeric() {
        let (classes, idx) = label_classes(&TargetVector::Numeric(vec![3.0, 1.0, 3.0, 2.0]));
        assert_eq!(
            classes,
            vec![Prediction::Number(1.0), Prediction::Number(2.0), Prediction::Number(3.0)]
        );
        assert_eq!(idx, vec![2, 0, 2, 1]);
    }
}
