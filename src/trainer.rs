//! Classifier training.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bundle::{LabelEncoder, ModelBundle};
use crate::corpus::CorpusRow;
use crate::error::{Error, Result};
use crate::features::{FeatureFrame, FeatureSchema, SpanFeatures};
use crate::forest::{self, ForestParams, ParamGrid, RandomForest};
use crate::model::Label;

/// Whether `body` rows take part in training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPolicy {
    /// Train on heading-like classes only; inference gates predictions with
    /// a heading heuristic and a confidence threshold.
    #[default]
    ExcludeBody,
    /// Keep `body` as a class so the forest can reject spans itself.
    RetainBody,
}

/// Options for training.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Fraction of samples held out for evaluation
    pub test_size: f64,
    /// Cross-validation folds used by the grid search
    pub folds: usize,
    /// Seed for splitting and for the forest
    pub seed: u64,
    /// Hyperparameter candidates
    pub grid: ParamGrid,
    /// Treatment of `body` rows
    pub body_policy: BodyPolicy,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            folds: 5,
            seed: 42,
            grid: ParamGrid::default(),
            body_policy: BodyPolicy::ExcludeBody,
        }
    }
}

impl TrainOptions {
    /// Create new train options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the held-out fraction.
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size.clamp(0.0, 0.9);
        self
    }

    /// Set the number of cross-validation folds.
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds.max(2);
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the hyperparameter grid.
    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Skip the search and train with fixed parameters.
    pub fn with_params(mut self, params: ForestParams) -> Self {
        self.grid = ParamGrid::single(params);
        self
    }

    /// Set the body policy.
    pub fn with_body_policy(mut self, policy: BodyPolicy) -> Self {
        self.body_policy = policy;
        self
    }
}

/// Scores of one class on the held-out set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Summary of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    /// Rows in the corpus
    pub corpus_rows: usize,
    /// Rows left after applying the body policy
    pub used_rows: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    /// Rows per class, in class order
    pub class_counts: Vec<(Label, usize)>,
    pub best_params: ForestParams,
    /// Mean cross-validated weighted F1 of the best parameters
    pub cv_weighted_f1: f64,
    /// `None` when the corpus was too small to hold anything out
    pub test_accuracy: Option<f64>,
    pub test_weighted_f1: Option<f64>,
    pub classes: Vec<ClassReport>,
}

impl fmt::Display for TrainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Samples: {} used of {} ({} train, {} test)",
            self.used_rows, self.corpus_rows, self.train_samples, self.test_samples
        )?;
        writeln!(f, "Best parameters: {}", self.best_params)?;
        writeln!(f, "Cross-validated weighted F1: {:.4}", self.cv_weighted_f1)?;

        match (self.test_accuracy, self.test_weighted_f1) {
            (Some(acc), Some(f1)) => {
                writeln!(f, "Test accuracy: {:.4}", acc)?;
                writeln!(f, "Test weighted F1: {:.4}", f1)?;
                writeln!(f)?;
                writeln!(
                    f,
                    "{:>8} {:>10} {:>10} {:>10} {:>8}",
                    "class", "precision", "recall", "f1", "support"
                )?;
                for class in &self.classes {
                    writeln!(
                        f,
                        "{:>8} {:>10.2} {:>10.2} {:>10.2} {:>8}",
                        class.label.as_str(),
                        class.precision,
                        class.recall,
                        class.f1,
                        class.support
                    )?;
                }
            }
            _ => writeln!(f, "No held-out samples")?,
        }
        Ok(())
    }
}

/// Fits a [`ModelBundle`] from a weak-labeled corpus.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    options: TrainOptions,
}

impl Trainer {
    /// Create a trainer.
    pub fn new(options: TrainOptions) -> Self {
        Self { options }
    }

    /// Options in effect.
    pub fn options(&self) -> &TrainOptions {
        &self.options
    }

    /// Train on corpus rows.
    ///
    /// Fails with [`Error::InsufficientData`] when, after the body policy,
    /// there are no rows or only one class.
    pub fn train(&self, rows: &[CorpusRow]) -> Result<(ModelBundle, TrainReport)> {
        let used: Vec<&CorpusRow> = rows
            .iter()
            .filter(|r| self.options.body_policy == BodyPolicy::RetainBody || r.label != Label::Body)
            .collect();
        if used.is_empty() {
            return Err(Error::InsufficientData(
                "the corpus contains no heading rows".to_string(),
            ));
        }

        let encoder = LabelEncoder::fit(used.iter().map(|r| r.label));
        if encoder.len() < 2 {
            return Err(Error::InsufficientData(format!(
                "need at least two classes, found only {}",
                encoder
                    .classes()
                    .first()
                    .map_or("none", |l| l.as_str())
            )));
        }

        // Always persist the full schema so alignments missing from this
        // corpus can still be encoded at inference time.
        let schema = FeatureSchema::canonical();
        let features: Vec<SpanFeatures> = used.iter().map(|r| r.features()).collect();
        let x = FeatureFrame::from_features(&features).conform(&schema)?;
        let y: Vec<usize> = used
            .iter()
            .map(|r| {
                encoder
                    .encode(r.label)
                    .ok_or_else(|| Error::Other(format!("label {} not encoded", r.label)))
            })
            .collect::<Result<_>>()?;

        let (train_idx, test_idx) =
            forest::stratified_split(&y, self.options.test_size, self.options.seed);
        let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| x[i].clone()).collect();
        let y_train: Vec<usize> = train_idx.iter().map(|&i| y[i]).collect();
        log::info!(
            "Training on {} samples, {} held out, {} classes",
            train_idx.len(),
            test_idx.len(),
            encoder.len()
        );

        let search = forest::grid_search(
            &x_train,
            &y_train,
            encoder.len(),
            &self.options.grid,
            self.options.folds,
            self.options.seed,
        )?;
        log::info!(
            "Best parameters: {} (weighted F1 {:.4})",
            search.best,
            search.best_score
        );

        let model = RandomForest::fit(
            &x_train,
            &y_train,
            encoder.len(),
            &search.best,
            self.options.seed,
        )?;

        let (test_accuracy, test_weighted_f1, classes) = if test_idx.is_empty() {
            log::warn!("Corpus too small to hold out a test set");
            (None, None, Vec::new())
        } else {
            let y_true: Vec<usize> = test_idx.iter().map(|&i| y[i]).collect();
            let y_pred: Vec<usize> = test_idx.iter().map(|&i| model.predict(&x[i])).collect();
            let classes = forest::class_scores(&y_true, &y_pred, encoder.len())
                .into_iter()
                .filter_map(|s| {
                    encoder.decode(s.class).map(|label| ClassReport {
                        label,
                        precision: s.precision,
                        recall: s.recall,
                        f1: s.f1,
                        support: s.support,
                    })
                })
                .collect();
            (
                Some(forest::accuracy(&y_true, &y_pred)),
                Some(forest::weighted_f1(&y_true, &y_pred, encoder.len())),
                classes,
            )
        };

        let class_counts = encoder
            .classes()
            .iter()
            .enumerate()
            .map(|(i, label)| (*label, y.iter().filter(|&&c| c == i).count()))
            .collect();

        let report = TrainReport {
            corpus_rows: rows.len(),
            used_rows: used.len(),
            train_samples: train_idx.len(),
            test_samples: test_idx.len(),
            class_counts,
            best_params: search.best,
            cv_weighted_f1: search.best_score,
            test_accuracy,
            test_weighted_f1,
            classes,
        };

        let bundle = ModelBundle::new(schema, encoder, model, self.options.body_policy)?;
        Ok((bundle, report))
    }
}
