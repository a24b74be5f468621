//! Random forest of bootstrapped CART trees.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::tree::{DecisionTree, TreeParams};

/// Forest hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum tree depth; `None` is unbounded
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

impl std::fmt::Display for ForestParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let depth = self
            .max_depth
            .map_or_else(|| "none".to_string(), |d| d.to_string());
        write!(
            f,
            "n_estimators={}, max_depth={}, min_samples_split={}",
            self.n_estimators, depth, self.min_samples_split
        )
    }
}

/// A fitted random forest classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    n_classes: usize,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit a forest. Tree `i` draws its bootstrap sample and feature
    /// subsets from `seed + i`, so the result does not depend on how rayon
    /// schedules the trees.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
        params: &ForestParams,
        seed: u64,
    ) -> Result<Self> {
        if x.is_empty() {
            return Err(Error::InsufficientData("no training rows".to_string()));
        }
        if x.len() != y.len() {
            return Err(Error::Other(format!(
                "{} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
            return Err(Error::Other(format!(
                "label {} out of range for {} classes",
                bad, n_classes
            )));
        }

        let n_features = x[0].len();
        if x.iter().any(|row| row.len() != n_features) {
            return Err(Error::Other("feature rows differ in width".to_string()));
        }

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            max_features: Some(((n_features as f64).sqrt() as usize).max(1)),
        };
        let n = x.len();

        let trees: Vec<DecisionTree> = (0..params.n_estimators.max(1))
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                DecisionTree::fit(x, y, sample, n_classes, &tree_params, &mut rng)
            })
            .collect();

        log::debug!("Fitted {} trees ({})", trees.len(), params);

        Ok(Self {
            params: *params,
            n_classes,
            n_features,
            trees,
        })
    }

    /// Mean class probabilities over all trees.
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (sum, p) in proba.iter_mut().zip(tree.predict_proba(row)) {
                *sum += p;
            }
        }
        let count = self.trees.len().max(1) as f64;
        proba.iter_mut().for_each(|p| *p /= count);
        proba
    }

    /// Most probable class; ties go to the lower class index.
    pub fn predict(&self, row: &[f64]) -> usize {
        argmax(&self.predict_proba(row)).0
    }

    /// Predict a batch of rows.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Vec<usize> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Hyperparameters the forest was fitted with.
    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Number of output classes.
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of input features.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of trees.
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Structural consistency check for a deserialized forest.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if tree.n_classes() != self.n_classes || tree.n_features() != self.n_features {
                return Err(format!("tree {} does not match the forest shape", i));
            }
            tree.validate().map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }
}

/// Index and value of the largest entry (first on ties).
pub fn argmax(values: &[f64]) -> (usize, f64) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..30 {
            let jitter = (i % 5) as f64 * 0.1;
            x.push(vec![24.0 + jitter, 1.0, 300.0]);
            y.push(0);
            x.push(vec![16.0 + jitter, 1.0, 72.0]);
            y.push(1);
            x.push(vec![12.0 + jitter, 0.0, 72.0]);
            y.push(2);
        }
        (x, y)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_estimators: 15,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_fit_and_predict() {
        let (x, y) = blobs();
        let forest = RandomForest::fit(&x, &y, 3, &small_params(), 42).unwrap();

        assert_eq!(forest.tree_count(), 15);
        assert_eq!(forest.predict(&[24.2, 1.0, 300.0]), 0);
        assert_eq!(forest.predict(&[16.1, 1.0, 72.0]), 1);
        assert_eq!(forest.predict(&[12.0, 0.0, 72.0]), 2);

        let proba = forest.predict_proba(&[24.2, 1.0, 300.0]);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(forest.validate().is_ok());
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = blobs();
        let a = RandomForest::fit(&x, &y, 3, &small_params(), 9).unwrap();
        let b = RandomForest::fit(&x, &y, 3, &small_params(), 9).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_empty_and_bad_labels() {
        let err = RandomForest::fit(&[], &[], 2, &small_params(), 0).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));

        let err = RandomForest::fit(&[vec![1.0]], &[3], 2, &small_params(), 0).unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn test_argmax_ties_take_first() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]).0, 1);
        assert_eq!(argmax(&[]).0, 0);
    }
}
