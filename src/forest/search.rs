//! Cross-validated grid search over forest hyperparameters.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::ensemble::{ForestParams, RandomForest};
use super::metrics::weighted_f1;
use super::split::stratified_folds;

/// Candidate values for each hyperparameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 200],
            max_depth: vec![None, Some(10), Some(20)],
            min_samples_split: vec![2, 5],
        }
    }
}

impl ParamGrid {
    /// A grid holding exactly one combination.
    pub fn single(params: ForestParams) -> Self {
        Self {
            n_estimators: vec![params.n_estimators],
            max_depth: vec![params.max_depth],
            min_samples_split: vec![params.min_samples_split],
        }
    }

    /// Every combination, estimators varying slowest.
    pub fn candidates(&self) -> Vec<ForestParams> {
        let mut out = Vec::new();
        for &n_estimators in &self.n_estimators {
            for &max_depth in &self.max_depth {
                for &min_samples_split in &self.min_samples_split {
                    out.push(ForestParams {
                        n_estimators,
                        max_depth,
                        min_samples_split,
                    });
                }
            }
        }
        out
    }
}

/// Outcome of a grid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Best-scoring parameters
    pub best: ForestParams,
    /// Mean cross-validated weighted F1 of `best`
    pub best_score: f64,
    /// Mean score of every candidate, in grid order
    pub scores: Vec<(ForestParams, f64)>,
}

/// Score every grid candidate by mean weighted F1 over stratified folds.
///
/// Ties keep the earlier candidate.
pub fn grid_search(
    x: &[Vec<f64>],
    y: &[usize],
    n_classes: usize,
    grid: &ParamGrid,
    folds: usize,
    seed: u64,
) -> Result<SearchResult> {
    let candidates = grid.candidates();
    if candidates.is_empty() {
        return Err(Error::Other("parameter grid is empty".to_string()));
    }

    let splits: Vec<(Vec<usize>, Vec<usize>)> = stratified_folds(y, folds, seed)
        .into_iter()
        .map(|held_out| {
            let train: Vec<usize> = (0..y.len())
                .filter(|i| held_out.binary_search(i).is_err())
                .collect();
            (train, held_out)
        })
        .filter(|(train, _)| !train.is_empty())
        .collect();
    if splits.is_empty() {
        return Err(Error::InsufficientData(
            "too few samples for cross-validation".to_string(),
        ));
    }

    let mut scores = Vec::with_capacity(candidates.len());
    for params in candidates {
        let mut total = 0.0;
        for (train, held_out) in &splits {
            let x_train: Vec<Vec<f64>> = train.iter().map(|&i| x[i].clone()).collect();
            let y_train: Vec<usize> = train.iter().map(|&i| y[i]).collect();
            let forest = RandomForest::fit(&x_train, &y_train, n_classes, &params, seed)?;

            let y_true: Vec<usize> = held_out.iter().map(|&i| y[i]).collect();
            let y_pred: Vec<usize> = held_out.iter().map(|&i| forest.predict(&x[i])).collect();
            total += weighted_f1(&y_true, &y_pred, n_classes);
        }
        let score = total / splits.len() as f64;
        log::debug!("Grid candidate {}: weighted F1 {:.4}", params, score);
        scores.push((params, score));
    }

    let (best, best_score) = scores
        .iter()
        .copied()
        .fold(None, |best: Option<(ForestParams, f64)>, cand| match best {
            Some(b) if b.1 >= cand.1 => Some(b),
            _ => Some(cand),
        })
        .ok_or_else(|| Error::Other("no grid candidates scored".to_string()))?;

    Ok(SearchResult {
        best,
        best_score,
        scores,
    })
}
