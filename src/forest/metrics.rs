//! Classification metrics.

use serde::{Deserialize, Serialize};

/// Precision, recall and F1 of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScore {
    pub class: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true samples of this class
    pub support: usize,
}

/// Fraction of predictions equal to the truth.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    hits as f64 / y_true.len() as f64
}

/// Per-class scores. Undefined ratios (no predictions, no support) are 0.
pub fn class_scores(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Vec<ClassScore> {
    let mut true_pos = vec![0usize; n_classes];
    let mut predicted = vec![0usize; n_classes];
    let mut support = vec![0usize; n_classes];

    for (&t, &p) in y_true.iter().zip(y_pred) {
        support[t] += 1;
        predicted[p] += 1;
        if t == p {
            true_pos[t] += 1;
        }
    }

    (0..n_classes)
        .map(|class| {
            let precision = ratio(true_pos[class], predicted[class]);
            let recall = ratio(true_pos[class], support[class]);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassScore {
                class,
                precision,
                recall,
                f1,
                support: support[class],
            }
        })
        .collect()
}

/// F1 averaged over classes, weighted by support.
pub fn weighted_f1(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let total = y_true.len() as f64;
    class_scores(y_true, y_pred, n_classes)
        .iter()
        .map(|s| s.f1 * s.support as f64 / total)
        .sum()
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
