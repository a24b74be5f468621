//! CART decision tree with Gini impurity.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Split thresholds closer than this are treated as equal values.
const VALUE_EPSILON: f64 = 1e-12;

/// Growth limits for one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth; `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum samples a node needs before it may be split
    pub min_samples_split: usize,
    /// Features sampled per split; `None` considers all of them
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

/// A tree node. Children are indices into the owning tree's node list,
/// which keeps the serialized form flat regardless of depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Leaf {
        /// Class probabilities
        proba: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted classification tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    n_classes: usize,
    n_features: usize,
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    /// Fit a tree on the rows of `x` selected by `samples` (repeats allowed,
    /// as produced by bootstrap sampling).
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        samples: Vec<usize>,
        n_classes: usize,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = x.first().map_or(0, |row| row.len());
        let mut tree = Self {
            n_classes,
            n_features,
            nodes: Vec::new(),
        };

        // (node slot, samples, depth)
        let mut pending = vec![(tree.reserve(), samples, 0usize)];

        while let Some((slot, samples, depth)) = pending.pop() {
            let counts = class_counts(y, &samples, n_classes);
            let can_split = samples.len() >= params.min_samples_split.max(2)
                && params.max_depth.map_or(true, |max| depth < max)
                && counts.iter().filter(|c| **c > 0).count() > 1;

            let split = if can_split {
                tree.best_split(x, y, &samples, &counts, params, rng)
            } else {
                None
            };

            match split {
                Some(split) => {
                    let (left, right): (Vec<usize>, Vec<usize>) = samples
                        .into_iter()
                        .partition(|&i| x[i][split.feature] <= split.threshold);
                    let left_slot = tree.reserve();
                    let right_slot = tree.reserve();
                    tree.nodes[slot] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left: left_slot,
                        right: right_slot,
                    };
                    pending.push((right_slot, right, depth + 1));
                    pending.push((left_slot, left, depth + 1));
                }
                None => {
                    tree.nodes[slot] = leaf(&counts, samples.len());
                }
            }
        }

        tree
    }

    fn reserve(&mut self) -> usize {
        self.nodes.push(Node::Leaf { proba: Vec::new() });
        self.nodes.len() - 1
    }

    /// Find the split with the lowest weighted Gini impurity.
    ///
    /// Features are visited in random order; after `max_features` of them
    /// the search stops as soon as some valid split has been seen.
    fn best_split(
        &self,
        x: &[Vec<f64>],
        y: &[usize],
        samples: &[usize],
        counts: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(rng);
        let budget = params.max_features.unwrap_or(self.n_features).max(1);

        let parent = gini(counts, samples.len());
        let mut best: Option<SplitCandidate> = None;
        let mut order = samples.to_vec();

        for (visited, &feature) in features.iter().enumerate() {
            if visited >= budget && best.is_some() {
                break;
            }

            order.sort_by(|a, b| x[*a][feature].total_cmp(&x[*b][feature]));
            let total = order.len();
            let mut left = vec![0usize; self.n_classes];
            let mut right = counts.to_vec();

            for pos in 0..total - 1 {
                let class = y[order[pos]];
                left[class] += 1;
                right[class] -= 1;

                let here = x[order[pos]][feature];
                let next = x[order[pos + 1]][feature];
                if next - here <= VALUE_EPSILON {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = total - n_left;
                let impurity = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / total as f64;

                if impurity < parent - VALUE_EPSILON
                    && best.as_ref().map_or(true, |b| impurity < b.impurity)
                {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        impurity,
                    });
                }
            }
        }

        best
    }

    /// Class probabilities for one feature row.
    pub fn predict_proba(&self, row: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { proba } => return proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Number of classes the tree predicts over.
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of input features.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((index, depth)) = stack.pop() {
            match &self.nodes[index] {
                Node::Leaf { .. } => deepest = deepest.max(depth),
                Node::Split { left, right, .. } => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
            }
        }
        deepest
    }

    /// Check node references and leaf widths after deserialization.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { proba } if proba.len() != self.n_classes => {
                    return Err(format!(
                        "leaf {} has {} classes, expected {}",
                        i,
                        proba.len(),
                        self.n_classes
                    ));
                }
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= self.n_features {
                        return Err(format!("node {} splits on missing feature {}", i, feature));
                    }
                    // Children always come after their parent, so this also rules out cycles.
                    let in_range = |child: usize| child > i && child < self.nodes.len();
                    if !in_range(*left) || !in_range(*right) {
                        return Err(format!("node {} has an invalid child", i));
                    }
                }
                Node::Leaf { .. } => {}
            }
        }
        Ok(())
    }
}

fn class_counts(y: &[usize], samples: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &i in samples {
        counts[y[i]] += 1;
    }
    counts
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn leaf(counts: &[usize], total: usize) -> Node {
    let proba = if total == 0 {
        vec![0.0; counts.len()]
    } else {
        counts.iter().map(|&c| c as f64 / total as f64).collect()
    };
    Node::Leaf { proba }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn fit_all(x: &[Vec<f64>], y: &[usize], n_classes: usize, params: TreeParams) -> DecisionTree {
        let mut rng = StdRng::seed_from_u64(7);
        DecisionTree::fit(x, y, (0..x.len()).collect(), n_classes, &params, &mut rng)
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
        assert_eq!(gini(&[0, 0], 0), 0.0);
    }

    #[test]
    fn test_separable_data() {
        let x = vec![
            vec![10.0, 0.0],
            vec![11.0, 1.0],
            vec![12.0, 0.0],
            vec![20.0, 1.0],
            vec![22.0, 0.0],
            vec![24.0, 1.0],
        ];
        let y = vec![0, 0, 0, 1, 1, 1];
        let tree = fit_all(&x, &y, 2, TreeParams::default());

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_proba(&[9.0, 1.0]), &[1.0, 0.0]);
        assert_eq!(tree.predict_proba(&[30.0, 0.0]), &[0.0, 1.0]);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let y = vec![0, 1, 0, 1, 0, 1, 0, 1];
        let deep = fit_all(&x, &y, 2, TreeParams::default());
        let shallow = fit_all(
            &x,
            &y,
            2,
            TreeParams {
                max_depth: Some(1),
                ..TreeParams::default()
            },
        );
        assert!(deep.depth() > 1);
        assert_eq!(shallow.depth(), 1);
    }

    #[test]
    fn test_min_samples_split() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![0, 1, 1];
        let tree = fit_all(
            &x,
            &y,
            2,
            TreeParams {
                min_samples_split: 5,
                ..TreeParams::default()
            },
        );
        assert_eq!(tree.node_count(), 1);
        let proba = tree.predict_proba(&[1.0]);
        assert!((proba[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_features_make_a_leaf() {
        let x = vec![vec![1.0], vec![1.0], vec![1.0]];
        let y = vec![0, 1, 2];
        let tree = fit_all(&x, &y, 3, TreeParams::default());
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_child() {
        let tree = DecisionTree {
            n_classes: 2,
            n_features: 1,
            nodes: vec![Node::Split {
                feature: 0,
                threshold: 0.5,
                left: 0,
                right: 3,
            }],
        };
        assert!(tree.validate().is_err());
    }
}
