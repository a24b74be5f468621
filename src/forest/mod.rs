//! Random forest classifier.
//!
//! CART trees with Gini impurity are grown on bootstrap samples, with
//! `sqrt(n_features)` features considered per split, and fitted in parallel
//! with rayon. Hyperparameters are chosen by stratified k-fold grid search on
//! weighted F1.

mod ensemble;
mod metrics;
mod search;
mod split;
mod tree;

pub use ensemble::{argmax, ForestParams, RandomForest};
pub use metrics::{accuracy, class_scores, weighted_f1, ClassScore};
pub use search::{grid_search, ParamGrid, SearchResult};
pub use split::{stratified_folds, stratified_split};
pub use tree::{DecisionTree, Node, TreeParams};
