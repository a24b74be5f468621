//! Stratified train/test splitting and k-fold partitioning.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Sample indices grouped by class, each group shuffled.
fn shuffled_by_class(y: &[usize], rng: &mut StdRng) -> Vec<Vec<usize>> {
    let n_classes = y.iter().max().map_or(0, |m| m + 1);
    let mut groups = vec![Vec::new(); n_classes];
    for (i, &class) in y.iter().enumerate() {
        groups[class].push(i);
    }
    for group in &mut groups {
        group.shuffle(rng);
    }
    groups
}

/// Split sample indices into `(train, test)` keeping class proportions.
///
/// Each class with at least two samples puts roughly `test_size` of them
/// (at least one, never all) into the test set; singleton classes stay in
/// training.
pub fn stratified_split(y: &[usize], test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for group in shuffled_by_class(y, &mut rng) {
        let n = group.len();
        let n_test = if n < 2 {
            0
        } else {
            ((n as f64 * test_size).round() as usize).clamp(1, n - 1)
        };
        test.extend_from_slice(&group[..n_test]);
        train.extend_from_slice(&group[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Partition positions `0..y.len()` into `k` folds with class proportions
/// preserved. Returns the held-out positions of each non-empty fold.
pub fn stratified_folds(y: &[usize], k: usize, seed: u64) -> Vec<Vec<usize>> {
    let k = k.max(2);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds = vec![Vec::new(); k];

    // Deal class members round-robin, continuing across classes so that
    // fold sizes stay within one of each other.
    let mut next = 0;
    for group in shuffled_by_class(y, &mut rng) {
        for index in group {
            folds[next % k].push(index);
            next += 1;
        }
    }

    folds.retain(|f| !f.is_empty());
    for fold in &mut folds {
        fold.sort_unstable();
    }
    folds
}
