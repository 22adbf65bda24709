//! Deterministic k-fold trial splits.
//!
//! Fold assignment shuffles the trial indices once with a seeded
//! Xoshiro256++ generator and deals them round-robin, so rankings are
//! reproducible given the seed — no ambient randomness.
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Split `0..n` into `k` folds (clamped to `n`), each of size
/// `⌊n/k⌋` or `⌈n/k⌉`.
///
/// Requires `n ≥ 2`; callers gate on that before splitting.
pub(crate) fn kfold_indices(n: usize, k: usize, seed: u64) -> Vec<Vec<usize>> {
    let k = k.clamp(2, n);
    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    idx.shuffle(&mut rng);

    let mut folds = vec![Vec::with_capacity(n / k + 1); k];
    for (i, trial) in idx.into_iter().enumerate() {
        folds[i % k].push(trial);
    }
    folds
}

/// All indices of `folds` except fold `held_out`, flattened.
pub(crate) fn training_indices(folds: &[Vec<usize>], held_out: usize) -> Vec<usize> {
    folds
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != held_out)
        .flat_map(|(_, f)| f.iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_partition_all_indices() {
        let folds = kfold_indices(10, 3, 42);
        assert_eq!(folds.len(), 3);
        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
        // Sizes differ by at most one.
        let sizes: Vec<usize> = folds.iter().map(Vec::len).collect();
        assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);
    }

    #[test]
    fn same_seed_same_split() {
        assert_eq!(kfold_indices(20, 4, 7), kfold_indices(20, 4, 7));
        assert_ne!(kfold_indices(20, 4, 7), kfold_indices(20, 4, 8));
    }

    #[test]
    fn fold_count_clamped_to_trial_count() {
        let folds = kfold_indices(2, 5, 0);
        assert_eq!(folds.len(), 2);
        assert_eq!(folds[0].len(), 1);
        assert_eq!(folds[1].len(), 1);
    }

    #[test]
    fn training_indices_exclude_held_out_fold() {
        let folds = kfold_indices(9, 3, 1);
        for held in 0..3 {
            let train = training_indices(&folds, held);
            assert_eq!(train.len(), 6);
            for t in &train {
                assert!(!folds[held].contains(t));
            }
        }
    }
}
