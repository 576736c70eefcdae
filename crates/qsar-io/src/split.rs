//! Train / validation / test partitioning.

use qsar_core::{CvFolds, DataSplit, Dataset, Molecule};

/// Index ranges produced by [`split_bounds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitBounds {
    /// Molecules `[0, pool)` form the training pool; the rest are test
    pub pool: usize,
    /// Validation fold `[val_start, val_end)` within the pool
    pub val_start: usize,
    pub val_end: usize,
}

/// Computes split boundaries for `n` molecules.
///
/// The first `round(training_ratio * n)` molecules form the training pool.
/// With more than one fold, fold `k` (1-based, contiguous) of the pool is
/// the validation split; a single fold leaves validation empty.
pub fn split_bounds(n: usize, training_ratio: f64, folds: CvFolds) -> SplitBounds {
    let pool = ((training_ratio * n as f64).round() as usize).min(n);

    if folds.folds <= 1 {
        return SplitBounds {
            pool,
            val_start: pool,
            val_end: pool,
        };
    }

    let val_start = (folds.fold - 1) * pool / folds.folds;
    let val_end = folds.fold * pool / folds.folds;
    SplitBounds {
        pool,
        val_start,
        val_end,
    }
}

/// Partitions molecules (already shuffled/truncated) into three splits.
pub fn partition(molecules: Vec<Molecule>, training_ratio: f64, folds: CvFolds) -> Dataset {
    let bounds = split_bounds(molecules.len(), training_ratio, folds);

    let mut train = Vec::with_capacity(bounds.pool);
    let mut val = Vec::with_capacity(bounds.val_end - bounds.val_start);
    let mut test = Vec::with_capacity(molecules.len() - bounds.pool);

    for (i, molecule) in molecules.into_iter().enumerate() {
        if i >= bounds.pool {
            test.push(molecule);
        } else if i >= bounds.val_start && i < bounds.val_end {
            val.push(molecule);
        } else {
            train.push(molecule);
        }
    }

    Dataset::new(DataSplit::new(train), DataSplit::new(val), DataSplit::new(test))
}
