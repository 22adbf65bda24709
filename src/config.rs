//! Model-selection configuration.
//!
//! [`SelectorConfig`] holds every tunable parameter of the covariance
//! model-selection loop.  All fields have documented defaults chosen to
//! match the reference behaviour of automated covariance regularization.

/// Configuration for cross-validated covariance model selection.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use noisecov::SelectorConfig;
///
/// let cfg = SelectorConfig {
///     cv_folds: 5,      // finer cross-validation
///     seed: 7,          // different (but still deterministic) fold split
///     ..SelectorConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Number of cross-validation folds used to score each estimator.
    ///
    /// Trials are shuffled once (seeded, see [`seed`](Self::seed)) and
    /// dealt round-robin into this many folds.  Clamped to the trial
    /// count when there are fewer trials than folds; at least 2 trials
    /// are required for any selection at all.
    ///
    /// Default: `3`.
    pub cv_folds: usize,

    /// Candidate shrinkage coefficients searched by the `shrunk`
    /// estimator's internal cross-validation.
    ///
    /// Each value must lie in `[0, 1]`; `0` is the raw empirical
    /// covariance, `1` its diagonal.  The grid is finite, which bounds
    /// the parameter search on any input.
    ///
    /// Default: `{0.0, 0.1, …, 0.9}`.
    pub shrinkage_grid: Vec<f64>,

    /// Seed for the fold-assignment shuffle.
    ///
    /// Rankings are byte-for-byte reproducible given the same seed and
    /// input; there is no ambient randomness anywhere in the crate.
    ///
    /// Default: `0`.
    pub seed: u64,

    /// Worker threads for per-variant, per-fold fits.
    ///
    /// Fits are mutually independent and run on a pool of this many
    /// threads.  Results are reassembled by task index, so the ranking
    /// never depends on completion order.  `1` runs everything on the
    /// calling thread.
    ///
    /// Default: `1`.
    pub n_workers: usize,

    /// Relative eigenvalue threshold for numerical rank decisions.
    ///
    /// Eigenvalues below `rank_tol × λ_max` are treated as numerical
    /// noise: dropped when building whiteners and pseudo-log-determinants,
    /// clipped to zero when checking positive semi-definiteness.
    ///
    /// Must lie in `(0, 1)`; anything else fails with
    /// [`crate::CovError::InvalidConfig`] at decomposition time.
    ///
    /// Default: `1e-10`.
    pub rank_tol: f64,
}

impl Default for SelectorConfig {
    /// Returns the reference configuration:
    /// 3 folds · α ∈ {0.0, 0.1, …, 0.9} · seed 0 · 1 worker · tol 1e-10.
    fn default() -> Self {
        Self {
            cv_folds: 3,
            shrinkage_grid: (0..10).map(|i| f64::from(i) * 0.1).collect(),
            seed: 0,
            n_workers: 1,
            rank_tol: 1e-10,
        }
    }
}
