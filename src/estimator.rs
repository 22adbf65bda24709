//! Noise-covariance estimators.
//!
//! A closed set of variants, each a distinct numerical recipe behind one
//! fitting entry point:
//!
//! * `empirical`       — pooled sample covariance, no regularization;
//! * `diagonal-fixed`  — per-channel variances only, always full rank;
//! * `shrunk`          — convex blend of the empirical covariance and its
//!   diagonal, blend weight picked by internal cross-validation.
//!
//! Fitted [`Covariance`] objects are immutable; re-estimation produces a
//! new value.
use nalgebra::DMatrix;

use crate::config::SelectorConfig;
use crate::epochs::{extract_trials, EpochSet, TimeWindow};
use crate::error::CovError;
use crate::folds::{kfold_indices, training_indices};
use crate::gauss::log_likelihood;
use crate::linalg::clipped_symmetric_eigen;

/// The covariance estimator variants this crate knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EstimatorKind {
    /// Pooled sample covariance.  May be singular when the pooled sample
    /// count is small relative to the channel count.
    Empirical,
    /// Per-channel variances, off-diagonals forced to zero.
    DiagonalFixed,
    /// `(1−α)·Σ_emp + α·diag(Σ_emp)` with cross-validated `α`.
    Shrunk,
}

impl EstimatorKind {
    /// The default candidate set: the regularized variants, cheapest
    /// first.  The raw empirical estimator is opt-in.
    pub fn default_set() -> Vec<EstimatorKind> {
        vec![EstimatorKind::DiagonalFixed, EstimatorKind::Shrunk]
    }

    /// Model complexity used as the ranking tie-break: fewer effective
    /// parameters wins on equal scores.  Diagonal (p parameters) <
    /// shrunk (full matrix, but pulled toward its diagonal) < empirical
    /// (full matrix, unconstrained).
    pub fn complexity(&self) -> u8 {
        match self {
            EstimatorKind::DiagonalFixed => 0,
            EstimatorKind::Shrunk => 1,
            EstimatorKind::Empirical => 2,
        }
    }
}

impl std::fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EstimatorKind::Empirical => "empirical",
            EstimatorKind::DiagonalFixed => "diagonal-fixed",
            EstimatorKind::Shrunk => "shrunk",
        };
        f.write_str(name)
    }
}

/// A fitted symmetric PSD noise-covariance matrix.
///
/// Tagged with the estimator that produced it, the channel names it
/// covers (in matrix order), its numerical rank, and — for `shrunk` —
/// the selected regularization weight.
#[derive(Debug, Clone)]
pub struct Covariance {
    kind: EstimatorKind,
    names: Vec<String>,
    data: DMatrix<f64>,
    rank: usize,
    shrinkage: Option<f64>,
}

impl Covariance {
    /// Fit one estimator variant on an epoch set.
    ///
    /// Fitting uses the good channels only (bads excluded) and the
    /// samples selected by `window`, with each trial's per-channel mean
    /// removed first.
    ///
    /// # Errors
    ///
    /// [`CovError::UnderdeterminedCovariance`] when the variant has too
    /// few trials or pooled samples (see [`crate::error`]);
    /// [`CovError::NumericalInstability`] when the fitted matrix has no
    /// plausible PSD spectrum.
    pub fn fit_epochs(
        kind: EstimatorKind,
        epochs: &EpochSet,
        window: TimeWindow,
        cfg: &SelectorConfig,
    ) -> Result<Covariance, CovError> {
        let (trials, names) = extract_trials(epochs, window)?;
        Covariance::fit(kind, &trials, &names, cfg)
    }

    /// Fit on pre-extracted, per-trial-centered `[p, n]` matrices.
    pub(crate) fn fit(
        kind: EstimatorKind,
        trials: &[DMatrix<f64>],
        names: &[String],
        cfg: &SelectorConfig,
    ) -> Result<Covariance, CovError> {
        let (data, shrinkage) = match kind {
            EstimatorKind::Empirical => (fit_empirical(trials)?, None),
            EstimatorKind::DiagonalFixed => (fit_diagonal(trials)?, None),
            EstimatorKind::Shrunk => {
                let (m, alpha) = fit_shrunk(trials, cfg)?;
                (m, Some(alpha))
            }
        };
        let rank = clipped_symmetric_eigen(&data, cfg.rank_tol, "covariance fit")?.rank();
        Ok(Covariance {
            kind,
            names: names.to_vec(),
            data,
            rank,
            shrinkage,
        })
    }

    pub fn kind(&self) -> EstimatorKind {
        self.kind
    }

    /// Channel names covered by this covariance, in matrix order.
    pub fn ch_names(&self) -> &[String] {
        &self.names
    }

    /// The `[p, p]` covariance matrix itself.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }

    /// Numerical rank: eigenvalues retained above the relative
    /// threshold at fit time.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// The cross-validated shrinkage weight, for `shrunk` fits.
    pub fn shrinkage(&self) -> Option<f64> {
        self.shrinkage
    }
}

/// Total sample count across `trials`.
fn pooled_samples(trials: &[DMatrix<f64>]) -> usize {
    trials.iter().map(|t| t.ncols()).sum()
}

/// Concatenate the selected trials column-wise into one `[p, Σn]` matrix.
pub(crate) fn pool_columns(trials: &[DMatrix<f64>], idx: &[usize]) -> DMatrix<f64> {
    let p = trials[idx[0]].nrows();
    let total: usize = idx.iter().map(|&i| trials[i].ncols()).sum();
    let mut out = DMatrix::<f64>::zeros(p, total);
    let mut col = 0;
    for &i in idx {
        let t = &trials[i];
        out.view_mut((0, col), (p, t.ncols())).copy_from(t);
        col += t.ncols();
    }
    out
}

/// Raw pooled sample covariance `Σ X Xᵀ / N` over the selected trials.
///
/// No sample-count gate here: the shrunk estimator deliberately blends
/// singular empirical matrices.
fn empirical_matrix(trials: &[DMatrix<f64>], idx: &[usize]) -> DMatrix<f64> {
    let p = trials[idx[0]].nrows();
    let mut acc = DMatrix::<f64>::zeros(p, p);
    let mut total = 0usize;
    for &i in idx {
        let t = &trials[i];
        acc += t * t.transpose();
        total += t.ncols();
    }
    acc / total as f64
}

fn fit_empirical(trials: &[DMatrix<f64>]) -> Result<DMatrix<f64>, CovError> {
    let n_trials = trials.len();
    let n_channels = trials.first().map_or(0, |t| t.nrows());
    let pooled = pooled_samples(trials);
    // Per-trial centering consumes one sample of information per trial.
    if n_trials < 2 || pooled - n_trials < n_channels {
        return Err(CovError::UnderdeterminedCovariance {
            n_trials,
            n_samples: pooled,
            n_channels,
        });
    }
    let all: Vec<usize> = (0..n_trials).collect();
    Ok(empirical_matrix(trials, &all))
}

fn fit_diagonal(trials: &[DMatrix<f64>]) -> Result<DMatrix<f64>, CovError> {
    let n_trials = trials.len();
    let n_channels = trials.first().map_or(0, |t| t.nrows());
    let pooled = pooled_samples(trials);
    // One variance per channel: a single trial is enough, but the
    // centered samples must carry at least one degree of freedom.
    if n_trials == 0 || pooled - n_trials < 1 {
        return Err(CovError::UnderdeterminedCovariance {
            n_trials,
            n_samples: pooled,
            n_channels,
        });
    }
    let mut var = vec![0.0_f64; n_channels];
    for t in trials {
        for r in 0..n_channels {
            for c in 0..t.ncols() {
                var[r] += t[(r, c)] * t[(r, c)];
            }
        }
    }
    for v in &mut var {
        *v /= pooled as f64;
    }
    Ok(DMatrix::from_diagonal(&nalgebra::DVector::from_vec(var)))
}

/// `(1−α)·Σ + α·diag(Σ)`.
fn shrink(emp: &DMatrix<f64>, alpha: f64) -> DMatrix<f64> {
    let target = DMatrix::from_diagonal(&emp.diagonal());
    emp * (1.0 - alpha) + target * alpha
}

/// Shrunk fit: pick `α` from the configured grid by internal
/// cross-validation (held-out log-likelihood), then refit on all trials
/// with the winner.
///
/// The inner split reuses the fold machinery with a seed derived from
/// `cfg.seed`, so it never coincides with the selector's outer split.
/// Ties pick the first maximiser in grid order.
fn fit_shrunk(
    trials: &[DMatrix<f64>],
    cfg: &SelectorConfig,
) -> Result<(DMatrix<f64>, f64), CovError> {
    let n_trials = trials.len();
    let n_channels = trials.first().map_or(0, |t| t.nrows());
    if n_trials < 2 {
        return Err(CovError::UnderdeterminedCovariance {
            n_trials,
            n_samples: pooled_samples(trials),
            n_channels,
        });
    }
    if cfg.shrinkage_grid.is_empty() {
        return Err(CovError::InvalidConfig("empty shrinkage grid".into()));
    }
    for &a in &cfg.shrinkage_grid {
        if !(0.0..=1.0).contains(&a) {
            return Err(CovError::InvalidConfig(format!(
                "shrinkage α = {a} outside [0, 1]"
            )));
        }
    }

    let folds = kfold_indices(n_trials, cfg.cv_folds, cfg.seed.wrapping_add(1));
    let mut best: Option<(f64, f64)> = None; // (score, α)
    for &alpha in &cfg.shrinkage_grid {
        let mut score = 0.0;
        let mut n_folds = 0usize;
        for (fi, fold) in folds.iter().enumerate() {
            let train = training_indices(&folds, fi);
            let candidate = shrink(&empirical_matrix(trials, &train), alpha);
            let held_out = pool_columns(trials, fold);
            score += log_likelihood(&held_out, &candidate, cfg.rank_tol)?;
            n_folds += 1;
        }
        let score = score / n_folds as f64;
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, alpha));
        }
    }
    let (_, alpha) = best.ok_or(CovError::InvalidConfig("empty shrinkage grid".into()))?;

    let all: Vec<usize> = (0..n_trials).collect();
    Ok((shrink(&empirical_matrix(trials, &all), alpha), alpha))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SelectorConfig {
        SelectorConfig::default()
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("CH{i}")).collect()
    }

    /// Deterministic centered pseudo-noise trials: channel `c` carries a
    /// distinct frequency so the pooled covariance is near-diagonal and
    /// full rank.
    fn sine_trials(n_trials: usize, p: usize, n: usize) -> Vec<DMatrix<f64>> {
        (0..n_trials)
            .map(|e| {
                let mut m = DMatrix::from_fn(p, n, |c, t| {
                    (((c + 1) as f64) * 0.73 * t as f64 + e as f64 * 1.9).sin()
                });
                for r in 0..p {
                    let mean: f64 = m.row(r).sum() / n as f64;
                    for c in 0..n {
                        m[(r, c)] -= mean;
                    }
                }
                m
            })
            .collect()
    }

    #[test]
    fn diagonal_fit_recovers_per_channel_scale() {
        // Scaling channel r by (r+1) must scale its fitted variance by
        // (r+1)² exactly; the base variances themselves differ across
        // channels (distinct frequencies), so compare per channel.
        let base = sine_trials(4, 3, 64);
        let scaled: Vec<DMatrix<f64>> = base
            .iter()
            .map(|m| DMatrix::from_fn(3, 64, |r, c| m[(r, c)] * (r + 1) as f64))
            .collect();
        let fitted_base = fit_diagonal(&base).unwrap();
        let fitted = fit_diagonal(&scaled).unwrap();
        for r in 0..3 {
            let factor = ((r + 1) * (r + 1)) as f64;
            approx::assert_relative_eq!(
                fitted[(r, r)],
                factor * fitted_base[(r, r)],
                max_relative = 1e-9
            );
        }
        // Off-diagonals are exactly zero.
        assert_eq!(fitted[(0, 1)], 0.0);
    }

    #[test]
    fn empirical_fit_requires_two_trials() {
        let trials = sine_trials(1, 4, 32);
        assert!(matches!(
            fit_empirical(&trials),
            Err(CovError::UnderdeterminedCovariance { n_trials: 1, .. })
        ));
        assert!(fit_diagonal(&trials).is_ok());
    }

    #[test]
    fn empirical_fit_requires_enough_pooled_samples() {
        // 2 trials × 3 samples → 4 centered dof < 8 channels.
        let trials = sine_trials(2, 8, 3);
        assert!(matches!(
            fit_empirical(&trials),
            Err(CovError::UnderdeterminedCovariance { .. })
        ));
    }

    #[test]
    fn shrink_endpoints_blend_between_empirical_and_diagonal() {
        let trials = sine_trials(3, 4, 48);
        let all: Vec<usize> = (0..3).collect();
        let emp = empirical_matrix(&trials, &all);
        let s0 = shrink(&emp, 0.0);
        let s1 = shrink(&emp, 1.0);
        approx::assert_abs_diff_eq!(s0[(0, 1)], emp[(0, 1)], epsilon = 1e-15);
        assert_eq!(s1[(0, 1)], 0.0);
        approx::assert_abs_diff_eq!(s1[(2, 2)], emp[(2, 2)], epsilon = 1e-15);
    }

    #[test]
    fn shrunk_fit_reports_selected_alpha() {
        let trials = sine_trials(6, 4, 32);
        let cov = Covariance::fit(EstimatorKind::Shrunk, &trials, &names(4), &cfg()).unwrap();
        let alpha = cov.shrinkage().expect("shrunk fit must carry α");
        assert!((0.0..=1.0).contains(&alpha));
        assert_eq!(cov.kind(), EstimatorKind::Shrunk);
    }

    #[test]
    fn fitted_covariance_is_tagged_with_rank_and_names() {
        // Diagonal over 4 retained channels is full rank.
        let trials = sine_trials(3, 4, 32);
        let cov = Covariance::fit(EstimatorKind::DiagonalFixed, &trials, &names(4), &cfg()).unwrap();
        assert_eq!(cov.rank(), 4);
        assert_eq!(cov.ch_names(), names(4).as_slice());
        assert!(cov.shrinkage().is_none());
    }

    #[test]
    fn out_of_range_alpha_rejected() {
        let trials = sine_trials(4, 3, 32);
        let bad = SelectorConfig {
            shrinkage_grid: vec![0.5, 1.5],
            ..cfg()
        };
        assert!(matches!(
            Covariance::fit(EstimatorKind::Shrunk, &trials, &names(3), &bad),
            Err(CovError::InvalidConfig(_))
        ));
    }

    #[test]
    fn complexity_orders_diagonal_before_shrunk_before_empirical() {
        assert!(EstimatorKind::DiagonalFixed.complexity() < EstimatorKind::Shrunk.complexity());
        assert!(EstimatorKind::Shrunk.complexity() < EstimatorKind::Empirical.complexity());
    }
}
