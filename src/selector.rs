//! Cross-validated covariance model selection.
//!
//! Fits every requested estimator variant on k-fold splits of the
//! trials, scores each fitted matrix by the mean Gaussian log-likelihood
//! of the held-out samples, and returns the variants ranked best-first.
//!
//! Per-variant, per-fold fits are mutually independent and run on a
//! bounded worker pool; results are reassembled by task index so the
//! ranking is identical regardless of completion order.
use rayon::prelude::*;

use crate::config::SelectorConfig;
use crate::epochs::{extract_trials, EpochSet, TimeWindow};
use crate::error::CovError;
use crate::estimator::{pool_columns, Covariance, EstimatorKind};
use crate::folds::{kfold_indices, training_indices};
use crate::gauss::log_likelihood;

/// A covariance estimate together with its cross-validated score.
///
/// Sort order (applied by [`estimate_covariances`](crate::estimate_covariances)):
/// descending `log_lik`, ties broken by *lower*
/// [`EstimatorKind::complexity`] — an explicit preference for the
/// simpler model at equal fit, not an artifact of iteration order.
#[derive(Debug, Clone)]
pub struct ScoredCovariance {
    /// The estimator variant this entry ranks.
    pub kind: EstimatorKind,
    /// Mean held-out log-likelihood per sample, across folds.
    /// [`f64::NEG_INFINITY`] when every fold failed.
    pub log_lik: f64,
    /// The covariance refitted on all trials, `None` when the final fit
    /// itself failed.
    pub cov: Option<Covariance>,
    /// The first per-fold or final-fit failure, kept for diagnostics.
    pub failure: Option<CovError>,
}

impl ScoredCovariance {
    /// `true` when the variant produced no usable covariance at all.
    pub fn is_total_failure(&self) -> bool {
        self.cov.is_none()
    }
}

/// Fit, score and rank `kinds` on `epochs`; see the crate-level docs.
///
/// Duplicate entries in `kinds` are collapsed: every requested variant
/// appears exactly once in the output, failed or not.
pub(crate) fn select(
    epochs: &EpochSet,
    kinds: &[EstimatorKind],
    window: TimeWindow,
    cfg: &SelectorConfig,
) -> Result<Vec<ScoredCovariance>, CovError> {
    let mut unique: Vec<EstimatorKind> = Vec::new();
    for &k in kinds {
        if !unique.contains(&k) {
            unique.push(k);
        }
    }
    if unique.is_empty() {
        return Err(CovError::InvalidConfig("no estimator variants requested".into()));
    }

    let (trials, names) = extract_trials(epochs, window)?;
    if trials.len() < 2 {
        // No way to hold anything out.
        return Err(CovError::UnderdeterminedCovariance {
            n_trials: trials.len(),
            n_samples: trials.iter().map(|t| t.ncols()).sum(),
            n_channels: names.len(),
        });
    }

    let folds = kfold_indices(trials.len(), cfg.cv_folds, cfg.seed);
    let n_folds = folds.len();

    // One task per (variant, fold); par_iter keeps input order, so the
    // collected vector is deterministic.
    let tasks: Vec<(usize, usize)> = (0..unique.len())
        .flat_map(|ki| (0..n_folds).map(move |fi| (ki, fi)))
        .collect();

    let run_fold = |&(ki, fi): &(usize, usize)| -> Result<f64, CovError> {
        let kind = unique[ki];
        let train = training_indices(&folds, fi);
        let fitted = Covariance::fit(kind, &gather(&trials, &train), &names, cfg)
            .map_err(|e| CovError::fit_failure(kind, fi, e))?;
        let held_out = pool_columns(&trials, &folds[fi]);
        log_likelihood(&held_out, fitted.matrix(), cfg.rank_tol)
            .map_err(|e| CovError::fit_failure(kind, fi, e))
    };

    let fold_scores: Vec<Result<f64, CovError>> = if cfg.n_workers > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.n_workers)
            .build()
            .map_err(|e| CovError::InvalidConfig(format!("worker pool: {e}")))?;
        pool.install(|| tasks.par_iter().map(run_fold).collect())
    } else {
        tasks.iter().map(run_fold).collect()
    };

    let mut ranked = Vec::with_capacity(unique.len());
    for (ki, &kind) in unique.iter().enumerate() {
        let scores = &fold_scores[ki * n_folds..(ki + 1) * n_folds];
        let mut sum = 0.0;
        let mut n_ok = 0usize;
        let mut failure: Option<CovError> = None;
        for s in scores {
            match s {
                Ok(v) => {
                    sum += v;
                    n_ok += 1;
                }
                Err(e) => {
                    if failure.is_none() {
                        failure = Some(e.clone());
                    }
                }
            }
        }

        // Final covariance: refit on the full trial set.  The CV score
        // above estimates how well this fit generalizes.
        let (cov, final_failure) = match Covariance::fit(kind, &trials, &names, cfg) {
            Ok(c) => (Some(c), None),
            Err(e) => (None, Some(e)),
        };

        // Sentinel: a variant with no usable folds (or no final fit)
        // stays in the ranking, pinned to the bottom.
        let log_lik = if n_ok > 0 && cov.is_some() {
            sum / n_ok as f64
        } else {
            f64::NEG_INFINITY
        };
        ranked.push(ScoredCovariance {
            kind,
            log_lik,
            cov,
            failure: failure.or(final_failure),
        });
    }

    sort_ranked(&mut ranked);
    Ok(ranked)
}

/// Descending score; equal scores prefer the simpler estimator.
fn sort_ranked(ranked: &mut [ScoredCovariance]) {
    ranked.sort_by(|a, b| {
        b.log_lik
            .total_cmp(&a.log_lik)
            .then_with(|| a.kind.complexity().cmp(&b.kind.complexity()))
    });
}

fn gather(trials: &[nalgebra::DMatrix<f64>], idx: &[usize]) -> Vec<nalgebra::DMatrix<f64>> {
    idx.iter().map(|&i| trials[i].clone()).collect()
}
