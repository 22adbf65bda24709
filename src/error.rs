//! Error taxonomy for covariance estimation and whitening.
//!
//! Estimator- and fold-level failures are contained inside the model
//! selector (a variant that fails every fold is ranked with a sentinel
//! score, see [`crate::selector`]); whitening and reduction errors
//! propagate to the caller since there is no safe partial result.
use thiserror::Error;

use crate::estimator::EstimatorKind;

/// Everything that can go wrong in this crate.
///
/// Each variant carries enough context (estimator, fold, channel) to be
/// actionable — the whole point of the whitening check is diagnostics,
/// so opaque failures are not acceptable.
#[derive(Debug, Clone, Error)]
pub enum CovError {
    /// Not enough independent samples for the requested estimator.
    ///
    /// Recoverable by switching to a more regularized variant
    /// (diagonal or shrunk); never silently substituted.
    #[error(
        "underdetermined covariance: {n_trials} trial(s), {n_samples} pooled \
         sample(s) for {n_channels} channels"
    )]
    UnderdeterminedCovariance {
        n_trials: usize,
        n_samples: usize,
        n_channels: usize,
    },

    /// A picked channel is not covered by the covariance matrix.
    #[error("channel {name:?} (evoked index {index}) not covered by the noise covariance")]
    ChannelMismatch { name: String, index: usize },

    /// Eigenvalue or log-determinant computation produced non-finite
    /// values, or an eigenvalue negative beyond the clipping tolerance.
    #[error("numerical instability in {context}: {detail}")]
    NumericalInstability {
        context: &'static str,
        detail: String,
    },

    /// A given estimator failed on a given cross-validation fold.
    #[error("{kind} estimator failed on fold {fold}")]
    FitFailure {
        kind: EstimatorKind,
        fold: usize,
        #[source]
        source: Box<CovError>,
    },

    /// Input arrays have inconsistent or degenerate shapes.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A configuration value is out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CovError {
    /// Wrap an estimator error as a per-fold fit failure.
    pub(crate) fn fit_failure(kind: EstimatorKind, fold: usize, source: CovError) -> Self {
        CovError::FitFailure {
            kind,
            fold,
            source: Box::new(source),
        }
    }
}
