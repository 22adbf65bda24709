//! # noisecov — noise-covariance estimation and whitening for M/EEG epochs
//!
//! `noisecov` fits several competing noise-covariance estimators to a set
//! of short epochs, ranks them by cross-validated Gaussian log-likelihood,
//! whitens evoked (trial-averaged) data with the selected covariance, and
//! reduces the result to the global-field-power (GFP) trace used to sanity
//! check the whitening assumption.  Pure Rust, no BLAS, no C libraries.
//!
//! ## Pipeline overview
//!
//! ```text
//! EpochSet  [E, C, T] trials + channel metadata
//!   │
//!   ├─ estimate_covariances()   k-fold CV over {diagonal-fixed, shrunk, …}
//!   │      → Vec<ScoredCovariance>, best fit first
//!   ├─ EpochSet::average()      → Evoked  [C, T]
//!   ├─ whiten_evoked()          W = Λ_r^{-1/2} U_rᵀ over picked channels
//!   │      → WhitenedEvoked  [rank, T], units of standard deviations
//!   └─ global_field_power()     → Vec<f64>, ≈ 1 on pure-noise baseline
//! ```
//!
//! ## Quick start
//!
//! ```
//! use ndarray::Array3;
//! use noisecov::{
//!     estimate_covariances, global_field_power, whiten_evoked,
//!     EpochSet, EstimatorKind, SelectorConfig, TimeWindow,
//! };
//!
//! // 12 trials × 6 channels × 80 samples, one frequency per channel so
//! // the noise covariance is full rank.
//! let data = Array3::from_shape_fn((12, 6, 80), |(e, c, t)| {
//!     (((c + 1) as f64) * 0.53 * t as f64 + e as f64 * 1.7).sin()
//! });
//! let names = (0..6).map(|i| format!("EEG {i:03}")).collect();
//! let epochs = EpochSet::new(data, names, 100.0, -0.2).unwrap();
//!
//! // Rank the default candidate set on baseline samples (t ≤ 0).
//! let cfg = SelectorConfig::default();
//! let ranked = estimate_covariances(
//!     &epochs,
//!     &EstimatorKind::default_set(),
//!     TimeWindow::baseline(),
//!     &cfg,
//! ).unwrap();
//! assert_eq!(ranked.len(), 2);
//! assert!(ranked[0].log_lik >= ranked[1].log_lik);
//!
//! // Whiten the evoked response with the winner and check the GFP.
//! let evoked = epochs.average();
//! let best = ranked[0].cov.as_ref().unwrap();
//! let white = whiten_evoked(&evoked, best, &evoked.good_channels(), cfg.rank_tol).unwrap();
//! let gfp = global_field_power(&white);
//! assert_eq!(gfp.len(), 80);
//! ```
//!
//! ## Scope
//!
//! Raw-file reading, event parsing, epoch rejection and plotting live
//! upstream and downstream of this crate; it consumes a ready-made
//! [`EpochSet`] and hands back plain numeric results.  All estimation is
//! batch over in-memory arrays — there is no streaming mode.

pub mod config;
pub mod epochs;
pub mod error;
pub mod estimator;
pub mod gfp;
pub mod selector;
pub mod whiten;

mod folds;
mod gauss;
mod linalg;

// ── Crate-root re-exports ─────────────────────────────────────────────────
//
// Everything a downstream user is likely to need is available directly as
// `noisecov::Foo` without having to know the internal module layout.

pub use config::SelectorConfig;
pub use epochs::{EpochSet, Evoked, TimeWindow};
pub use error::CovError;
pub use estimator::{Covariance, EstimatorKind};
pub use gfp::global_field_power;
pub use selector::ScoredCovariance;
pub use whiten::{whiten_evoked, WhitenedEvoked, WhiteningTransform};

/// Fit, score and rank noise-covariance estimators on an epoch set.
///
/// This is the main entry point of the crate.  Each requested variant is
/// fitted on k-fold splits of the trials (deterministic split given
/// [`SelectorConfig::seed`]), scored by the mean Gaussian log-likelihood
/// of the held-out samples, refitted on the full trial set, and returned
/// sorted best-first.
///
/// # Arguments
///
/// * `epochs`  – trials to estimate from; bad channels are excluded and
///   each trial's per-channel mean is removed before fitting.
/// * `kinds`   – estimator variants to rank.  Duplicates are collapsed;
///   [`EstimatorKind::default_set()`] gives `{diagonal-fixed, shrunk}`.
/// * `window`  – which samples within each trial to fit on, e.g.
///   [`TimeWindow::baseline()`] for pre-stimulus noise.
/// * `cfg`     – fold count, shrinkage grid, seed, worker count, rank
///   tolerance (see [`SelectorConfig`]).
///
/// # Guarantees
///
/// * Every requested variant appears exactly once in the output, sorted
///   by descending score; ties go to the simpler estimator.
/// * A variant that fails on every fold is *not* dropped: it is ranked
///   with a [`f64::NEG_INFINITY`] sentinel score, `cov: None`, and its
///   first failure attached, so callers can handle total failure
///   without the whole ranking call erroring out.
/// * The result is identical for a given `(epochs, kinds, window, cfg)`
///   regardless of `cfg.n_workers`.
///
/// # Errors
///
/// Fails up front (rather than per-variant) when the input cannot
/// support any selection: fewer than 2 trials, an empty time window, an
/// empty variant list, or every channel marked bad.
pub fn estimate_covariances(
    epochs: &EpochSet,
    kinds: &[EstimatorKind],
    window: TimeWindow,
    cfg: &SelectorConfig,
) -> Result<Vec<ScoredCovariance>, CovError> {
    selector::select(epochs, kinds, window, cfg)
}
