//! Global field power over whitened data.
//!
//! `gfp[t] = mean_i white[i, t]²`.  Under a correctly estimated noise
//! covariance the whitened baseline is unit-variance Gaussian, so the
//! expected GFP is ≈ 1: systematically larger values flag an
//! under-regularized covariance, smaller ones an over-regularized one.
use crate::whiten::WhitenedEvoked;

/// Per-time-sample mean of squared whitened amplitudes, length
/// `n_times`.  Pure reduction, no state.
pub fn global_field_power(white: &WhitenedEvoked) -> Vec<f64> {
    let r = white.rank() as f64;
    (0..white.n_times())
        .map(|t| white.data.column(t).iter().map(|v| v * v).sum::<f64>() / r)
        .collect()
}
