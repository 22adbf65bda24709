//! Zero-mean multivariate Gaussian log-likelihood.
//!
//! Scores held-out samples under a fitted noise covariance.  The
//! covariance may be singular (empirical fits in the p ≳ n regime), so
//! the density is evaluated on the retained eigenspace only: rank-
//! restricted pseudo-inverse and pseudo-log-determinant.
use nalgebra::DMatrix;

use crate::error::CovError;
use crate::linalg::clipped_symmetric_eigen;

pub(crate) const LOG_2PI: f64 = 1.837_877_066_409_345_6;

/// Mean per-sample log-likelihood of the columns of `samples`
/// (`[p, n]`, assumed zero-mean) under `N(0, cov)` (`[p, p]`).
///
/// With `Σ = U_r Λ_r U_rᵀ` the per-sample term is
/// `-½ (r·ln 2π + Σᵢ ln λᵢ + Σᵢ (uᵢᵀx)²/λᵢ)`.
pub(crate) fn log_likelihood(
    samples: &DMatrix<f64>,
    cov: &DMatrix<f64>,
    rel_tol: f64,
) -> Result<f64, CovError> {
    let p = cov.nrows();
    if samples.nrows() != p {
        return Err(CovError::ShapeMismatch(format!(
            "{} sample rows for a {p}-channel covariance",
            samples.nrows()
        )));
    }
    let n = samples.ncols();
    if n == 0 {
        return Err(CovError::ShapeMismatch("no validation samples".into()));
    }

    let eig = clipped_symmetric_eigen(cov, rel_tol, "log-likelihood")?;
    let r = eig.rank();
    let log_det = eig.log_det();

    // Project all samples into the retained eigenspace at once: [r, n].
    let proj = eig.vecs.transpose() * samples;

    let mut total = 0.0;
    for j in 0..n {
        let mut quad = 0.0;
        for i in 0..r {
            let c = proj[(i, j)];
            quad += c * c / eig.vals[i];
        }
        total += -0.5 * (r as f64 * LOG_2PI + log_det + quad);
    }
    let mean = total / n as f64;
    if !mean.is_finite() {
        return Err(CovError::NumericalInstability {
            context: "log-likelihood",
            detail: format!("non-finite score {mean}"),
        });
    }
    Ok(mean)
}
