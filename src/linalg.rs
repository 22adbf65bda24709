//! Symmetric eigendecomposition with numerical-rank clipping.
//!
//! Every consumer of a covariance matrix (rank tagging, likelihood
//! scoring, whitening) goes through [`clipped_symmetric_eigen`]: one
//! place decides which eigenvalues are real structure and which are
//! numerical noise.
use nalgebra::DMatrix;

use crate::error::CovError;

/// Eigenpairs of a symmetric PSD matrix with small eigenvalues dropped.
#[derive(Debug, Clone)]
pub(crate) struct ClippedEigen {
    /// Retained eigenvalues, descending, all `> rel_tol × λ_max`.
    pub vals: Vec<f64>,
    /// Matching eigenvectors as columns, `[n, rank]`.
    pub vecs: DMatrix<f64>,
}

impl ClippedEigen {
    pub fn rank(&self) -> usize {
        self.vals.len()
    }

    /// `Σ ln λᵢ` over the retained spectrum (pseudo-log-determinant).
    pub fn log_det(&self) -> f64 {
        self.vals.iter().map(|v| v.ln()).sum()
    }
}

/// Decompose `m` (assumed symmetric up to roundoff), clip numerical
/// noise, and fail on anything that is not a plausible PSD spectrum.
///
/// * eigenvalues in `(-tol, tol]` with `tol = rel_tol × λ_max` are
///   clipped (dropped) — this is expected roundoff, not an error;
/// * a non-finite eigenvalue, or one below `-tol`, means the input was
///   not a covariance matrix → [`CovError::NumericalInstability`];
/// * `context` names the caller for error messages.
pub(crate) fn clipped_symmetric_eigen(
    m: &DMatrix<f64>,
    rel_tol: f64,
    context: &'static str,
) -> Result<ClippedEigen, CovError> {
    // A tolerance outside (0, 1) inverts the clipping logic: negative
    // values flag every small positive eigenvalue as an instability,
    // and ≥ 1 drops the whole spectrum.
    if !(rel_tol > 0.0 && rel_tol < 1.0) {
        return Err(CovError::InvalidConfig(format!(
            "rank tolerance must be in (0, 1), got {rel_tol}"
        )));
    }
    let n = m.nrows();
    // Symmetrize: fit accumulation can leave ~1 ulp of asymmetry.
    let sym = (m + m.transpose()) * 0.5;
    let eig = sym.symmetric_eigen();

    let mut lambda_max = 0.0_f64;
    for &v in eig.eigenvalues.iter() {
        if !v.is_finite() {
            return Err(CovError::NumericalInstability {
                context,
                detail: format!("non-finite eigenvalue {v}"),
            });
        }
        lambda_max = lambda_max.max(v);
    }
    if lambda_max <= 0.0 {
        return Err(CovError::NumericalInstability {
            context,
            detail: "covariance has no positive eigenvalue".into(),
        });
    }

    let tol = rel_tol * lambda_max;
    let mut keep: Vec<usize> = Vec::with_capacity(n);
    for (i, &v) in eig.eigenvalues.iter().enumerate() {
        if v < -tol {
            return Err(CovError::NumericalInstability {
                context,
                detail: format!("eigenvalue {v:.3e} below tolerance -{tol:.3e}"),
            });
        }
        if v > tol {
            keep.push(i);
        }
    }
    // Descending eigenvalue order.
    keep.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

    let vals: Vec<f64> = keep.iter().map(|&i| eig.eigenvalues[i]).collect();
    let vecs = DMatrix::from_fn(n, keep.len(), |r, c| eig.eigenvectors[(r, keep[c])]);
    Ok(ClippedEigen { vals, vecs })
}
