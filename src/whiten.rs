//! Spatial whitening of evoked data.
//!
//! From a noise covariance `Σ = UΛUᵀ` restricted to a channel selection,
//! build `W = Λ_r^{-1/2} U_rᵀ` over the numerically retained rank `r`.
//! Applied to pure noise, `W·x` has independent unit-variance Gaussian
//! components — the calibration assumption the GFP diagnostic checks.
//!
//! The whitened space has dimension `r`, not the channel count; callers
//! must not assume shape preservation.
use nalgebra::DMatrix;
use ndarray::Array2;

use crate::epochs::Evoked;
use crate::error::CovError;
use crate::estimator::Covariance;
use crate::linalg::clipped_symmetric_eigen;

/// A whitening matrix derived from one covariance and one channel
/// selection.  Immutable once computed; derived on demand rather than
/// cached, since it is cheap next to the estimation step.
#[derive(Debug, Clone)]
pub struct WhiteningTransform {
    /// `[rank, n_picks]` whitening matrix.
    w: DMatrix<f64>,
    /// Evoked-channel indices the transform consumes, in order.
    picks: Vec<usize>,
    /// Names of the picked channels, checked again at apply time so
    /// the transform cannot silently whiten the wrong channels of a
    /// differently-labelled evoked signal.
    names: Vec<String>,
}

impl WhiteningTransform {
    /// Build a whitener for the `picks` rows of an evoked signal with
    /// channel names `ch_names`.
    ///
    /// Each picked channel is looked up *by name* in the covariance's
    /// channel ordering; a pick the covariance does not cover fails with
    /// [`CovError::ChannelMismatch`].  `rank_tol` is the relative
    /// eigenvalue threshold (see [`crate::SelectorConfig::rank_tol`]).
    pub fn from_covariance(
        cov: &Covariance,
        ch_names: &[String],
        picks: &[usize],
        rank_tol: f64,
    ) -> Result<Self, CovError> {
        if picks.is_empty() {
            return Err(CovError::ShapeMismatch("empty channel selection".into()));
        }
        // Map each pick to its row in the covariance.
        let mut rows = Vec::with_capacity(picks.len());
        let mut names = Vec::with_capacity(picks.len());
        for &pick in picks {
            let name = ch_names.get(pick).ok_or_else(|| CovError::ChannelMismatch {
                name: format!("<index {pick} out of range>"),
                index: pick,
            })?;
            let row = cov
                .ch_names()
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| CovError::ChannelMismatch {
                    name: name.clone(),
                    index: pick,
                })?;
            rows.push(row);
            names.push(name.clone());
        }

        let p = rows.len();
        let sub = DMatrix::from_fn(p, p, |i, j| cov.matrix()[(rows[i], rows[j])]);
        let eig = clipped_symmetric_eigen(&sub, rank_tol, "whitening")?;

        // W[i, :] = uᵢᵀ / √λᵢ
        let w = DMatrix::from_fn(eig.rank(), p, |i, j| {
            eig.vecs[(j, i)] / eig.vals[i].sqrt()
        });
        Ok(Self {
            w,
            picks: picks.to_vec(),
            names,
        })
    }

    /// Dimensionality of the whitened space.
    pub fn rank(&self) -> usize {
        self.w.nrows()
    }

    /// The `[rank, n_picks]` matrix itself.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.w
    }

    /// Apply the transform to an evoked signal.
    ///
    /// Fails with [`CovError::ChannelMismatch`] if `evoked` does not
    /// carry, at the picked indices, the same channel names the
    /// transform was built for.
    pub fn apply(&self, evoked: &Evoked) -> Result<WhitenedEvoked, CovError> {
        for (&pick, expected) in self.picks.iter().zip(&self.names) {
            match evoked.ch_names.get(pick) {
                Some(name) if name == expected => {}
                Some(name) => {
                    return Err(CovError::ChannelMismatch {
                        name: name.clone(),
                        index: pick,
                    });
                }
                None => {
                    return Err(CovError::ChannelMismatch {
                        name: format!("<index {pick} out of range>"),
                        index: pick,
                    });
                }
            }
        }
        let n_t = evoked.n_times();
        let x = DMatrix::from_fn(self.picks.len(), n_t, |i, j| {
            evoked.data[[self.picks[i], j]]
        });
        let y = &self.w * x;
        let data = Array2::from_shape_fn((y.nrows(), n_t), |(i, j)| y[(i, j)]);
        Ok(WhitenedEvoked {
            data,
            sfreq: evoked.sfreq,
            tmin: evoked.tmin,
        })
    }
}

/// Evoked data in whitened coordinates: `[rank, n_times]`, unit
/// standard deviations under the noise model.
#[derive(Debug, Clone)]
pub struct WhitenedEvoked {
    /// Whitened amplitudes, `[rank, n_times]`.
    pub data: Array2<f64>,
    /// Sampling rate in Hz, carried over from the evoked input.
    pub sfreq: f64,
    /// Time of the first sample in seconds.
    pub tmin: f64,
}

impl WhitenedEvoked {
    pub fn rank(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_times(&self) -> usize {
        self.data.ncols()
    }

    /// Time axis in seconds, length `n_times`.
    pub fn times(&self) -> Vec<f64> {
        (0..self.n_times())
            .map(|i| self.tmin + i as f64 / self.sfreq)
            .collect()
    }
}

/// Whiten `evoked` with `cov` over the `picks` channel selection.
///
/// Convenience wrapper: builds the [`WhiteningTransform`] and applies it
/// in one call.
pub fn whiten_evoked(
    evoked: &Evoked,
    cov: &Covariance,
    picks: &[usize],
    rank_tol: f64,
) -> Result<WhitenedEvoked, CovError> {
    let transform = WhiteningTransform::from_covariance(cov, &evoked.ch_names, picks, rank_tol)?;
    transform.apply(evoked)
}
