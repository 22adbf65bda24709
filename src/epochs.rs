//! Epoch and evoked data containers.
//!
//! [`EpochSet`] holds a stack of equal-shape trials `[E, C, T]` with channel
//! names, a bad-channel list and a sampling rate.  [`Evoked`] is the
//! trial-averaged `[C, T]` signal.  Both are plain in-memory containers;
//! file reading, event parsing and epoch rejection happen upstream.
use nalgebra::DMatrix;
use ndarray::{s, Array2, Array3, ArrayView2, Axis};

use crate::error::CovError;

/// A set of equal-length, equal-channel-count trials.
///
/// Invariants, enforced at construction:
/// * every trial has the same `[C, T]` shape (one contiguous `[E, C, T]`
///   allocation guarantees this),
/// * channel order is fixed and shared with any [`Evoked`] derived from it,
/// * `sfreq > 0`, at least one trial, channel and sample.
#[derive(Debug, Clone)]
pub struct EpochSet {
    data: Array3<f64>,
    ch_names: Vec<String>,
    bads: Vec<String>,
    sfreq: f64,
    tmin: f64,
}

impl EpochSet {
    /// Build an `EpochSet` from a `[n_trials, n_channels, n_times]` array.
    ///
    /// `tmin` is the time (in seconds) of the first sample of each trial,
    /// typically negative for pre-stimulus baselines.
    pub fn new(
        data: Array3<f64>,
        ch_names: Vec<String>,
        sfreq: f64,
        tmin: f64,
    ) -> Result<Self, CovError> {
        let (n_e, n_c, n_t) = data.dim();
        if n_e == 0 || n_c == 0 || n_t == 0 {
            return Err(CovError::ShapeMismatch(format!(
                "epoch array must be non-empty, got [{n_e}, {n_c}, {n_t}]"
            )));
        }
        if ch_names.len() != n_c {
            return Err(CovError::ShapeMismatch(format!(
                "{} channel names for {n_c} channels",
                ch_names.len()
            )));
        }
        if !(sfreq.is_finite() && sfreq > 0.0) {
            return Err(CovError::ShapeMismatch(format!(
                "sampling rate must be positive, got {sfreq}"
            )));
        }
        Ok(Self {
            data,
            ch_names,
            bads: vec![],
            sfreq,
            tmin,
        })
    }

    /// Attach a bad-channel list (names, matched case-insensitively and
    /// ignoring spaces, so `"meg 2443"` matches `"MEG 2443"`).
    pub fn with_bads(mut self, bads: Vec<String>) -> Self {
        self.bads = bads;
        self
    }

    pub fn n_trials(&self) -> usize {
        self.data.dim().0
    }

    pub fn n_channels(&self) -> usize {
        self.data.dim().1
    }

    pub fn n_times(&self) -> usize {
        self.data.dim().2
    }

    pub fn sfreq(&self) -> f64 {
        self.sfreq
    }

    pub fn tmin(&self) -> f64 {
        self.tmin
    }

    pub fn ch_names(&self) -> &[String] {
        &self.ch_names
    }

    pub fn bads(&self) -> &[String] {
        &self.bads
    }

    /// View of one trial, shape `[C, T]`.
    pub fn trial(&self, idx: usize) -> ArrayView2<'_, f64> {
        self.data.slice(s![idx, .., ..])
    }

    /// Time axis in seconds, length `n_times`.
    pub fn times(&self) -> Vec<f64> {
        (0..self.n_times())
            .map(|i| self.tmin + i as f64 / self.sfreq)
            .collect()
    }

    /// Indices of channels not listed as bad, in channel order.
    pub fn good_channels(&self) -> Vec<usize> {
        good_channels(&self.ch_names, &self.bads)
    }

    /// Average all trials into an [`Evoked`] signal.
    ///
    /// Channel metadata (names, bads) and the time axis carry over.
    pub fn average(&self) -> Evoked {
        let n_e = self.n_trials() as f64;
        let mean: Array2<f64> = self.data.sum_axis(Axis(0)) / n_e;
        Evoked {
            data: mean,
            ch_names: self.ch_names.clone(),
            bads: self.bads.clone(),
            sfreq: self.sfreq,
            tmin: self.tmin,
        }
    }
}

/// A trial-averaged signal, shape `[C, T]`.
#[derive(Debug, Clone)]
pub struct Evoked {
    /// Averaged data, `[n_channels, n_times]`.
    pub data: Array2<f64>,
    /// Channel names, same order as the rows of `data`.
    pub ch_names: Vec<String>,
    /// Bad-channel names (same matching rules as [`EpochSet::with_bads`]).
    pub bads: Vec<String>,
    /// Sampling rate in Hz.
    pub sfreq: f64,
    /// Time of the first sample in seconds.
    pub tmin: f64,
}

impl Evoked {
    pub fn n_channels(&self) -> usize {
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

    /// Indices of channels not listed as bad, in channel order.
    pub fn good_channels(&self) -> Vec<usize> {
        good_channels(&self.ch_names, &self.bads)
    }
}

/// Time restriction for covariance fitting, in seconds.
///
/// `None` endpoints extend to the trial edge; `tmax` is inclusive.  The
/// usual noise-covariance choice is baseline-only fitting,
/// `TimeWindow::baseline()` = `(None, 0.0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeWindow {
    pub tmin: Option<f64>,
    pub tmax: Option<f64>,
}

impl TimeWindow {
    /// The whole trial.
    pub fn all() -> Self {
        Self::default()
    }

    /// Pre-stimulus samples only (`t ≤ 0`).
    pub fn baseline() -> Self {
        Self {
            tmin: None,
            tmax: Some(0.0),
        }
    }

    /// An explicit `[tmin, tmax]` window.
    pub fn between(tmin: f64, tmax: f64) -> Self {
        Self {
            tmin: Some(tmin),
            tmax: Some(tmax),
        }
    }

    /// Resolve the window to a sample range for a trial starting at
    /// `t0` seconds with `n_times` samples at `sfreq` Hz.
    ///
    /// Endpoints are rounded to the nearest sample; the range may be
    /// empty when the window lies outside the trial.
    pub fn sample_range(&self, t0: f64, sfreq: f64, n_times: usize) -> std::ops::Range<usize> {
        let to_idx = |t: f64| ((t - t0) * sfreq).round();
        let start = match self.tmin {
            Some(t) => to_idx(t).max(0.0) as usize,
            None => 0,
        };
        let end = match self.tmax {
            // Inclusive upper endpoint.
            Some(t) => (to_idx(t) + 1.0).max(0.0) as usize,
            None => n_times,
        };
        start.min(n_times)..end.min(n_times)
    }
}

/// Normalise a channel name for bad-list matching: lowercase, no spaces.
fn norm_name(s: &str) -> String {
    s.replace(' ', "").to_lowercase()
}

fn good_channels(ch_names: &[String], bads: &[String]) -> Vec<usize> {
    let bad_norm: Vec<String> = bads.iter().map(|b| norm_name(b)).collect();
    ch_names
        .iter()
        .enumerate()
        .filter(|(_, name)| !bad_norm.contains(&norm_name(name)))
        .map(|(i, _)| i)
        .collect()
}

/// Pull the fitting data out of an epoch set: good channels only, the
/// requested time window, each trial's per-channel mean removed.
///
/// Returns one `[n_good, n_window]` matrix per trial plus the names of
/// the retained channels (the channel ordering every fitted covariance
/// is tagged with).
pub(crate) fn extract_trials(
    epochs: &EpochSet,
    window: TimeWindow,
) -> Result<(Vec<DMatrix<f64>>, Vec<String>), CovError> {
    let picks = epochs.good_channels();
    if picks.is_empty() {
        return Err(CovError::ShapeMismatch(
            "all channels are marked bad".into(),
        ));
    }
    let range = window.sample_range(epochs.tmin(), epochs.sfreq(), epochs.n_times());
    if range.is_empty() {
        return Err(CovError::ShapeMismatch(format!(
            "time window {window:?} selects no samples"
        )));
    }

    let n_w = range.len();
    let mut trials = Vec::with_capacity(epochs.n_trials());
    for e in 0..epochs.n_trials() {
        let view = epochs.trial(e);
        let mut m = DMatrix::<f64>::zeros(picks.len(), n_w);
        for (row, &ch) in picks.iter().enumerate() {
            let mut mean = 0.0;
            for (col, t) in range.clone().enumerate() {
                let v = view[[ch, t]];
                m[(row, col)] = v;
                mean += v;
            }
            mean /= n_w as f64;
            for col in 0..n_w {
                m[(row, col)] -= mean;
            }
        }
        trials.push(m);
    }
    let names = picks.iter().map(|&i| epochs.ch_names[i].clone()).collect();
    Ok((trials, names))
}
