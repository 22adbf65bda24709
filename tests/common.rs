/// Shared helpers: seeded synthetic Gaussian epoch sets.
use ndarray::{Array2, Array3};
use noisecov::{EpochSet, Evoked};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;

pub fn ch_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("EEG {i:03}")).collect()
}

/// i.i.d. zero-mean Gaussian noise epochs, channel `i` with standard
/// deviation `sigmas[i]`.  Fully determined by `seed`.
#[allow(unused)]
pub fn gaussian_epochs(n_trials: usize, sigmas: &[f64], n_times: usize, seed: u64) -> EpochSet {
    let n_ch = sigmas.len();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut data = Array3::<f64>::zeros((n_trials, n_ch, n_times));
    for e in 0..n_trials {
        for c in 0..n_ch {
            let dist = Normal::new(0.0, sigmas[c]).unwrap();
            for t in 0..n_times {
                data[[e, c, t]] = dist.sample(&mut rng);
            }
        }
    }
    EpochSet::new(data, ch_names(n_ch), 100.0, -0.2).unwrap()
}

/// A single fresh noise draw shaped as an evoked signal, same
/// per-channel scales as [`gaussian_epochs`].
#[allow(unused)]
pub fn gaussian_evoked(sigmas: &[f64], n_times: usize, seed: u64) -> Evoked {
    let n_ch = sigmas.len();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut data = Array2::<f64>::zeros((n_ch, n_times));
    for c in 0..n_ch {
        let dist = Normal::new(0.0, sigmas[c]).unwrap();
        for t in 0..n_times {
            data[[c, t]] = dist.sample(&mut rng);
        }
    }
    Evoked {
        data,
        ch_names: ch_names(n_ch),
        bads: vec![],
        sfreq: 100.0,
        tmin: -0.2,
    }
}

#[allow(unused)]
pub fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}
