use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array3;
use noisecov::{
    estimate_covariances, whiten_evoked, EpochSet, EstimatorKind, SelectorConfig, TimeWindow,
};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;

fn synthetic_epochs(n_trials: usize, n_ch: usize, n_times: usize) -> EpochSet {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
    let dist = Normal::new(0.0, 1.0).unwrap();
    let mut data = Array3::<f64>::zeros((n_trials, n_ch, n_times));
    for v in data.iter_mut() {
        *v = dist.sample(&mut rng);
    }
    let names = (0..n_ch).map(|i| format!("MEG {i:04}")).collect();
    EpochSet::new(data, names, 600.0, -0.2).unwrap()
}

fn bench_estimate(c: &mut Criterion) {
    let epochs = synthetic_epochs(30, 32, 120);
    let cfg = SelectorConfig::default();
    c.bench_function("estimate_covariances [30×32×120, diag+shrunk]", |b| {
        b.iter(|| {
            let ranked = estimate_covariances(
                black_box(&epochs),
                &EstimatorKind::default_set(),
                TimeWindow::all(),
                &cfg,
            )
            .unwrap();
            black_box(ranked.len())
        })
    });
}

fn bench_whiten(c: &mut Criterion) {
    let epochs = synthetic_epochs(30, 32, 120);
    let cfg = SelectorConfig::default();
    let ranked = estimate_covariances(
        &epochs,
        &EstimatorKind::default_set(),
        TimeWindow::all(),
        &cfg,
    )
    .unwrap();
    let cov = ranked[0].cov.as_ref().unwrap();
    let evoked = epochs.average();
    let picks = evoked.good_channels();
    c.bench_function("whiten_evoked [32 ch × 120 samples]", |b| {
        b.iter(|| {
            let white = whiten_evoked(black_box(&evoked), cov, &picks, cfg.rank_tol).unwrap();
            black_box(white.rank())
        })
    });
}

criterion_group!(benches, bench_estimate, bench_whiten);
criterion_main!(benches);
