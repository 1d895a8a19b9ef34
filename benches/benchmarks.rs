use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use incremental_pca::{incremental_pca, pca, pca_inplace, IncrementalPcaConfig, PcaConfig};
use ndarray::{s, Array2};
use rand::distributions::Uniform;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generates random data of shape (n_samples x n_features) with values 0, 1, or 2 (as f64), seeded for reproducibility.
fn generate_random_data(n_samples: usize, n_features: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let distribution = Uniform::new_inclusive(0, 2);
    Array2::from_shape_fn((n_samples, n_features), |_| rng.sample(distribution) as f64)
}

// Both regimes: tall data goes through the covariance matrix, wide data through the Gram matrix.
const SHAPES: [(usize, usize); 4] = [(500, 50), (1000, 200), (100, 2000), (200, 10000)];

fn bench_pca(c: &mut Criterion) {
    let mut group = c.benchmark_group("pca");
    let config = PcaConfig::default();

    for &(n_samples, n_features) in SHAPES.iter() {
        let data = generate_random_data(n_samples, n_features, 42);
        let label = format!("{}x{}", n_samples, n_features);
        group.throughput(Throughput::Elements((n_samples * n_features) as u64));

        group.bench_with_input(BenchmarkId::new("copy", &label), &data, |b, data| {
            b.iter(|| pca(data.view(), &config).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("inplace", &label), &data, |b, data| {
            b.iter_with_setup(|| data.clone(), |mut work| pca_inplace(&mut work, &config).unwrap());
        });
    }
    group.finish();
}

fn bench_incremental_pca(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental_pca");

    for &(n_samples, n_features) in SHAPES.iter() {
        // Fit on 80% of the rows, update with the rest.
        let data = generate_random_data(n_samples, n_features, 7);
        let split = n_samples * 4 / 5;
        let prior_data = data.slice(s![..split, ..]);
        let new_data = data.slice(s![split.., ..]).to_owned();
        let prior = pca(prior_data, &PcaConfig::default()).unwrap();

        group.throughput(Throughput::Elements((new_data.len()) as u64));
        for &f in &[1.0, 0.9] {
            let config = IncrementalPcaConfig { forgetting_factor: f, ..Default::default() };
            group.bench_with_input(
                BenchmarkId::new(format!("f={}", f), format!("{}x{}", n_samples, n_features)),
                &new_data,
                |b, new_data| {
                    b.iter(|| {
                        incremental_pca(
                            new_data.view(),
                            prior.components.view(),
                            prior.eigenvalues.view(),
                            split,
                            Some(prior.mean.view()),
                            &config,
                        )
                        .unwrap()
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_pca, bench_incremental_pca);
criterion_main!(benches);
