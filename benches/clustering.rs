use criterion::{black_box, criterion_group, criterion_main, Criterion};
use protomap::{Kmeans, Kohonen, PrefetchModel};
use rand::prelude::*;

fn access_vectors(rng: &mut StdRng, n: usize, d: usize) -> Vec<Vec<f32>> {
    (0..n)
        .map(|_| (0..d).map(|_| f32::from(u8::from(rng.random_bool(0.2)))).collect())
        .collect()
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("train");

    // Synthetic binary access vectors
    let mut rng = StdRng::seed_from_u64(42);
    let data = access_vectors(&mut rng, 500, 64);

    group.bench_function("kmeans_n500_d64_k10", |b| {
        b.iter(|| {
            let mut model = Kmeans::new(10)
                .with_max_iter(10)
                .with_seed(42)
                .initialize(64, black_box(&data), &[])
                .unwrap();
            model.train().unwrap();
        })
    });

    group.bench_function("som_n500_d64_grid6_epochs5", |b| {
        b.iter(|| {
            let mut map = Kohonen::new(6, 5)
                .with_seed(42)
                .initialize(64, black_box(&data), &[])
                .unwrap();
            map.train().unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_training);
criterion_main!(benches);
