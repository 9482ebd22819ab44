//! Benchmarks for GKArray, a mergeable Greenwald-Khanna summary.
//!
//! Measures add throughput (including the periodic merge-compress
//! pass), quantile query latency, and cross-sketch merge cost.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sketch_oxide::GKArray;

fn bench_gkarray_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("gkarray_add");

    for eps in [0.001, 0.01, 0.05].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("epsilon_{eps}")),
            eps,
            |b, &e| {
                let mut gk = GKArray::new(e).unwrap();
                let mut counter = 1.0;
                b.iter(|| {
                    gk.add(black_box(counter)).unwrap();
                    counter += 1.0;
                });
            },
        );
    }
    group.finish();
}

fn bench_gkarray_quantile(c: &mut Criterion) {
    let mut group = c.benchmark_group("gkarray_quantile");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut gk = GKArray::new(0.01).unwrap();
            for i in 1..=size {
                gk.add(i as f64).unwrap();
            }
            b.iter(|| {
                black_box(gk.quantile(black_box(0.99)));
            });
        });
    }
    group.finish();
}

fn bench_gkarray_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("gkarray_merge");

    for size in [100, 1000, 10000].iter() {
        let mut gk1 = GKArray::new(0.01).unwrap();
        let mut gk2 = GKArray::new(0.01).unwrap();

        for i in 1..=*size {
            gk1.add(i as f64).unwrap();
            gk2.add((i + size) as f64).unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut gk_copy = gk1.clone();
                gk_copy.merge(black_box(&gk2)).unwrap();
                black_box(gk_copy);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_gkarray_add, bench_gkarray_quantile, bench_gkarray_merge);
criterion_main!(benches);
