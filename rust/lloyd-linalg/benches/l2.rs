// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The Lloyd Authors

use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[cfg(target_os = "linux")]
use pprof::criterion::{Output, PProfProfiler};

use lloyd_linalg::distance::{l2_distance, l2_distance_batch};
use lloyd_testing::datagen::generate_random_array_with_seed;

const DIMENSION: usize = 128;
const TOTAL: usize = 256 * 1024;

fn bench_distance(c: &mut Criterion) {
    let key = generate_random_array_with_seed(DIMENSION, 0);
    let target = generate_random_array_with_seed(TOTAL * DIMENSION, 42);

    c.bench_function("L2(per vector)", |b| {
        b.iter(|| {
            for y in target.values().chunks_exact(DIMENSION) {
                black_box(l2_distance(key.values(), y));
            }
        })
    });

    c.bench_function("L2(batch)", |b| {
        b.iter(|| {
            black_box(l2_distance_batch(key.values(), target.values(), DIMENSION).sum::<f64>());
        })
    });
}

#[cfg(target_os = "linux")]
criterion_group!(
    name=benches;
    config = Criterion::default().significance_level(0.1).sample_size(10)
    .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = bench_distance);

#[cfg(not(target_os = "linux"))]
criterion_group!(
    name=benches;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = bench_distance);
criterion_main!(benches);
