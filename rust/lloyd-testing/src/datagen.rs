// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The Lloyd Authors

//! Data generation utilities for unit tests and benchmarks

use std::iter::repeat_with;

use arrow_array::Float32Array;
use rand::{distributions::Uniform, prelude::Distribution, rngs::StdRng, Rng, SeedableRng};

/// Create a random float32 array where each element is uniformly
/// distributed between [0..1]
pub fn generate_random_array(n: usize) -> Float32Array {
    let mut rng = rand::thread_rng();
    Float32Array::from_iter_values(repeat_with(|| rng.gen::<f32>()).take(n))
}

/// Same as [`generate_random_array`], reproducible from `seed`.
pub fn generate_random_array_with_seed(n: usize, seed: u64) -> Float32Array {
    let mut rng = StdRng::seed_from_u64(seed);
    Float32Array::from_iter_values(repeat_with(|| rng.gen::<f32>()).take(n))
}

/// Samples scattered around known centers, with the center each sample came from.
pub struct Blobs {
    /// Row-major values, `labels.len() * dimension` long.
    pub values: Float32Array,
    pub dimension: usize,
    /// Index of the center each sample was drawn around.
    pub labels: Vec<u32>,
}

/// Draw `samples_per_center` points around each center, every coordinate offset
/// uniformly in `[-spread, spread]`. Samples are interleaved across centers.
///
/// # Panics
///
/// Panics if `centers` is empty or the centers differ in dimension.
pub fn generate_blobs(
    centers: &[Vec<f32>],
    samples_per_center: usize,
    spread: f32,
    seed: u64,
) -> Blobs {
    assert!(!centers.is_empty(), "at least one center is required");
    let dimension = centers[0].len();
    assert!(centers.iter().all(|c| c.len() == dimension));

    let mut rng = StdRng::seed_from_u64(seed);
    let jitter = Uniform::new_inclusive(-spread, spread);
    let mut values = Vec::with_capacity(centers.len() * samples_per_center * dimension);
    let mut labels = Vec::with_capacity(centers.len() * samples_per_center);
    for _ in 0..samples_per_center {
        for (label, center) in centers.iter().enumerate() {
            values.extend(center.iter().map(|c| c + jitter.sample(&mut rng)));
            labels.push(label as u32);
        }
    }
    Blobs {
        values: Float32Array::from(values),
        dimension,
        labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_array_is_reproducible() {
        let a = generate_random_array_with_seed(64, 3);
        let b = generate_random_array_with_seed(64, 3);
        assert_eq!(a, b);
        assert!(a.values().iter().all(|v| (0.0..1.0).contains(v)));
        assert_eq!(generate_random_array(10).len(), 10);
    }

    #[test]
    fn test_blobs_stay_within_spread() {
        let centers = vec![vec![0.0, 0.0], vec![10.0, -10.0]];
        let blobs = generate_blobs(&centers, 5, 0.5, 1);
        assert_eq!(blobs.labels.len(), 10);
        assert_eq!(blobs.values.len(), 20);
        for (row, label) in blobs.values.values().chunks(2).zip(blobs.labels.iter()) {
            let center = &centers[*label as usize];
            for (v, c) in row.iter().zip(center.iter()) {
                assert!((v - c).abs() <= 0.5 + 1e-6);
            }
        }
    }
}
