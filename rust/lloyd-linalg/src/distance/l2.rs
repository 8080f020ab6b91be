// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The Lloyd Authors

//! L2 (Euclidean) distance.
//!
//! All functions here return the *squared* Euclidean distance, which is what
//! the assignment step and inertia are defined over. Take the square root when
//! the metric distance is needed.
//!
//! Sums are accumulated in `f64`. The squared difference of two finite `f32`
//! values can exceed `f32::MAX` but never `f64::MAX`, so the distance between
//! finite vectors stays finite.

use arrow_array::Float32Array;

/// Calculate the squared L2 distance between two vectors.
pub trait L2 {
    /// Calculate the squared L2 distance between two vectors.
    fn l2(&self, other: &Self) -> f64;
}

/// Squared L2 distance using scalar operations.
///
/// Rely on compiler auto-vectorization.
#[inline]
fn l2_scalar<T: Copy + Into<f64>>(from: &[T], to: &[T]) -> f64 {
    debug_assert_eq!(from.len(), to.len());
    from.iter()
        .zip(to.iter())
        .map(|(a, b)| {
            let d = (*a).into() - (*b).into();
            d * d
        })
        .sum::<f64>()
}

impl L2 for [f32] {
    #[inline]
    fn l2(&self, other: &[f32]) -> f64 {
        l2_scalar(self, other)
    }
}

impl L2 for [f64] {
    #[inline]
    fn l2(&self, other: &[f64]) -> f64 {
        l2_scalar(self, other)
    }
}

impl L2 for Float32Array {
    #[inline]
    fn l2(&self, other: &Self) -> f64 {
        self.values().l2(other.values())
    }
}

/// Compute the squared L2 distance between two vectors.
#[inline]
pub fn l2_distance(from: &[f32], to: &[f32]) -> f64 {
    from.l2(to)
}

/// Compute squared L2 distance between a vector and a batch of vectors.
///
/// Parameters
///
/// - `from`: the vector to compute distance from.
/// - `to`: a list of vectors to compute distance to, flattened row-major.
/// - `dimension`: the dimension of the vectors.
///
/// # Panics
///
/// Panics if `from` is not `dimension` long or `to` is not a multiple of it.
pub fn l2_distance_batch<'a>(
    from: &'a [f32],
    to: &'a [f32],
    dimension: usize,
) -> impl Iterator<Item = f64> + 'a {
    assert_eq!(from.len(), dimension);
    assert_eq!(to.len() % dimension, 0);

    to.chunks_exact(dimension).map(move |v| from.l2(v))
}
