// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The Lloyd Authors

//! Distance metrics
//!
//! K-means only needs the squared Euclidean (L2) distance. `f32` and `f64`
//! slices are supported; the scalar loops are left to compiler auto-vectorization.

pub mod l2;

pub use l2::*;
