// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The Lloyd Authors

//! K-means clustering (Lloyd's algorithm) over [Apache Arrow](https://docs.rs/arrow/latest/arrow/)
//! backed dense vectors.
//!
//! ```
//! use lloyd_linalg::{kmeans::{KMeans, KMeansParams}, matrix::Dataset};
//!
//! let data = Dataset::try_from_rows(&[[0.0, 0.0], [0.0, 1.0], [10.0, 0.0], [10.0, 1.0]])?;
//! let params = KMeansParams {
//!     seed: Some(42),
//!     ..Default::default()
//! };
//! let mut kmeans = KMeans::try_new(2, params)?;
//! let labels = kmeans.fit_predict(&data)?;
//! assert_eq!(labels.len(), 4);
//! assert!(labels.iter().all(|l| *l < 2));
//! println!("inertia: {}", kmeans.inertia()?);
//! # Ok::<(), lloyd_linalg::Error>(())
//! ```

pub mod distance;
pub mod elbow;
pub mod kernels;
pub mod kmeans;
pub mod matrix;

pub use lloyd_core::{Error, Result};
pub use matrix::Dataset;
