// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The Lloyd Authors

//! Shared types for the Lloyd K-means crates.

pub mod error;

pub use error::{Error, Result};
