// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The Lloyd Authors

//! Test utilities shared by the Lloyd crates.

pub mod datagen;
