// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The Lloyd Authors

use num_traits::Float;

/// Returns the minimal value (float) and the index (argmin) from an Iterator.
///
/// Ties resolve to the lowest index: a later value only wins when it is
/// strictly smaller.
///
/// Return `None` if the iterator is empty or all are `NaN`.
pub fn argmin_value_float<T: Float>(iter: impl Iterator<Item = T>) -> Option<(u32, T)> {
    let mut min_idx = None;
    let mut min_value = T::infinity();
    for (idx, value) in iter.enumerate() {
        if value < min_value || (min_idx.is_none() && value == min_value) {
            min_value = value;
            min_idx = Some(idx as u32);
        }
    }
    min_idx.map(|idx| (idx, min_value))
}

/// Argmin over a float iterator.
///
/// Returns the index of the min value, lowest index on ties.
#[inline]
pub fn argmin_float<T: Float>(iter: impl Iterator<Item = T>) -> Option<u32> {
    argmin_value_float(iter).map(|(idx, _)| idx)
}
