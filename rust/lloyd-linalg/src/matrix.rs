// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The Lloyd Authors

//! Dense, row-major `N x D` matrix of `f32` samples.

use std::sync::Arc;

use arrow_array::{
    cast::AsArray, types::Float32Type, Array, ArrayRef, FixedSizeListArray, Float32Array,
};
use arrow_schema::{DataType, Field};

use crate::{Error, Result};

/// An immutable collection of `N` samples of dimension `D`.
///
/// Values are stored row-major in one contiguous [`Float32Array`], so cloning a
/// [`Dataset`] is cheap. Every value is finite; every row has exactly
/// `dimension` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    data: Arc<Float32Array>,
    dimension: usize,
}

impl Dataset {
    /// Create a [`Dataset`] from a flat, row-major array.
    ///
    /// The length of `data` must be a multiple of `dimension`. An empty array is
    /// accepted and yields a dataset with zero rows.
    pub fn try_new(data: Float32Array, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::invalid_input("vector dimension must be at least 1"));
        }
        if data.len() % dimension != 0 {
            return Err(Error::invalid_input(format!(
                "data length {} is not a multiple of dimension {}",
                data.len(),
                dimension
            )));
        }
        if data.null_count() > 0 {
            return Err(Error::invalid_input(format!(
                "data contains {} null values",
                data.null_count()
            )));
        }
        if let Some(pos) = data.values().iter().position(|v| !v.is_finite()) {
            return Err(Error::invalid_input(format!(
                "non-finite value {} at row {}, column {}",
                data.value(pos),
                pos / dimension,
                pos % dimension
            )));
        }
        Ok(Self {
            data: Arc::new(data),
            dimension,
        })
    }

    /// Create a [`Dataset`] from a list of rows.
    ///
    /// All rows must have the same, non-zero length.
    pub fn try_from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(Error::invalid_input("dataset is empty"));
        };
        let dimension = first.as_ref().len();
        let mut values = Vec::with_capacity(rows.len() * dimension);
        for (idx, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != dimension {
                return Err(Error::invalid_input(format!(
                    "inconsistent dimensionality: row {} has {} values, expected {}",
                    idx,
                    row.len(),
                    dimension
                )));
            }
            values.extend_from_slice(row);
        }
        Self::try_new(Float32Array::from(values), dimension)
    }

    /// Build from values produced inside this crate, which are known to be
    /// well-formed.
    pub(crate) fn from_values(values: Vec<f32>, dimension: usize) -> Self {
        debug_assert!(dimension > 0 && values.len() % dimension == 0);
        Self {
            data: Arc::new(Float32Array::from(values)),
            dimension,
        }
    }

    /// Number of samples (rows).
    pub fn num_rows(&self) -> usize {
        self.data.len() / self.dimension
    }

    /// Dimension of each sample (columns).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The `i`-th sample.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.num_rows()`.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data.values()[i * self.dimension..(i + 1) * self.dimension]
    }

    /// Iterate over all samples in order.
    pub fn iter(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.values().chunks_exact(self.dimension)
    }

    /// Flat, row-major values.
    pub fn values(&self) -> &[f32] {
        self.data.values()
    }

    /// Copy the rows into a `FixedSizeList<Float32>` array.
    pub fn to_fixed_size_list(&self) -> Result<FixedSizeListArray> {
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let values: ArrayRef = self.data.clone();
        Ok(FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            values,
            None,
        )?)
    }
}

impl TryFrom<&FixedSizeListArray> for Dataset {
    type Error = Error;

    fn try_from(fsl: &FixedSizeListArray) -> Result<Self> {
        if !matches!(fsl.value_type(), DataType::Float32) {
            return Err(Error::invalid_input(format!(
                "vectors must be Float32, got: {}",
                fsl.value_type()
            )));
        }
        if fsl.null_count() > 0 {
            return Err(Error::invalid_input(format!(
                "{} of {} vectors are null",
                fsl.null_count(),
                fsl.len()
            )));
        }
        let values = fsl.values().as_primitive::<Float32Type>().clone();
        Self::try_new(values, fsl.value_length() as usize)
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a [f32];
    type IntoIter = std::slice::ChunksExact<'a, f32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let data =
            Dataset::try_from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(data.num_rows(), 3);
        assert_eq!(data.dimension(), 2);
        assert_eq!(data.row(1), &[3.0, 4.0]);
        assert_eq!(data.iter().count(), 3);
        assert_eq!(data.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_ragged_rows() {
        let err = Dataset::try_from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
        assert!(err.to_string().contains("row 1 has 1 values"));
    }

    #[test]
    fn test_empty_rows() {
        let rows: Vec<Vec<f32>> = vec![];
        assert!(matches!(
            Dataset::try_from_rows(&rows),
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            Dataset::try_from_rows(&[Vec::<f32>::new()]),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_empty_flat_array_is_representable() {
        let data = Dataset::try_new(Float32Array::from(Vec::<f32>::new()), 4).unwrap();
        assert!(data.is_empty());
        assert_eq!(data.num_rows(), 0);
    }

    #[test]
    fn test_flat_wrong_length() {
        let err = Dataset::try_new(Float32Array::from(vec![1.0, 2.0, 3.0]), 2).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
        assert!(Dataset::try_new(Float32Array::from(vec![1.0]), 0).is_err());
    }

    #[test]
    fn test_non_finite() {
        let err = Dataset::try_from_rows(&[[0.0, 1.0], [f32::NAN, 2.0]]).unwrap_err();
        assert!(err.to_string().contains("row 1, column 0"));
        assert!(Dataset::try_from_rows(&[[f32::INFINITY]]).is_err());
    }

    #[test]
    fn test_nulls() {
        let data = Float32Array::from(vec![Some(1.0), None]);
        assert!(matches!(
            Dataset::try_new(data, 1),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_fixed_size_list_roundtrip() {
        let data = Dataset::try_from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        let fsl = data.to_fixed_size_list().unwrap();
        assert_eq!(fsl.len(), 2);
        assert_eq!(fsl.value_length(), 3);

        let back = Dataset::try_from(&fsl).unwrap();
        assert_eq!(back, data);

        let sliced = fsl.slice(1, 1);
        let back = Dataset::try_from(&sliced).unwrap();
        assert_eq!(back.num_rows(), 1);
        assert_eq!(back.row(0), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_fixed_size_list_wrong_type() {
        let field = Arc::new(Field::new("item", DataType::Int32, true));
        let values: ArrayRef = Arc::new(arrow_array::Int32Array::from(vec![1, 2, 3, 4]));
        let fsl = FixedSizeListArray::try_new(field, 2, values, None).unwrap();
        let err = Dataset::try_from(&fsl).unwrap_err();
        assert!(err.to_string().contains("Float32"));
    }
}
