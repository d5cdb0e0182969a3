//! Array subsets.
//!
//! An [`ArraySubset`] is a rectangular region of an array with a start and a shape.
//! It is used for the bounding box of a [`DataView`](crate::array::DataView), the source and target regions of a [`VirtualLayout`](crate::array::VirtualLayout), and when copying contiguous runs of bytes in and out of an array.
//!
//! This module provides convenience functions for:
//!  - computing the intersection of array subsets,
//!  - iterating over the indices or contiguous linearised indices of an array subset, and
//!  - extracting and storing the bytes within subsets of an array.

mod iterators;

pub use iterators::{ContiguousLinearisedIndicesIterator, IndicesIterator};

use std::ops::Range;

use derive_more::{Display, From};
use itertools::izip;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::array::{ArrayIndices, ArrayShape};

/// An array subset.
#[derive(
    Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Default, Serialize, Deserialize,
)]
#[display("start {start:?} shape {shape:?}")]
pub struct ArraySubset {
    /// The start of the array subset.
    start: ArrayIndices,
    /// The shape of the array subset.
    shape: ArrayShape,
}

/// An array extract bytes error.
#[derive(Debug, Error)]
#[error("array subset {_0} is incompatible with array of shape {_1:?} and element size {_2}")]
pub struct ArrayExtractBytesError(ArraySubset, ArrayShape, usize);

/// An array store bytes error.
#[derive(Debug, Error)]
pub enum ArrayStoreBytesError {
    /// Invalid array shape.
    #[error("array shape {_1:?} is incompatible with array subset {_0}")]
    InvalidArrayShape(ArraySubset, ArrayShape),
    /// Invalid subset bytes.
    #[error("expected subset bytes to have length {_1}, got {_0}")]
    InvalidSubsetBytes(usize, usize),
    /// Invalid array bytes.
    #[error("expected array bytes to have length {_1}, got {_0}")]
    InvalidArrayBytes(usize, usize),
}

impl ArraySubset {
    /// Create a new array subset with `shape` starting at the origin.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new array subset from a list of [`Range`]s.
    #[must_use]
    pub fn new_with_ranges(ranges: &[Range<u64>]) -> Self {
        let start = ranges.iter().map(|range| range.start).collect();
        let shape = ranges
            .iter()
            .map(|range| range.end.saturating_sub(range.start))
            .collect();
        Self { start, shape }
    }

    /// Create a new array subset.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `start` and `shape` do not match.
    pub fn new_with_start_shape(
        start: ArrayIndices,
        shape: ArrayShape,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError::new(
                start.len(),
                shape.len(),
            ))
        }
    }

    /// Create a new array subset from a start and end (exclusive).
    ///
    /// An end before its start yields an empty extent in that dimension.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `start` and `end` do not match.
    pub fn new_with_start_end_exc(
        start: ArrayIndices,
        end: ArrayIndices,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == end.len() {
            let shape = std::iter::zip(&start, end)
                .map(|(&start, end)| end.saturating_sub(start))
                .collect();
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError::new(start.len(), end.len()))
        }
    }

    /// Return the start of the array subset.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the shape of the array subset.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the dimensionality of the array subset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the end (exclusive) of the array subset.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        std::iter::zip(&self.start, &self.shape)
            .map(|(start, size)| start + size)
            .collect()
    }

    /// Return the array subset as a list of [`Range`]s.
    #[must_use]
    pub fn to_ranges(&self) -> Vec<Range<u64>> {
        std::iter::zip(&self.start, &self.shape)
            .map(|(&start, &size)| start..start + size)
            .collect()
    }

    /// Return the number of elements of the array subset.
    ///
    /// Equal to the product of the components of its shape.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Returns true if the array subset contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.iter().any(|&size| size == 0)
    }

    /// Returns true if the array subset is within the bounds of `array_shape`.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && izip!(self.start(), self.shape(), array_shape)
                .all(|(start, size, shape)| start + size <= *shape)
    }

    /// Return the intersection of this array subset and `subset_other`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionality of `subset_other` does not match the dimensionality of this array subset.
    pub fn overlap(&self, subset_other: &Self) -> Result<Self, IncompatibleDimensionalityError> {
        if subset_other.dimensionality() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                subset_other.dimensionality(),
                self.dimensionality(),
            ));
        }
        let mut start = Vec::with_capacity(self.dimensionality());
        let mut end = Vec::with_capacity(self.dimensionality());
        for (range, range_other) in std::iter::zip(self.to_ranges(), subset_other.to_ranges()) {
            let overlap_start = std::cmp::max(range.start, range_other.start);
            let overlap_end = std::cmp::min(range.end, range_other.end);
            start.push(overlap_start);
            end.push(std::cmp::max(overlap_start, overlap_end));
        }
        Self::new_with_start_end_exc(start, end)
    }

    /// Returns an iterator over the indices of elements within the subset.
    #[must_use]
    pub fn iter_indices(&self) -> IndicesIterator {
        IndicesIterator::new(self.clone())
    }

    /// Returns an iterator over the linearised indices of contiguous elements within the subset.
    ///
    /// The iterator item is a tuple: (linearised index, # contiguous elements).
    ///
    /// # Errors
    /// Returns [`IncompatibleArraySubsetAndShapeError`] if the `array_shape` does not encapsulate this array subset.
    pub fn iter_contiguous_linearised_indices<'a>(
        &self,
        array_shape: &'a [u64],
    ) -> Result<ContiguousLinearisedIndicesIterator<'a>, IncompatibleArraySubsetAndShapeError> {
        ContiguousLinearisedIndicesIterator::new(self, array_shape)
    }

    /// Return the bytes in this array subset from an array with shape `array_shape` and `element_size`.
    ///
    /// # Errors
    /// Returns [`ArrayExtractBytesError`] if the length of `bytes` is not compatible with `array_shape` and `element_size`, or the array subset is outside of the bounds of `array_shape`.
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<Vec<u8>, ArrayExtractBytesError> {
        let err = || ArrayExtractBytesError(self.clone(), array_shape.to_vec(), element_size);
        let array_bytes = usize::try_from(array_shape.iter().product::<u64>())
            .map_err(|_| err())?
            * element_size;
        if bytes.len() != array_bytes {
            return Err(err());
        }
        let iter = self
            .iter_contiguous_linearised_indices(array_shape)
            .map_err(|_| err())?;
        let num_bytes = usize::try_from(self.num_elements()).map_err(|_| err())? * element_size;
        let mut bytes_subset = Vec::with_capacity(num_bytes);
        for (array_index, contiguous_elements) in iter {
            let byte_offset = usize::try_from(array_index).map_err(|_| err())? * element_size;
            let byte_length =
                usize::try_from(contiguous_elements).map_err(|_| err())? * element_size;
            bytes_subset.extend_from_slice(&bytes[byte_offset..byte_offset + byte_length]);
        }
        Ok(bytes_subset)
    }

    /// Store `bytes_subset` corresponding to the bytes of an array (`bytes_array`) with shape `array_shape` and `element_size`.
    ///
    /// # Errors
    /// Returns [`ArrayStoreBytesError`] if:
    ///  - the length of `array_shape` does not match the array subset dimensionality or the array subset is outside of the bounds of `array_shape`,
    ///  - the length of `bytes_array` is not compatible with the `array_shape` and `element_size`, or
    ///  - the length of `bytes_subset` is not compatible with the shape of this subset and `element_size`.
    pub fn store_bytes(
        &self,
        bytes_subset: &[u8],
        bytes_array: &mut [u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<(), ArrayStoreBytesError> {
        let element_size_u64 = element_size as u64;
        let expected_subset_size = self.num_elements() * element_size_u64;
        let expected_array_size = array_shape.iter().product::<u64>() * element_size_u64;
        if bytes_subset.len() as u64 != expected_subset_size {
            return Err(ArrayStoreBytesError::InvalidSubsetBytes(
                bytes_subset.len(),
                usize::try_from(expected_subset_size).unwrap_or(usize::MAX),
            ));
        }
        if bytes_array.len() as u64 != expected_array_size {
            return Err(ArrayStoreBytesError::InvalidArrayBytes(
                bytes_array.len(),
                usize::try_from(expected_array_size).unwrap_or(usize::MAX),
            ));
        }
        let iter = self
            .iter_contiguous_linearised_indices(array_shape)
            .map_err(|err| ArrayStoreBytesError::InvalidArrayShape(err.0, err.1))?;
        let mut offset = 0;
        for (array_index, contiguous_elements) in iter {
            // Both lengths were checked against usize above.
            let byte_index = (array_index * element_size_u64) as usize;
            let byte_length = (contiguous_elements * element_size_u64) as usize;
            bytes_array[byte_index..byte_index + byte_length]
                .copy_from_slice(&bytes_subset[offset..offset + byte_length]);
            offset += byte_length;
        }
        Ok(())
    }
}

impl From<Vec<Range<u64>>> for ArraySubset {
    fn from(ranges: Vec<Range<u64>>) -> Self {
        Self::new_with_ranges(&ranges)
    }
}

/// Return the linearised index of `indices` in a row-major array with `array_shape`.
#[must_use]
pub fn ravel_indices(indices: &[u64], array_shape: &[u64]) -> u64 {
    let mut index: u64 = 0;
    let mut count = 1;
    for (i, s) in std::iter::zip(indices, array_shape).rev() {
        index += i * count;
        count *= s;
    }
    index
}

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }

    /// Return the dimensionality that was supplied.
    #[must_use]
    pub const fn got(&self) -> usize {
        self.0
    }

    /// Return the dimensionality that was expected.
    #[must_use]
    pub const fn expected(&self) -> usize {
        self.1
    }
}

/// An incompatible array subset and array shape error.
#[derive(Clone, Debug, Error, From)]
#[error("incompatible array subset {0} with array shape {1:?}")]
pub struct IncompatibleArraySubsetAndShapeError(ArraySubset, ArrayShape);

impl IncompatibleArraySubsetAndShapeError {
    /// Create a new incompatible array subset and shape error.
    #[must_use]
    pub fn new(array_subset: ArraySubset, array_shape: ArrayShape) -> Self {
        Self(array_subset, array_shape)
    }
}
