use std::iter::FusedIterator;

use itertools::izip;

use crate::array::ArrayIndices;

use super::{ravel_indices, ArraySubset, IncompatibleArraySubsetAndShapeError};

/// Iterates over element indices in an array subset.
///
/// Indices are produced in row-major (C) order.
pub struct IndicesIterator {
    subset: ArraySubset,
    index: u64,
    length: u64,
}

impl IndicesIterator {
    /// Create a new indices iterator.
    #[must_use]
    pub fn new(subset: ArraySubset) -> Self {
        let length = subset.num_elements();
        Self {
            subset,
            index: 0,
            length,
        }
    }
}

impl Iterator for IndicesIterator {
    type Item = ArrayIndices;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.length {
            return None;
        }
        let mut current = self.index;
        let mut indices = vec![0; self.subset.dimensionality()];
        for (out, &subset_start, &subset_size) in izip!(
            indices.iter_mut().rev(),
            self.subset.start().iter().rev(),
            self.subset.shape().iter().rev(),
        ) {
            *out = current % subset_size + subset_start;
            current /= subset_size;
        }
        self.index += 1;
        Some(indices)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.length - self.index).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IndicesIterator {}

impl FusedIterator for IndicesIterator {}

/// Iterates over contiguous linearised element indices in an array subset.
///
/// The iterator item is a tuple: (linearised index, # contiguous elements).
pub struct ContiguousLinearisedIndicesIterator<'a> {
    inner: IndicesIterator,
    array_shape: &'a [u64],
    contiguous_elements: u64,
}

impl<'a> ContiguousLinearisedIndicesIterator<'a> {
    /// Create a new contiguous linearised indices iterator.
    ///
    /// # Errors
    /// Returns [`IncompatibleArraySubsetAndShapeError`] if `array_shape` does not encapsulate `subset`.
    pub fn new(
        subset: &ArraySubset,
        array_shape: &'a [u64],
    ) -> Result<Self, IncompatibleArraySubsetAndShapeError> {
        if !subset.inbounds(array_shape) {
            return Err(IncompatibleArraySubsetAndShapeError::new(
                subset.clone(),
                array_shape.to_vec(),
            ));
        }

        // Trailing dimensions spanning the whole array collapse into a single run
        let mut contiguous = true;
        let mut contiguous_elements = 1;
        let mut shape_outer = vec![0; array_shape.len()];
        for (&subset_start, &subset_size, &array_size, shape_outer_i) in izip!(
            subset.start().iter().rev(),
            subset.shape().iter().rev(),
            array_shape.iter().rev(),
            shape_outer.iter_mut().rev(),
        ) {
            if contiguous {
                contiguous_elements *= subset_size;
                *shape_outer_i = 1;
                contiguous = subset_start == 0 && subset_size == array_size;
            } else {
                *shape_outer_i = subset_size;
            }
        }
        if subset.is_empty() {
            shape_outer.fill(0);
        }
        let subset_outer = ArraySubset::new_with_start_shape(subset.start().to_vec(), shape_outer)
            .map_err(|_| {
                IncompatibleArraySubsetAndShapeError::new(subset.clone(), array_shape.to_vec())
            })?;
        Ok(Self {
            inner: subset_outer.iter_indices(),
            array_shape,
            contiguous_elements,
        })
    }

    /// Return the number of contiguous elements (fixed on each iteration).
    #[must_use]
    pub fn contiguous_elements(&self) -> u64 {
        self.contiguous_elements
    }
}

impl Iterator for ContiguousLinearisedIndicesIterator<'_> {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|indices| {
            (
                ravel_indices(&indices, self.array_shape),
                self.contiguous_elements,
            )
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ContiguousLinearisedIndicesIterator<'_> {}

impl FusedIterator for ContiguousLinearisedIndicesIterator<'_> {}
