//! Selections.
//!
//! A [`Selection`] is a resolved, non-negative description of a region of an array: one [`DimensionSelection`] per dimension.
//! It is the output of the coordinate transform in [`BoundingBox::transform`](crate::bounding_box::BoundingBox::transform) and the input to the raw read and write methods of a [`DataSet`](crate::array::DataSet).
//!
//! A dimension addressed by a single [`DimensionSelection::Index`] is squeezed from the [`shape`](Selection::shape) of the data read or written.

use std::num::NonZeroU64;

use derive_more::{Deref, Display, From};
use itertools::{izip, Itertools};

use crate::{
    array::{ArrayIndices, ArrayShape},
    array_subset::{ravel_indices, ArraySubset, IncompatibleDimensionalityError},
};

/// A strided range `start..stop` with step `step`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
#[display("{start}..{stop}:{step}")]
pub struct SelectionRange {
    start: u64,
    stop: u64,
    step: NonZeroU64,
}

impl SelectionRange {
    /// Create a new selection range.
    ///
    /// A `stop` before `start` is clamped to `start`, giving an empty range.
    #[must_use]
    pub fn new(start: u64, stop: u64, step: NonZeroU64) -> Self {
        Self {
            start,
            stop: std::cmp::max(start, stop),
            step,
        }
    }

    /// Create a new selection range with a step of 1.
    #[must_use]
    pub fn new_contiguous(start: u64, stop: u64) -> Self {
        Self::new(start, stop, NonZeroU64::MIN)
    }

    /// Return the start of the range.
    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Return the stop (exclusive) of the range.
    #[must_use]
    pub const fn stop(&self) -> u64 {
        self.stop
    }

    /// Return the step of the range.
    #[must_use]
    pub const fn step(&self) -> NonZeroU64 {
        self.step
    }

    /// Return the number of selected elements.
    #[must_use]
    pub fn len(&self) -> u64 {
        (self.stop - self.start).div_ceil(self.step.get())
    }

    /// Returns true if no elements are selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the last selected element, if any.
    #[must_use]
    pub fn last(&self) -> Option<u64> {
        self.len()
            .checked_sub(1)
            .map(|n| self.start + n * self.step.get())
    }

    /// Return the selected element at position `n`.
    #[must_use]
    pub fn nth(&self, n: u64) -> u64 {
        self.start + n * self.step.get()
    }

    /// Return the positions `n` (as a contiguous range) of the selected elements within `start..stop`.
    #[must_use]
    pub fn positions_within(&self, start: u64, stop: u64) -> std::ops::Range<u64> {
        let step = self.step.get();
        let first = start.saturating_sub(self.start).div_ceil(step);
        let last = stop.saturating_sub(self.start).div_ceil(step);
        let len = self.len();
        let first = std::cmp::min(first, len);
        let last = std::cmp::min(last, len);
        first..std::cmp::max(first, last)
    }
}

/// The selection of a single dimension.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, From)]
pub enum DimensionSelection {
    /// A single element. The dimension is squeezed from the output shape.
    #[display("{_0}")]
    Index(u64),
    /// A strided range of elements.
    #[display("{_0}")]
    Range(SelectionRange),
}

impl DimensionSelection {
    /// Return the number of selected elements.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Index(_) => 1,
            Self::Range(range) => range.len(),
        }
    }

    /// Returns true if no elements are selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the first selected element, which may be past the end for an empty range.
    #[must_use]
    pub fn first(&self) -> u64 {
        match self {
            Self::Index(index) => *index,
            Self::Range(range) => range.start(),
        }
    }

    /// Return the exclusive end of the selected elements.
    #[must_use]
    pub fn end(&self) -> u64 {
        match self {
            Self::Index(index) => index + 1,
            Self::Range(range) => range.last().map_or(range.start(), |last| last + 1),
        }
    }

    /// Return the step between selected elements.
    #[must_use]
    pub fn step(&self) -> u64 {
        match self {
            Self::Index(_) => 1,
            Self::Range(range) => range.step().get(),
        }
    }

    /// Return the selected element at position `n`.
    #[must_use]
    pub fn nth(&self, n: u64) -> u64 {
        match self {
            Self::Index(index) => *index,
            Self::Range(range) => range.nth(n),
        }
    }

    /// Return the selection moved from an origin at `from` to an origin at `to`.
    ///
    /// Every selected element must be at or after `from`.
    #[must_use]
    pub fn rebase(&self, from: u64, to: u64) -> Self {
        let rebase = |value: u64| value - from + to;
        match self {
            Self::Index(index) => Self::Index(rebase(*index)),
            Self::Range(range) => Self::Range(SelectionRange::new(
                rebase(range.start()),
                rebase(range.stop()),
                range.step(),
            )),
        }
    }

    /// Return the selection translated by `offset`.
    #[must_use]
    pub fn offset(&self, offset: u64) -> Self {
        match self {
            Self::Index(index) => Self::Index(index + offset),
            Self::Range(range) => Self::Range(SelectionRange::new(
                range.start() + offset,
                range.stop() + offset,
                range.step(),
            )),
        }
    }

    /// Return the positions of the selected elements falling in `start..stop`, and the sub-selection of those elements.
    #[must_use]
    pub fn restrict(&self, start: u64, stop: u64) -> (std::ops::Range<u64>, Self) {
        match self {
            Self::Index(index) => {
                if (start..stop).contains(index) {
                    (0..1, *self)
                } else {
                    (0..0, *self)
                }
            }
            Self::Range(range) => {
                let positions = range.positions_within(start, stop);
                let first = range.nth(positions.start);
                let end = if positions.is_empty() {
                    first
                } else {
                    range.nth(positions.end - 1) + 1
                };
                let restricted = SelectionRange::new(first, end, range.step());
                (positions, Self::Range(restricted))
            }
        }
    }
}

/// A selection of an array: one [`DimensionSelection`] per dimension.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deref, From)]
pub struct Selection(Vec<DimensionSelection>);

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

impl From<&ArraySubset> for Selection {
    fn from(subset: &ArraySubset) -> Self {
        Self(
            std::iter::zip(subset.start(), subset.shape())
                .map(|(&start, &size)| {
                    DimensionSelection::Range(SelectionRange::new_contiguous(start, start + size))
                })
                .collect(),
        )
    }
}

impl Selection {
    /// Create a new selection.
    #[must_use]
    pub fn new(dimensions: Vec<DimensionSelection>) -> Self {
        Self(dimensions)
    }

    /// Create a selection of every element of an array with `array_shape`.
    #[must_use]
    pub fn new_with_shape(array_shape: &[u64]) -> Self {
        Self::from(&ArraySubset::new_with_shape(array_shape.to_vec()))
    }

    /// Return the per-dimension selections.
    #[must_use]
    pub fn dimensions(&self) -> &[DimensionSelection] {
        &self.0
    }

    /// Return the dimensionality of the selection.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.0.len()
    }

    /// Return the shape of the selected data, excluding dimensions addressed by a single index.
    #[must_use]
    pub fn shape(&self) -> ArrayShape {
        self.0
            .iter()
            .filter_map(|dimension| match dimension {
                DimensionSelection::Index(_) => None,
                DimensionSelection::Range(range) => Some(range.len()),
            })
            .collect()
    }

    /// Return the shape of the selected data, including dimensions addressed by a single index (with length 1).
    #[must_use]
    pub fn unsqueezed_shape(&self) -> ArrayShape {
        self.0.iter().map(DimensionSelection::len).collect()
    }

    /// Return the number of selected elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.0.iter().map(DimensionSelection::len).product()
    }

    /// Returns true if the selection is within the bounds of `array_shape`.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && std::iter::zip(&self.0, array_shape).all(|(dimension, &shape)| match dimension {
                DimensionSelection::Index(index) => *index < shape,
                DimensionSelection::Range(range) => range.is_empty() || range.stop() <= shape,
            })
    }

    /// Return the selection translated by `origin`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `origin` does not match the selection dimensionality.
    pub fn offset(&self, origin: &[u64]) -> Result<Self, IncompatibleDimensionalityError> {
        if origin.len() == self.dimensionality() {
            Ok(Self(
                std::iter::zip(&self.0, origin)
                    .map(|(dimension, &origin)| dimension.offset(origin))
                    .collect(),
            ))
        } else {
            Err(IncompatibleDimensionalityError::new(
                origin.len(),
                self.dimensionality(),
            ))
        }
    }

    /// Return the smallest array subset enclosing every selected element.
    #[must_use]
    pub fn bounding_subset(&self) -> ArraySubset {
        let ranges = self
            .0
            .iter()
            .map(|dimension| dimension.first()..dimension.end())
            .collect::<Vec<_>>();
        ArraySubset::new_with_ranges(&ranges)
    }

    /// Returns the runs of contiguous elements of the selection in an array with `array_shape`.
    ///
    /// Each run is a tuple: (linearised index, # contiguous elements).
    /// Runs are ordered as the elements of the selection in row-major order.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `array_shape` does not match the selection dimensionality.
    pub fn contiguous_linearised_indices(
        &self,
        array_shape: &[u64],
    ) -> Result<Vec<(u64, u64)>, IncompatibleDimensionalityError> {
        if array_shape.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                array_shape.len(),
                self.dimensionality(),
            ));
        }
        if self.num_elements() == 0 {
            return Ok(vec![]);
        }
        let Some(inner) = self.0.last() else {
            // zero dimensional
            return Ok(vec![(0, 1)]);
        };
        let outer = &self.0[..self.0.len() - 1];
        let (run_length, runs_per_row) = if inner.step() == 1 {
            (inner.len(), 1)
        } else {
            (1, inner.len())
        };

        let outer_counts: Vec<u64> = outer.iter().map(DimensionSelection::len).collect();
        let num_rows: u64 = outer_counts.iter().product();
        let mut runs = Vec::with_capacity(usize::try_from(num_rows * runs_per_row).unwrap_or(0));
        let mut position: ArrayIndices = vec![0; outer.len()];
        let mut indices: ArrayIndices = vec![0; self.dimensionality()];
        for _ in 0..num_rows {
            for (index, dimension, &n) in izip!(indices.iter_mut(), outer, &position) {
                *index = dimension.nth(n);
            }
            for n in 0..runs_per_row {
                indices[self.dimensionality() - 1] = inner.nth(n);
                runs.push((ravel_indices(&indices, array_shape), run_length));
            }
            // Advance the row-major odometer over the outer dimensions
            for (n, &count) in position.iter_mut().zip(&outer_counts).rev() {
                *n += 1;
                if *n < count {
                    break;
                }
                *n = 0;
            }
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u64, stop: u64, step: u64) -> DimensionSelection {
        DimensionSelection::Range(SelectionRange::new(
            start,
            stop,
            NonZeroU64::new(step).unwrap(),
        ))
    }

    #[test]
    fn selection_range() {
        let r = SelectionRange::new(1, 8, NonZeroU64::new(3).unwrap());
        assert_eq!(r.len(), 3); // 1, 4, 7
        assert_eq!(r.last(), Some(7));
        assert_eq!(r.positions_within(2, 8), 1..3);
        assert_eq!(r.positions_within(0, 1), 0..0);
        assert_eq!(r.positions_within(5, 7), 2..2);
        assert_eq!(r.positions_within(5, 8), 2..3);
        assert!(SelectionRange::new_contiguous(4, 2).is_empty());
    }

    #[test]
    fn selection_shape() {
        let selection = Selection::new(vec![DimensionSelection::Index(2), range(0, 10, 2), range(3, 5, 1)]);
        assert_eq!(selection.shape(), vec![5, 2]);
        assert_eq!(selection.unsqueezed_shape(), vec![1, 5, 2]);
        assert_eq!(selection.num_elements(), 10);
        assert!(selection.inbounds(&[3, 10, 5]));
        assert!(!selection.inbounds(&[2, 10, 5]));
        assert!(!selection.inbounds(&[3, 10, 4]));
        assert_eq!(
            selection.bounding_subset(),
            ArraySubset::new_with_ranges(&[2..3, 0..9, 3..5])
        );
        assert_eq!(selection.to_string(), "[2, 0..10:2, 3..5:1]");
    }

    #[test]
    fn selection_contiguous_linearised_indices() {
        //  0  1  2  3
        //  4  5  6  7
        //  8  9 10 11
        // 12 13 14 15
        let selection = Selection::new(vec![range(1, 3, 1), range(1, 3, 1)]);
        assert_eq!(
            selection.contiguous_linearised_indices(&[4, 4]).unwrap(),
            vec![(5, 2), (9, 2)]
        );
        let selection = Selection::new(vec![range(0, 4, 2), range(0, 4, 3)]);
        assert_eq!(
            selection.contiguous_linearised_indices(&[4, 4]).unwrap(),
            vec![(0, 1), (3, 1), (8, 1), (11, 1)]
        );
        let selection = Selection::new(vec![DimensionSelection::Index(3), range(1, 4, 1)]);
        assert_eq!(
            selection.contiguous_linearised_indices(&[4, 4]).unwrap(),
            vec![(13, 3)]
        );
        let selection = Selection::new(vec![range(2, 2, 1), range(1, 4, 1)]);
        assert!(selection
            .contiguous_linearised_indices(&[4, 4])
            .unwrap()
            .is_empty());
        assert!(selection.contiguous_linearised_indices(&[4]).is_err());
        assert_eq!(
            Selection::new(vec![]).contiguous_linearised_indices(&[]).unwrap(),
            vec![(0, 1)]
        );
    }

    #[test]
    fn dimension_selection_restrict() {
        let dimension = range(1, 10, 3); // 1, 4, 7
        assert_eq!(dimension.restrict(3, 8), (1..3, range(4, 8, 3)));
        assert_eq!(dimension.restrict(8, 9).0, 3..3);
        assert_eq!(
            DimensionSelection::Index(4).restrict(0, 5),
            (0..1, DimensionSelection::Index(4))
        );
        assert_eq!(DimensionSelection::Index(4).restrict(0, 4).0, 0..0);
        assert_eq!(range(4, 8, 3).rebase(4, 0), range(0, 4, 3));
        assert_eq!(DimensionSelection::Index(6).rebase(5, 10), DimensionSelection::Index(11));
    }
}
