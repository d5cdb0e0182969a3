//! The coordinate transform between a view and its backing array.
//!
//! A [`BoundingBox`] fixes the region of a backing array addressed by a [`DataView`](crate::array::DataView).
//! [`BoundingBox::transform`] maps an [`IndexExpression`] in the view-local coordinate space to a [`Selection`] in the backing coordinate space, failing if the result escapes the box.
//!
//! ```
//! # use nixio::bounding_box::BoundingBox;
//! # use nixio::indexer::{IndexExpression, Slice};
//! # use nixio::selection::{DimensionSelection, SelectionRange};
//! let bounding_box = BoundingBox::new(&[Slice::from(2..7)], &[10])?;
//! assert_eq!(bounding_box.data_extent(), vec![5]);
//!
//! let selection = bounding_box.transform(&IndexExpression::from(-1))?;
//! assert_eq!(selection.dimensions(), &[DimensionSelection::Index(6)]);
//!
//! let selection = bounding_box.transform(&IndexExpression::from(1..4))?;
//! assert_eq!(
//!     selection.dimensions(),
//!     &[DimensionSelection::Range(SelectionRange::new_contiguous(3, 6))]
//! );
//!
//! assert!(bounding_box.transform(&IndexExpression::from(5)).is_err());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{num::NonZeroU64, ops::Range};

use itertools::Itertools;
use thiserror::Error;

use crate::{
    array::ArrayShape,
    array_subset::{ArraySubset, IncompatibleDimensionalityError},
    indexer::{DimensionIndex, IndexError, IndexExpression, Slice},
    selection::{DimensionSelection, Selection, SelectionRange},
};

/// A data view creation error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DataViewCreateError {
    /// The number of bounding slices does not match the dimensionality of the backing array.
    #[error("number of dimensions for data view does not match the backing array: {}", .0)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// A bounding slice stops beyond the extent of the backing array.
    #[error("bounding slice {slice} in dimension {dimension} is out of bounds of the backing array with extent {extent}")]
    OutOfBounds {
        /// The dimension.
        dimension: usize,
        /// The offending bounding slice.
        slice: Slice,
        /// The extent of the backing array in `dimension`.
        extent: u64,
    },
    /// A bounding slice with a step other than 1.
    #[error("bounding slice {slice} in dimension {dimension} must have a step of 1")]
    InvalidStep {
        /// The dimension.
        dimension: usize,
        /// The offending bounding slice.
        slice: Slice,
    },
}

/// The immutable per-dimension `[start, stop)` ranges of a view within its backing array.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox(Vec<Range<u64>>);

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.iter().map(|r| format!("{}:{}", r.start, r.end)).join(", "))
    }
}

impl BoundingBox {
    /// Create a bounding box from `raw_slices` within an array with `extent`.
    ///
    /// Each slice is normalized against the extent of its dimension (resolving omitted and negative endpoints).
    /// A slice that stops before it starts is collapsed to an empty range.
    ///
    /// # Errors
    /// Returns a [`DataViewCreateError`] if
    ///  - the number of slices does not match the length of `extent`,
    ///  - a slice has a step other than 1, or
    ///  - a slice stops beyond `extent`.
    pub fn new(raw_slices: &[Slice], extent: &[u64]) -> Result<Self, DataViewCreateError> {
        if raw_slices.len() != extent.len() {
            return Err(IncompatibleDimensionalityError::new(raw_slices.len(), extent.len()).into());
        }
        let ranges = std::iter::zip(raw_slices, extent)
            .enumerate()
            .map(|(dimension, (slice, &extent))| {
                if slice.step_or_default() != 1 {
                    return Err(DataViewCreateError::InvalidStep {
                        dimension,
                        slice: *slice,
                    });
                }
                if slice
                    .stop
                    .is_some_and(|stop| stop > i64::try_from(extent).unwrap_or(i64::MAX))
                {
                    return Err(DataViewCreateError::OutOfBounds {
                        dimension,
                        slice: *slice,
                        extent,
                    });
                }
                let (start, stop, _) = slice
                    .indices(extent)
                    .map_err(|_| DataViewCreateError::InvalidStep {
                        dimension,
                        slice: *slice,
                    })?;
                // a unit step resolves within [0, extent]
                let start = start.unsigned_abs();
                let stop = stop.unsigned_abs();
                Ok(start..std::cmp::max(start, stop))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(ranges))
    }

    /// Create a bounding box from an array subset.
    #[must_use]
    pub fn from_subset(subset: &ArraySubset) -> Self {
        Self(subset.to_ranges())
    }

    /// Create a bounding box covering every element of an array with `extent`.
    #[must_use]
    pub fn new_with_extent(extent: &[u64]) -> Self {
        Self(extent.iter().map(|&extent| 0..extent).collect())
    }

    /// Return the per-dimension ranges in backing coordinates.
    #[must_use]
    pub fn ranges(&self) -> &[Range<u64>] {
        &self.0
    }

    /// Return the dimensionality of the bounding box.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.0.len()
    }

    /// Return the start of the bounding box in backing coordinates.
    #[must_use]
    pub fn start(&self) -> Vec<u64> {
        self.0.iter().map(|range| range.start).collect()
    }

    /// Return the extent of the bounding box: `stop - start` per dimension.
    #[must_use]
    pub fn data_extent(&self) -> ArrayShape {
        self.0.iter().map(|range| range.end - range.start).collect()
    }

    /// Convert the bounding box to an array subset in backing coordinates.
    #[must_use]
    pub fn to_subset(&self) -> ArraySubset {
        ArraySubset::new_with_ranges(&self.0)
    }

    /// Return a selection of the whole bounding box in backing coordinates.
    #[must_use]
    pub fn to_selection(&self) -> Selection {
        Selection::from(&self.to_subset())
    }

    /// Transform `expression` in the local coordinates of the bounding box to a selection in backing coordinates.
    ///
    /// Integers count from the start of the bounding box, or back from its stop if negative.
    /// Slices are resolved against the extent of the bounding box with Python slice semantics, then translated by its start.
    ///
    /// # Errors
    /// Returns an [`IndexError`] if
    ///  - the expression cannot be [expanded](IndexExpression::expand) to the dimensionality of the bounding box,
    ///  - a slice has a zero or negative step, or
    ///  - an integer or slice resolves outside of the bounding box.
    pub fn transform(&self, expression: &IndexExpression) -> Result<Selection, IndexError> {
        let expanded = expression.expand(self.dimensionality())?;
        let dimensions = std::iter::zip(expanded, &self.0)
            .enumerate()
            .map(|(dimension, (index, range))| transform_dimension(dimension, index, range))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Selection::new(dimensions))
    }
}

fn transform_dimension(
    dimension: usize,
    index: DimensionIndex,
    range: &Range<u64>,
) -> Result<DimensionSelection, IndexError> {
    let length = range.end - range.start;
    let length_i64 = i64::try_from(length).unwrap_or(i64::MAX);
    match index {
        DimensionIndex::Single(index) => {
            let local = if index < 0 {
                index.saturating_add(length_i64)
            } else {
                index
            };
            match u64::try_from(local) {
                Ok(local) if local < length => Ok(DimensionSelection::Index(range.start + local)),
                _ => Err(IndexError::IndexOutOfBounds {
                    dimension,
                    index,
                    start: range.start,
                    stop: range.end,
                }),
            }
        }
        DimensionIndex::Range(slice) => {
            let step = slice.step_or_default();
            let step = u64::try_from(step)
                .ok()
                .and_then(NonZeroU64::new)
                .ok_or(IndexError::InvalidStep { dimension, step })?;
            let (start, stop, _) = slice.indices(length)?;
            // a positive step resolves within [0, length]
            let start = range.start + start.unsigned_abs();
            let stop = range.start + stop.unsigned_abs();
            if start < range.start || stop > range.end {
                return Err(IndexError::SliceOutOfBounds {
                    dimension,
                    slice,
                    start: range.start,
                    stop: range.end,
                });
            }
            Ok(DimensionSelection::Range(SelectionRange::new(start, stop, step)))
        }
        DimensionIndex::Wildcard => Ok(DimensionSelection::Range(
            SelectionRange::new_contiguous(range.start, range.end),
        )),
    }
}
