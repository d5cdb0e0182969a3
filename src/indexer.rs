//! Index expressions.
//!
//! An [`IndexExpression`] is what a caller hands to [`DataSet::read`](crate::array::DataSet::read) or [`DataSet::write`](crate::array::DataSet::write) to address a region of an array.
//! Each element is an [`Index`]: an integer, a Python-style [`Slice`], or an ellipsis.
//!
//! Before it can be resolved against a [`BoundingBox`](crate::bounding_box::BoundingBox), an expression is [expanded](IndexExpression::expand) into exactly one [`DimensionIndex`] per dimension.
//!
//! Index expressions can be built from Rust values or parsed from text:
//! ```rust
//! # use nixio::indexer::{Index, IndexExpression, Slice};
//! let from_values = IndexExpression::from((1, Index::Ellipsis, Slice::new(Some(2), Some(5), Some(2))));
//! let from_text: IndexExpression = "1, ..., 2:5:2".parse()?;
//! assert_eq!(from_values, from_text);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod slice;

pub use slice::Slice;

use std::str::FromStr;

use derive_more::Deref;
use itertools::Itertools;
use thiserror::Error;

use crate::array_subset::IncompatibleDimensionalityError;

/// A single element of an [`IndexExpression`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Index {
    /// A single integer index. Negative values count back from the end of the dimension.
    Integer(i64),
    /// A range descriptor.
    Slice(Slice),
    /// Placeholder for as many full slices as needed to match the dimensionality.
    Ellipsis,
}

impl std::fmt::Display for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(index) => write!(f, "{index}"),
            Self::Slice(slice) => write!(f, "{slice}"),
            Self::Ellipsis => write!(f, "..."),
        }
    }
}

impl From<i64> for Index {
    fn from(index: i64) -> Self {
        Self::Integer(index)
    }
}

impl From<i32> for Index {
    fn from(index: i32) -> Self {
        Self::Integer(index.into())
    }
}

impl From<Slice> for Index {
    fn from(slice: Slice) -> Self {
        Self::Slice(slice)
    }
}

macro_rules! impl_index_from_range {
    ($range:ty) => {
        impl From<$range> for Index {
            fn from(range: $range) -> Self {
                Self::Slice(Slice::from(range))
            }
        }
    };
}

impl_index_from_range!(std::ops::Range<i32>);
impl_index_from_range!(std::ops::Range<i64>);
impl_index_from_range!(std::ops::RangeFrom<i32>);
impl_index_from_range!(std::ops::RangeFrom<i64>);
impl_index_from_range!(std::ops::RangeTo<i32>);
impl_index_from_range!(std::ops::RangeTo<i64>);
impl_index_from_range!(std::ops::RangeInclusive<i32>);
impl_index_from_range!(std::ops::RangeInclusive<i64>);
impl_index_from_range!(std::ops::RangeFull);

impl FromStr for Index {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token == "..." {
            Ok(Self::Ellipsis)
        } else if token.contains(':') {
            Ok(Self::Slice(token.parse()?))
        } else {
            token
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|_| IndexError::InvalidIndexType(token.to_string()))
        }
    }
}

/// The index of a single dimension after [expansion](IndexExpression::expand).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DimensionIndex {
    /// A single integer index.
    Single(i64),
    /// A range descriptor.
    Range(Slice),
    /// Select everything in this dimension.
    Wildcard,
}

/// An index expression: an ordered list of [`Index`] elements.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deref)]
pub struct IndexExpression(Vec<Index>);

impl IndexExpression {
    /// Create a new index expression.
    #[must_use]
    pub fn new(indices: Vec<Index>) -> Self {
        Self(indices)
    }

    /// Return the indices of the expression.
    #[must_use]
    pub fn indices(&self) -> &[Index] {
        &self.0
    }

    /// Expand the expression to exactly one [`DimensionIndex`] per dimension.
    ///
    /// An ellipsis is replaced by as many [`DimensionIndex::Wildcard`]s as needed to reach `dimensionality`.
    /// Without an ellipsis, the expression is padded on the right with [`DimensionIndex::Wildcard`]s.
    ///
    /// # Errors
    /// Returns [`IndexError::MultipleEllipsis`] if the expression contains more than one ellipsis.
    /// Returns [`IndexError::IncompatibleDimensionality`] if the expression addresses more than `dimensionality` dimensions.
    pub fn expand(&self, dimensionality: usize) -> Result<Vec<DimensionIndex>, IndexError> {
        let num_ellipsis = self.0.iter().filter(|index| **index == Index::Ellipsis).count();
        if num_ellipsis > 1 {
            return Err(IndexError::MultipleEllipsis(num_ellipsis));
        }
        let num_explicit = self.0.len() - num_ellipsis;
        if num_explicit > dimensionality {
            return Err(IncompatibleDimensionalityError::new(num_explicit, dimensionality).into());
        }
        let num_padding = dimensionality - num_explicit;

        let mut expanded = Vec::with_capacity(dimensionality);
        for index in &self.0 {
            match *index {
                Index::Integer(index) => expanded.push(DimensionIndex::Single(index)),
                Index::Slice(slice) => expanded.push(DimensionIndex::Range(slice)),
                Index::Ellipsis => {
                    expanded.extend(std::iter::repeat(DimensionIndex::Wildcard).take(num_padding));
                }
            }
        }
        if num_ellipsis == 0 {
            expanded.extend(std::iter::repeat(DimensionIndex::Wildcard).take(num_padding));
        }
        Ok(expanded)
    }
}

impl std::fmt::Display for IndexExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

impl From<Vec<Index>> for IndexExpression {
    fn from(indices: Vec<Index>) -> Self {
        Self(indices)
    }
}

macro_rules! impl_index_expression_from_index {
    ($($index:ty),+) => {
        $(
            impl From<$index> for IndexExpression {
                fn from(index: $index) -> Self {
                    Self(vec![index.into()])
                }
            }
        )+
    };
}

impl_index_expression_from_index!(
    Index,
    Slice,
    i32,
    i64,
    std::ops::Range<i32>,
    std::ops::Range<i64>,
    std::ops::RangeFrom<i32>,
    std::ops::RangeFrom<i64>,
    std::ops::RangeTo<i32>,
    std::ops::RangeTo<i64>,
    std::ops::RangeInclusive<i32>,
    std::ops::RangeInclusive<i64>,
    std::ops::RangeFull
);

macro_rules! impl_index_expression_from_tuple {
    ($($name:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($name: Into<Index>),+> From<($($name,)+)> for IndexExpression {
            fn from(($($name,)+): ($($name,)+)) -> Self {
                Self(vec![$($name.into()),+])
            }
        }
    };
}

impl_index_expression_from_tuple!(A, B);
impl_index_expression_from_tuple!(A, B, C);
impl_index_expression_from_tuple!(A, B, C, D);
impl_index_expression_from_tuple!(A, B, C, D, E);
impl_index_expression_from_tuple!(A, B, C, D, E, F);

impl FromStr for IndexExpression {
    type Err = IndexError;

    /// Parse a comma separated expression such as `"1, ..., 2:5:2"`.
    ///
    /// Surrounding brackets are optional and an empty expression selects everything.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(s)
            .trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        let s = s.strip_suffix(',').unwrap_or(s);
        s.split(',')
            .map(Index::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// An index resolution error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// The index addresses more dimensions than are available.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// More than one ellipsis.
    #[error("an index can only have a single ellipsis ('...'), got {0}")]
    MultipleEllipsis(usize),
    /// An index element that is not an integer, a slice, or an ellipsis.
    #[error("data indices must be integers, slices or an ellipsis, not {0:?}")]
    InvalidIndexType(String),
    /// A zero or negative step.
    #[error("step must be >= 1, got {step} in dimension {dimension}")]
    InvalidStep {
        /// The dimension.
        dimension: usize,
        /// The offending step.
        step: i64,
    },
    /// An integer index outside of the bounds of a dimension.
    #[error("index {index} is out of bounds for dimension {dimension} with range {start}..{stop}")]
    IndexOutOfBounds {
        /// The dimension.
        dimension: usize,
        /// The offending index, as supplied.
        index: i64,
        /// The start of the bounds.
        start: u64,
        /// The stop (exclusive) of the bounds.
        stop: u64,
    },
    /// A slice outside of the bounds of a dimension.
    #[error("slice {slice} is out of bounds for dimension {dimension} with range {start}..{stop}")]
    SliceOutOfBounds {
        /// The dimension.
        dimension: usize,
        /// The offending slice, as supplied.
        slice: Slice,
        /// The start of the bounds.
        start: u64,
        /// The stop (exclusive) of the bounds.
        stop: u64,
    },
}

impl IndexError {
    /// Returns true if this is an out-of-bounds error.
    #[must_use]
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfBounds { .. } | Self::SliceOutOfBounds { .. }
        )
    }
}
