use std::{
    ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo},
    str::FromStr,
};

use super::IndexError;

/// A range descriptor with an optional start, stop and step.
///
/// A [`Slice`] behaves like a Python `slice`: an omitted start or stop selects up to the edge of a dimension, negative values count back from the end, and the step defaults to 1.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Slice {
    /// The start of the slice.
    pub start: Option<i64>,
    /// The stop (exclusive) of the slice.
    pub stop: Option<i64>,
    /// The step of the slice.
    pub step: Option<i64>,
}

impl Slice {
    /// Create a new slice.
    #[must_use]
    pub const fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    /// Create a slice selecting everything.
    #[must_use]
    pub const fn full() -> Self {
        Self::new(None, None, None)
    }

    /// Return the slice with step `step`.
    #[must_use]
    pub const fn with_step(self, step: i64) -> Self {
        Self {
            step: Some(step),
            ..self
        }
    }

    /// Return the step of the slice, defaulting to 1.
    #[must_use]
    pub fn step_or_default(&self) -> i64 {
        self.step.unwrap_or(1)
    }

    /// Resolve the slice against a dimension of `length`, returning `(start, stop, step)`.
    ///
    /// Matches the semantics of Python's `slice.indices`:
    ///  - negative `start` and `stop` are offset by `length`,
    ///  - the results are clamped to `[0, length]` for a positive step and to `[-1, length - 1]` for a negative step,
    ///  - an omitted `start` or `stop` selects up to the edge of the dimension in the direction of the step.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidStep`] (for dimension 0) if the step is zero.
    pub fn indices(&self, length: u64) -> Result<(i64, i64, i64), IndexError> {
        let length = i64::try_from(length).unwrap_or(i64::MAX);
        let step = self.step_or_default();
        if step == 0 {
            return Err(IndexError::InvalidStep { dimension: 0, step });
        }
        let (lower, upper) = if step < 0 {
            (-1, length - 1)
        } else {
            (0, length)
        };
        let resolve = |value: Option<i64>, default: i64| match value {
            None => default,
            Some(value) if value < 0 => std::cmp::max(value.saturating_add(length), lower),
            Some(value) => std::cmp::min(value, upper),
        };
        let start = resolve(self.start, if step < 0 { upper } else { lower });
        let stop = resolve(self.stop, if step < 0 { lower } else { upper });
        Ok((start, stop, step))
    }
}

impl std::fmt::Display for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt_option = |value: Option<i64>| value.map_or(String::new(), |value| value.to_string());
        write!(f, "{}:{}", fmt_option(self.start), fmt_option(self.stop))?;
        if let Some(step) = self.step {
            write!(f, ":{step}")?;
        }
        Ok(())
    }
}

impl FromStr for Slice {
    type Err = IndexError;

    /// Parse a slice in Python notation, such as `1:4`, `::2` or `-3:`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IndexError::InvalidIndexType(s.trim().to_string());
        let parse = |component: &str| -> Result<Option<i64>, IndexError> {
            let component = component.trim();
            if component.is_empty() {
                Ok(None)
            } else {
                component.parse::<i64>().map(Some).map_err(|_| invalid())
            }
        };
        let components: Vec<&str> = s.split(':').collect();
        match components.as_slice() {
            [start, stop] => Ok(Self::new(parse(start)?, parse(stop)?, None)),
            [start, stop, step] => Ok(Self::new(parse(start)?, parse(stop)?, parse(step)?)),
            _ => Err(invalid()),
        }
    }
}

macro_rules! impl_slice_from_ranges {
    ($int:ty) => {
        impl From<Range<$int>> for Slice {
            fn from(range: Range<$int>) -> Self {
                Self::new(Some(range.start.into()), Some(range.end.into()), None)
            }
        }

        impl From<RangeFrom<$int>> for Slice {
            fn from(range: RangeFrom<$int>) -> Self {
                Self::new(Some(range.start.into()), None, None)
            }
        }

        impl From<RangeTo<$int>> for Slice {
            fn from(range: RangeTo<$int>) -> Self {
                Self::new(None, Some(range.end.into()), None)
            }
        }

        impl From<RangeInclusive<$int>> for Slice {
            fn from(range: RangeInclusive<$int>) -> Self {
                let end: i64 = (*range.end()).into();
                Self::new(Some((*range.start()).into()), end.checked_add(1), None)
            }
        }
    };
}

impl_slice_from_ranges!(i32);
impl_slice_from_ranges!(i64);

impl From<RangeFull> for Slice {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}
