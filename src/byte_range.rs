//! Byte ranges.
//!
//! A [`ByteRange`] addresses a part of a stored value, relative to the start or the end of the value.
//! Arrays translate a [`Selection`](crate::selection::Selection) into byte ranges of their contiguous data value with [`byte_ranges_from_runs`], so that stores only read and write the bytes that are touched.

use std::ops::Range;

use thiserror::Error;

/// A byte offset.
pub type ByteOffset = u64;

/// A byte length.
pub type ByteLength = u64;

/// A byte range.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ByteRange {
    /// A byte range from the start.
    ///
    /// If the byte length is [`None`], reads to the end of the value.
    FromStart(ByteOffset, Option<ByteLength>),
    /// A byte range from the end.
    ///
    /// If the byte length is [`None`], reads to the start of the value.
    FromEnd(ByteOffset, Option<ByteLength>),
}

impl ByteRange {
    /// Return the start of the byte range in a value of `size` bytes.
    #[must_use]
    pub fn start(&self, size: u64) -> u64 {
        match *self {
            Self::FromStart(offset, _) => offset,
            Self::FromEnd(_, None) => 0,
            Self::FromEnd(offset, Some(length)) => size.saturating_sub(offset + length),
        }
    }

    /// Return the exclusive end of the byte range in a value of `size` bytes.
    #[must_use]
    pub fn end(&self, size: u64) -> u64 {
        match *self {
            Self::FromStart(_, None) => size,
            Self::FromStart(offset, Some(length)) => offset + length,
            Self::FromEnd(offset, _) => size.saturating_sub(offset),
        }
    }

    /// Return the length of the byte range in a value of `size` bytes.
    #[must_use]
    pub fn length(&self, size: u64) -> u64 {
        self.end(size).saturating_sub(self.start(size))
    }

    /// Returns true if the byte range lies within a value of `size` bytes.
    #[must_use]
    pub fn is_within(&self, size: u64) -> bool {
        let (Self::FromStart(offset, length) | Self::FromEnd(offset, length)) = *self;
        offset + length.unwrap_or(0) <= size
    }

    /// Convert the byte range to a [`Range<usize>`] in a value of `size` bytes.
    ///
    /// # Errors
    /// Returns [`InvalidByteRangeError`] if the byte range does not lie within the value or exceeds [`usize::MAX`].
    pub fn to_range_usize(&self, size: u64) -> Result<Range<usize>, InvalidByteRangeError> {
        let err = || InvalidByteRangeError::new(*self, size);
        if !self.is_within(size) {
            return Err(err());
        }
        let start = usize::try_from(self.start(size)).map_err(|_| err())?;
        let end = usize::try_from(self.end(size)).map_err(|_| err())?;
        Ok(start..end)
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::FromStart(offset, length) => {
                write!(f, "{offset}..")?;
                if let Some(length) = length {
                    write!(f, "{}", offset + length)?;
                }
                Ok(())
            }
            Self::FromEnd(offset, length) => {
                if let Some(length) = length {
                    write!(f, "-{}", offset + length)?;
                }
                write!(f, "..-{offset}")
            }
        }
    }
}

/// An invalid byte range error.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid byte range {0} for bytes of length {1}")]
pub struct InvalidByteRangeError(ByteRange, u64);

impl InvalidByteRangeError {
    /// Create a new [`InvalidByteRangeError`].
    #[must_use]
    pub fn new(byte_range: ByteRange, bytes_len: u64) -> Self {
        Self(byte_range, bytes_len)
    }
}

/// Convert runs of contiguous elements `(linearised index, # elements)` to byte ranges from the start of a value.
#[must_use]
pub fn byte_ranges_from_runs(runs: &[(u64, u64)], element_size: usize) -> Vec<ByteRange> {
    let element_size = element_size as u64;
    runs.iter()
        .map(|&(index, count)| ByteRange::FromStart(index * element_size, Some(count * element_size)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_ranges() {
        let byte_range = ByteRange::FromStart(1, None);
        assert_eq!(byte_range.to_range_usize(10).unwrap(), 1..10);
        assert_eq!(byte_range.length(10), 9);

        let byte_range = ByteRange::FromEnd(1, None);
        assert_eq!(byte_range.to_range_usize(10).unwrap(), 0..9);
        assert_eq!(byte_range.length(10), 9);

        let byte_range = ByteRange::FromEnd(1, Some(3));
        assert_eq!(byte_range.to_range_usize(10).unwrap(), 6..9);

        assert!(ByteRange::FromStart(1, Some(5)).is_within(6));
        assert!(!ByteRange::FromStart(1, Some(5)).is_within(2));
        assert!(!ByteRange::FromEnd(1, Some(5)).is_within(2));
        assert_eq!(
            ByteRange::FromStart(1, Some(4))
                .to_range_usize(3)
                .unwrap_err()
                .to_string(),
            "invalid byte range 1..5 for bytes of length 3"
        );
    }

    #[test]
    fn byte_range_display() {
        assert_eq!(ByteRange::FromStart(0, None).to_string(), "0..");
        assert_eq!(ByteRange::FromStart(5, Some(2)).to_string(), "5..7");
        assert_eq!(ByteRange::FromEnd(5, None).to_string(), "..-5");
        assert_eq!(ByteRange::FromEnd(5, Some(2)).to_string(), "-7..-5");
    }

    #[test]
    fn byte_ranges_runs() {
        assert_eq!(
            byte_ranges_from_runs(&[(5, 2), (9, 2)], 4),
            vec![
                ByteRange::FromStart(20, Some(8)),
                ByteRange::FromStart(36, Some(8))
            ]
        );
    }
}
