//! Key/value storage.
//!
//! A [store](store) maps a [`StoreKey`] to a value (bytes).
//! An [`Array`](crate::array::Array) keeps two values per node: its JSON metadata at [`meta_key`] and its contiguous row-major data at [`data_key`].
//!
//! Stores implement [`ReadableStorageTraits`] and [`WritableStorageTraits`], which include partial reads and writes of byte ranges.
//! Partial writes to disjoint byte ranges of the same value may be issued concurrently.

mod storage_sync;
pub mod store;
mod store_key;

use std::sync::Arc;

use thiserror::Error;

use crate::{
    byte_range::{ByteOffset, InvalidByteRangeError},
    node::{NodeNameError, NodePath, NodePathError},
};

pub use store_key::{StoreKey, StoreKeyError};

pub use self::storage_sync::{
    ReadableStorageTraits, ReadableWritableStorageTraits, WritableStorageTraits,
};

/// The type for bytes used in store set and get methods.
pub type Bytes = Vec<u8>;

/// An alias for bytes which may or may not be available.
pub type MaybeBytes = Option<Bytes>;

/// [`Arc`] wrapped readable storage.
pub type ReadableStorage = Arc<dyn ReadableStorageTraits>;

/// [`Arc`] wrapped readable and writable storage.
pub type ReadableWritableStorage = Arc<dyn ReadableWritableStorageTraits>;

/// A [`StoreKey`], [`ByteOffset`], and value (bytes).
#[derive(Debug, Clone)]
#[must_use]
pub struct StoreKeyStartValue<'a> {
    key: StoreKey,
    start: ByteOffset,
    value: &'a [u8],
}

impl<'a> StoreKeyStartValue<'a> {
    /// Create a new [`StoreKeyStartValue`].
    pub const fn new(key: StoreKey, start: ByteOffset, value: &'a [u8]) -> Self {
        Self { key, start, value }
    }

    /// Return the key.
    #[must_use]
    pub const fn key(&self) -> &StoreKey {
        &self.key
    }

    /// Return the starting byte offset.
    #[must_use]
    pub const fn start(&self) -> ByteOffset {
        self.start
    }

    /// Return the value.
    #[must_use]
    pub const fn value(&self) -> &'a [u8] {
        self.value
    }

    /// Get the offset of exclusive end of the [`StoreKeyStartValue`].
    #[must_use]
    pub const fn end(&self) -> ByteOffset {
        self.start + self.value.len() as u64
    }
}

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read only store.
    #[error("a write operation was attempted on a read only store")]
    ReadOnly,
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An error parsing the metadata for a key.
    #[error("error parsing metadata for {0}: {1}")]
    InvalidMetadata(StoreKey, String),
    /// An invalid store key.
    #[error("invalid store key {0}")]
    InvalidStoreKey(#[from] StoreKeyError),
    /// An invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// An invalid node name.
    #[error(transparent)]
    NodeNameError(#[from] NodeNameError),
    /// An invalid byte range.
    #[error(transparent)]
    InvalidByteRangeError(#[from] InvalidByteRangeError),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

fn node_key(path: &NodePath, suffix: &str) -> StoreKey {
    let path = path.as_str().trim_start_matches('/');
    let key = if path.is_empty() {
        suffix.to_string()
    } else {
        format!("{path}/{suffix}")
    };
    // a valid node path has no leading, trailing or repeated '/'
    unsafe { StoreKey::new_unchecked(key) }
}

/// Return the metadata key given a node path.
#[must_use]
pub fn meta_key(path: &NodePath) -> StoreKey {
    node_key(path, "nix.json")
}

/// Return the data key given a node path.
#[must_use]
pub fn data_key(path: &NodePath) -> StoreKey {
    node_key(path, "data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_keys() {
        let path = NodePath::new("/data/signal").unwrap();
        assert_eq!(meta_key(&path).as_str(), "data/signal/nix.json");
        assert_eq!(data_key(&path).as_str(), "data/signal/data");
        assert_eq!(meta_key(&NodePath::root()).as_str(), "nix.json");
        assert_eq!(data_key(&NodePath::root()).as_str(), "data");
    }
}
