//! An in-memory store.

use std::{collections::BTreeMap, sync::Arc};

use parking_lot::{Mutex, RwLock};

use crate::{
    byte_range::{ByteOffset, ByteRange},
    storage::{
        Bytes, MaybeBytes, ReadableStorageTraits, ReadableWritableStorageTraits, StorageError,
        StoreKey, StoreKeyStartValue, WritableStorageTraits,
    },
};

/// An in-memory store.
///
/// Each value sits behind its own lock, so writes to different values proceed in parallel.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data_map: Mutex<BTreeMap<StoreKey, Arc<RwLock<Vec<u8>>>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn value(&self, key: &StoreKey) -> Option<Arc<RwLock<Vec<u8>>>> {
        self.data_map.lock().get(key).cloned()
    }

    fn set_impl(
        &self,
        key: &StoreKey,
        value: &[u8],
        offset: Option<ByteOffset>,
    ) -> Result<(), StorageError> {
        let data = self
            .data_map
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::default()))
            .clone();
        let mut data = data.write();

        let Some(offset) = offset else {
            *data = value.to_vec();
            return Ok(());
        };
        let offset = usize::try_from(offset).map_err(|_| "byte offset exceeds usize::MAX")?;
        let end = offset + value.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[offset..end].copy_from_slice(value);
        Ok(())
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        Ok(self.value(key).map(|data| data.read().clone()))
    }

    fn get_partial_values_key(
        &self,
        key: &StoreKey,
        byte_ranges: &[ByteRange],
    ) -> Result<Option<Vec<Bytes>>, StorageError> {
        let Some(data) = self.value(key) else {
            return Ok(None);
        };
        let data = data.read();
        let size = data.len() as u64;
        let out = byte_ranges
            .iter()
            .map(|byte_range| -> Result<Bytes, StorageError> {
                Ok(data[byte_range.to_range_usize(size)?].to_vec())
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(out))
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        Ok(self.value(key).map(|data| data.read().len() as u64))
    }
}

impl WritableStorageTraits for MemoryStore {
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        self.set_impl(key, value, None)
    }

    fn set_partial_values(
        &self,
        key_start_values: &[StoreKeyStartValue],
    ) -> Result<(), StorageError> {
        for key_start_value in key_start_values {
            self.set_impl(
                key_start_value.key(),
                key_start_value.value(),
                Some(key_start_value.start()),
            )?;
        }
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.data_map.lock().remove(key).is_some())
    }
}

impl ReadableWritableStorageTraits for MemoryStore {}
