//! Files.
//!
//! A [`File`] is the root of a hierarchy of data arrays in a store.
//! Data arrays are stored at `/data/<name>`, and the root metadata lists their names in an accompanying `nix.json`:
//! ```json
//! {
//!     "format": "nix",
//!     "data_arrays": ["signal", "spikes"]
//! }
//! ```
//!
//! A file also composes virtual data arrays from its data arrays:
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # use std::sync::Arc;
//! use nixio::array::{DataSet, DataType};
//! use nixio::file::{File, FileMode};
//! # let store = Arc::new(nixio::storage::store::MemoryStore::new());
//! let file = File::open(store, FileMode::Overwrite)?;
//! let mut layout = file.create_virtual_layout(vec![4, 3], DataType::Float64);
//! for i in 0..4 {
//!     let row = file.create_data_array(&format!("row{i}"), DataType::Float64, vec![3])?;
//!     row.write_elements(&[f64::from(i); 3], None)?;
//!     file.append_to_virtual_layout(&mut layout, &row, 0)?;
//! }
//! let rows = file.create_virtual_data_array("rows", layout.finalize())?;
//! assert_eq!(rows.read_elements::<f64>(Some(&"-1, 1".parse()?))?, vec![3.0]);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use derive_more::Display;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    array::{
        Array, ArrayBuilder, ArrayCreateError, ArrayError, ArrayShape, DataType, VirtualLayout,
        VirtualLayoutBuilder, VirtualLayoutError,
    },
    node::{NodeName, NodeNameError, NodePath},
    storage::{
        data_key, meta_key, ReadableStorageTraits, ReadableWritableStorageTraits, StorageError,
    },
};

const FORMAT: &str = "nix";

/// The mode a [`File`] is opened with.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum FileMode {
    /// Open an existing file for reading.
    #[display("read only")]
    ReadOnly,
    /// Open an existing file, or create a new one, for reading and writing.
    #[display("read write")]
    ReadWrite,
    /// Create a new file, removing the data arrays of any existing file.
    #[display("overwrite")]
    Overwrite,
}

/// A file error.
#[derive(Debug, Error)]
pub enum FileError {
    /// The file was opened read only.
    #[error("file is opened read only")]
    ReadOnly,
    /// The file metadata does not exist.
    #[error("file metadata is missing")]
    MissingMetadata,
    /// The file metadata has an unsupported format.
    #[error("unsupported file format {0}")]
    UnsupportedFormat(String),
    /// A data array with the name already exists.
    #[error("data array {0} already exists")]
    DuplicateName(String),
    /// A data array with the name does not exist.
    #[error("data array {0} does not exist")]
    NotFound(String),
    /// An invalid data array name.
    #[error(transparent)]
    InvalidName(#[from] NodeNameError),
    /// An array creation error.
    #[error(transparent)]
    ArrayCreateError(#[from] ArrayCreateError),
    /// An array error.
    #[error(transparent)]
    ArrayError(#[from] ArrayError),
    /// A virtual layout error.
    #[error(transparent)]
    VirtualLayoutError(#[from] VirtualLayoutError),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// Invalid file metadata.
    #[error("invalid file metadata: {0}")]
    MetadataError(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct FileMetadata {
    format: String,
    #[serde(default)]
    data_arrays: Vec<String>,
}

impl Default for FileMetadata {
    fn default() -> Self {
        Self {
            format: FORMAT.to_string(),
            data_arrays: Vec::new(),
        }
    }
}

/// A file: the root of a hierarchy of data arrays in a store.
#[derive(Debug)]
pub struct File<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    mode: FileMode,
    metadata: Mutex<FileMetadata>,
}

fn data_array_path(name: &str) -> Result<NodePath, FileError> {
    let name = NodeName::new(name)?;
    let data = NodeName::new("data")?;
    Ok(NodePath::root().join(&data).join(&name))
}

impl<TStorage: ?Sized> File<TStorage> {
    /// Return the mode the file was opened with.
    #[must_use]
    pub const fn mode(&self) -> FileMode {
        self.mode
    }

    /// Return the names of the data arrays in creation order.
    #[must_use]
    pub fn data_array_names(&self) -> Vec<String> {
        self.metadata.lock().data_arrays.clone()
    }

    /// Return true if the file has a data array named `name`.
    #[must_use]
    pub fn has_data_array(&self, name: &str) -> bool {
        self.metadata.lock().data_arrays.iter().any(|n| n == name)
    }

    /// Create a builder for a virtual layout of a logical array with `shape` and `data_type`.
    ///
    /// Populate it with [`append_to_virtual_layout`](File::append_to_virtual_layout), then [`finalize`](VirtualLayoutBuilder::finalize) it for [`create_virtual_data_array`](File::create_virtual_data_array).
    #[must_use]
    pub fn create_virtual_layout(&self, shape: ArrayShape, data_type: DataType) -> VirtualLayoutBuilder {
        VirtualLayoutBuilder::new(shape, data_type)
    }

    /// Append all of `array` to `layout` along `axis`.
    ///
    /// See [`VirtualLayoutBuilder::append`].
    ///
    /// # Errors
    /// Returns [`FileError::VirtualLayoutError`] if `array` cannot be appended.
    pub fn append_to_virtual_layout<T: ?Sized>(
        &self,
        layout: &mut VirtualLayoutBuilder,
        array: &Array<T>,
        axis: usize,
    ) -> Result<(), FileError> {
        layout.append(array, axis)?;
        Ok(())
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits> File<TStorage> {
    /// Open an existing file in `storage` for reading.
    ///
    /// # Errors
    /// Returns a [`FileError`] if the file metadata is missing or invalid, or there is an underlying store error.
    pub fn open_read_only(storage: Arc<TStorage>) -> Result<Self, FileError> {
        let metadata = Self::retrieve_metadata(&*storage)?.ok_or(FileError::MissingMetadata)?;
        Ok(Self {
            storage,
            mode: FileMode::ReadOnly,
            metadata: Mutex::new(metadata),
        })
    }

    fn retrieve_metadata(storage: &TStorage) -> Result<Option<FileMetadata>, FileError> {
        let Some(bytes) = storage.get(&meta_key(&NodePath::root()))? else {
            return Ok(None);
        };
        let metadata: FileMetadata = serde_json::from_slice(&bytes)?;
        if metadata.format == FORMAT {
            Ok(Some(metadata))
        } else {
            Err(FileError::UnsupportedFormat(metadata.format))
        }
    }

    /// Open the data array named `name`.
    ///
    /// # Errors
    /// Returns [`FileError::NotFound`] if there is no such data array, or a [`FileError`] if its metadata is invalid.
    pub fn data_array(&self, name: &str) -> Result<Array<TStorage>, FileError> {
        if !self.has_data_array(name) {
            return Err(FileError::NotFound(name.to_string()));
        }
        let path = data_array_path(name)?;
        Ok(Array::new(self.storage.clone(), path.as_str())?)
    }
}

impl<TStorage: ?Sized + ReadableWritableStorageTraits> File<TStorage> {
    /// Open a file in `storage` with `mode`.
    ///
    /// # Errors
    /// Returns a [`FileError`] if
    ///  - the file does not exist and `mode` is [`FileMode::ReadOnly`],
    ///  - the file metadata is invalid, or
    ///  - there is an underlying store error.
    pub fn open(storage: Arc<TStorage>, mode: FileMode) -> Result<Self, FileError> {
        match mode {
            FileMode::ReadOnly => Self::open_read_only(storage),
            FileMode::ReadWrite => {
                let file = Self {
                    metadata: Mutex::new(Self::retrieve_metadata(&*storage)?.unwrap_or_default()),
                    storage,
                    mode,
                };
                file.store_metadata(&file.metadata.lock())?;
                Ok(file)
            }
            FileMode::Overwrite => {
                if let Some(existing) = Self::retrieve_metadata(&*storage)? {
                    for name in &existing.data_arrays {
                        let path = data_array_path(name)?;
                        storage.erase(&meta_key(&path))?;
                        storage.erase(&data_key(&path))?;
                    }
                    log::debug!("removed {} data arrays of an existing file", existing.data_arrays.len());
                }
                let file = Self {
                    storage,
                    mode,
                    metadata: Mutex::new(FileMetadata::default()),
                };
                file.store_metadata(&file.metadata.lock())?;
                Ok(file)
            }
        }
    }

    fn store_metadata(&self, metadata: &FileMetadata) -> Result<(), FileError> {
        let bytes = serde_json::to_vec_pretty(metadata)?;
        self.storage.set(&meta_key(&NodePath::root()), &bytes)?;
        Ok(())
    }

    /// Create a data array named `name` with `data_type` and `shape`, filled with the default fill value of `data_type`.
    ///
    /// # Errors
    /// Returns a [`FileError`] if
    ///  - the file is read only,
    ///  - `name` is invalid or already used, or
    ///  - there is an underlying store error.
    pub fn create_data_array(
        &self,
        name: &str,
        data_type: DataType,
        shape: ArrayShape,
    ) -> Result<Array<TStorage>, FileError> {
        let builder = ArrayBuilder::new(shape, data_type, data_type.default_fill_value());
        self.create_data_array_from_builder(name, &builder)
    }

    /// Create a data array named `name` from `builder`.
    ///
    /// # Errors
    /// See [`create_data_array`](File::create_data_array).
    pub fn create_data_array_from_builder(
        &self,
        name: &str,
        builder: &ArrayBuilder,
    ) -> Result<Array<TStorage>, FileError> {
        if self.mode == FileMode::ReadOnly {
            return Err(FileError::ReadOnly);
        }
        let path = data_array_path(name)?;
        let mut metadata = self.metadata.lock();
        if metadata.data_arrays.iter().any(|n| n == name) {
            return Err(FileError::DuplicateName(name.to_string()));
        }
        let array = builder.build(self.storage.clone(), path.as_str())?;
        array.store_metadata()?;
        metadata.data_arrays.push(name.to_string());
        self.store_metadata(&metadata)?;
        log::debug!("created data array {path}");
        Ok(array)
    }

    /// Create a virtual data array named `name` with `layout`.
    ///
    /// # Errors
    /// See [`create_data_array`](File::create_data_array).
    pub fn create_virtual_data_array(
        &self,
        name: &str,
        layout: VirtualLayout,
    ) -> Result<Array<TStorage>, FileError> {
        self.create_data_array_from_builder(name, &ArrayBuilder::new_virtual(layout))
    }
}
