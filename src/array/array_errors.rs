use thiserror::Error;

use crate::{
    array_subset::{ArrayExtractBytesError, ArrayStoreBytesError, IncompatibleDimensionalityError},
    indexer::IndexError,
    node::{NodePath, NodePathError},
    selection::Selection,
    storage::StorageError,
};

use super::{
    data_type::{IncompatibleFillValueError, IncompatibleFillValueMetadataError},
    ArrayShape, VirtualLayoutError,
};

/// An array creation error.
#[derive(Debug, Error)]
pub enum ArrayCreateError {
    /// An invalid node path
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// Invalid fill value.
    #[error(transparent)]
    InvalidFillValue(#[from] IncompatibleFillValueError),
    /// Invalid fill value metadata.
    #[error(transparent)]
    InvalidFillValueMetadata(#[from] IncompatibleFillValueMetadataError),
    /// Storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An error deserializing the metadata.
    #[error(transparent)]
    MetadataDeserializationError(#[from] serde_json::Error),
    /// Missing metadata.
    #[error("array metadata is missing")]
    MissingMetadata,
    /// A virtual layout inconsistent with the array.
    #[error(transparent)]
    InvalidVirtualLayout(#[from] VirtualLayoutError),
}

/// Array errors.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// A store error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// Incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionalityError(#[from] IncompatibleDimensionalityError),
    /// An invalid index expression.
    #[error(transparent)]
    IndexError(#[from] IndexError),
    /// A selection outside of the array.
    #[error("selection {_0} is not compatible with array shape {_1:?}")]
    InvalidSelection(Selection, ArrayShape),
    /// An unexpected bytes input size.
    #[error("got bytes with size {_0:?}, expected {_1:?}")]
    InvalidBytesInputSize(usize, u64),
    /// Incompatible element type.
    #[error("the element type is incompatible with the array data type")]
    IncompatibleElementType,
    /// Invalid element value.
    #[error("the bytes hold an invalid value for the data type")]
    InvalidElementValue,
    /// Invalid fill value.
    #[error(transparent)]
    InvalidFillValue(#[from] IncompatibleFillValueError),
    /// A virtual array cannot be resized.
    #[error("the extent of a virtual array is fixed by its layout")]
    VirtualArrayResize,
    /// A mapped source of a virtual array could not be opened.
    #[error("virtual array source {_0} could not be opened: {_1}")]
    VirtualSourceError(NodePath, Box<ArrayCreateError>),
    /// An error serializing the metadata.
    #[error(transparent)]
    MetadataSerializationError(#[from] serde_json::Error),
    /// An error extracting the bytes of a region.
    #[error(transparent)]
    ArrayExtractBytesError(#[from] ArrayExtractBytesError),
    /// An error storing the bytes of a region.
    #[error(transparent)]
    ArrayStoreBytesError(#[from] ArrayStoreBytesError),
}
