use super::{ArrayError, ArrayShape, DataType, Element};

/// The bytes of a region read from a [`DataSet`](super::DataSet).
///
/// Elements are in row-major order with native endianness.
/// The shape excludes dimensions addressed by a single integer index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayBytes {
    bytes: Vec<u8>,
    shape: ArrayShape,
    data_type: DataType,
}

impl ArrayBytes {
    /// Create a new [`ArrayBytes`].
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidBytesInputSize`] if the length of `bytes` does not match `shape` and `data_type`.
    pub fn new(bytes: Vec<u8>, shape: ArrayShape, data_type: DataType) -> Result<Self, ArrayError> {
        let expected = shape.iter().product::<u64>() * data_type.size() as u64;
        if bytes.len() as u64 == expected {
            Ok(Self {
                bytes,
                shape,
                data_type,
            })
        } else {
            Err(ArrayError::InvalidBytesInputSize(bytes.len(), expected))
        }
    }

    /// Return the bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume and return the bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Return the shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the data type.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Return the number of elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Convert the bytes into a [`Vec<T>`].
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `T` is incompatible with the data type.
    pub fn into_elements<T: Element>(self) -> Result<Vec<T>, ArrayError> {
        T::from_array_bytes(&self.data_type, &self.bytes)
    }

    #[cfg(feature = "ndarray")]
    /// Convert the bytes into an [`ndarray::ArrayD<T>`].
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `T` is incompatible with the data type.
    pub fn into_ndarray<T: Element>(self) -> Result<ndarray::ArrayD<T>, ArrayError> {
        let shape = self.shape.clone();
        let elements = self.into_elements::<T>()?;
        super::elements_to_ndarray(&shape, elements)
    }
}
