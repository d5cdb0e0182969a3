use ArrayError::IncompatibleElementType as IET;

use super::{ArrayError, DataType};

/// A trait representing an array element type.
pub trait Element: Sized + Copy + Send + Sync {
    /// Validate the data type.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the data type is incompatible with [`Element`].
    fn validate_data_type(data_type: &DataType) -> Result<(), ArrayError>;

    /// Convert a slice of elements into bytes.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the data type is incompatible with [`Element`].
    fn into_array_bytes(data_type: &DataType, elements: &[Self]) -> Result<Vec<u8>, ArrayError>;

    /// Convert bytes into a [`Vec<Element>`].
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the data type is incompatible with [`Element`], the length of `bytes` is not a multiple of the element size, or the bytes hold an invalid value.
    fn from_array_bytes(data_type: &DataType, bytes: &[u8]) -> Result<Vec<Self>, ArrayError>;
}

fn validate_bytes_len(data_type: &DataType, bytes: &[u8]) -> Result<(), ArrayError> {
    if bytes.len() % data_type.size() == 0 {
        Ok(())
    } else {
        Err(ArrayError::InvalidBytesInputSize(
            bytes.len(),
            (bytes.len() / data_type.size() * data_type.size()) as u64,
        ))
    }
}

impl Element for bool {
    fn validate_data_type(data_type: &DataType) -> Result<(), ArrayError> {
        (data_type == &DataType::Bool).then_some(()).ok_or(IET)
    }

    fn into_array_bytes(data_type: &DataType, elements: &[Self]) -> Result<Vec<u8>, ArrayError> {
        Self::validate_data_type(data_type)?;
        Ok(bytemuck::cast_slice::<bool, u8>(elements).to_vec())
    }

    fn from_array_bytes(data_type: &DataType, bytes: &[u8]) -> Result<Vec<Self>, ArrayError> {
        Self::validate_data_type(data_type)?;
        if bytes.iter().all(|&u| u <= 1) {
            Ok(bytes.iter().map(|&u| u == 1).collect())
        } else {
            Err(ArrayError::InvalidElementValue)
        }
    }
}

macro_rules! impl_element_pod {
    ($raw_type:ty, $data_type:path) => {
        impl Element for $raw_type {
            fn validate_data_type(data_type: &DataType) -> Result<(), ArrayError> {
                if matches!(data_type, $data_type) {
                    Ok(())
                } else {
                    Err(IET)
                }
            }

            fn into_array_bytes(
                data_type: &DataType,
                elements: &[Self],
            ) -> Result<Vec<u8>, ArrayError> {
                Self::validate_data_type(data_type)?;
                Ok(bytemuck::must_cast_slice::<Self, u8>(elements).to_vec())
            }

            fn from_array_bytes(
                data_type: &DataType,
                bytes: &[u8],
            ) -> Result<Vec<Self>, ArrayError> {
                Self::validate_data_type(data_type)?;
                validate_bytes_len(data_type, bytes)?;
                Ok(bytemuck::pod_collect_to_vec::<u8, Self>(bytes))
            }
        }
    };
}

impl_element_pod!(i8, DataType::Int8);
impl_element_pod!(i16, DataType::Int16);
impl_element_pod!(i32, DataType::Int32);
impl_element_pod!(i64, DataType::Int64);
impl_element_pod!(u8, DataType::UInt8);
impl_element_pod!(u16, DataType::UInt16);
impl_element_pod!(u32, DataType::UInt32);
impl_element_pod!(u64, DataType::UInt64);
impl_element_pod!(f32, DataType::Float32);
impl_element_pod!(f64, DataType::Float64);
