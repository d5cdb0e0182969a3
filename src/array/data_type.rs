//! Data types.
//!
//! The element types of an [`Array`](super::Array).
//! Elements are stored in native byte order.

use std::str::FromStr;

use derive_more::From;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::FillValue;

/// A data type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// `bool` Boolean.
    Bool,
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    UInt64,
    /// `float32` IEEE 754 single-precision floating point.
    Float32,
    /// `float64` IEEE 754 double-precision floating point.
    Float64,
}

/// An unsupported data type error.
#[derive(Clone, Debug, Error, From, PartialEq, Eq)]
#[error("unsupported data type {0}")]
pub struct UnsupportedDataTypeError(String);

/// A fill value incompatible with a data type.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("incompatible fill value {1} for data type {0}")]
pub struct IncompatibleFillValueError(DataType, FillValue);

impl IncompatibleFillValueError {
    /// Create a new incompatible fill value error.
    #[must_use]
    pub const fn new(data_type: DataType, fill_value: FillValue) -> Self {
        Self(data_type, fill_value)
    }
}

/// Fill value metadata incompatible with a data type.
#[derive(Clone, Debug, Error)]
#[error("incompatible fill value metadata {1} for data type {0}")]
pub struct IncompatibleFillValueMetadataError(DataType, serde_json::Value);

impl DataType {
    /// Returns the identifier.
    #[must_use]
    pub const fn identifier(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Returns the size in bytes of an element.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Returns the default fill value (zero, or false).
    #[must_use]
    pub fn default_fill_value(&self) -> FillValue {
        FillValue::new(vec![0; self.size()])
    }

    /// Check that `fill_value` is compatible with the data type.
    ///
    /// # Errors
    /// Returns [`IncompatibleFillValueError`] if the size of `fill_value` does not match the data type, or it is not a valid `bool`.
    pub fn validate_fill_value(&self, fill_value: &FillValue) -> Result<(), IncompatibleFillValueError> {
        let bytes = fill_value.as_ne_bytes();
        let valid = bytes.len() == self.size() && (*self != Self::Bool || bytes[0] <= 1);
        if valid {
            Ok(())
        } else {
            Err(IncompatibleFillValueError(*self, fill_value.clone()))
        }
    }

    /// Create a fill value from metadata.
    ///
    /// Floating point fill values may be the strings `"NaN"`, `"Infinity"` or `"-Infinity"`.
    ///
    /// # Errors
    /// Returns [`IncompatibleFillValueMetadataError`] if the fill value is incompatible with the data type.
    pub fn fill_value_from_metadata(
        &self,
        fill_value: &serde_json::Value,
    ) -> Result<FillValue, IncompatibleFillValueMetadataError> {
        use FillValue as FV;
        let err = || IncompatibleFillValueMetadataError(*self, fill_value.clone());
        let int = || fill_value.as_i64().ok_or_else(err);
        let uint = || fill_value.as_u64().ok_or_else(err);
        let float = || match fill_value {
            serde_json::Value::Number(number) => number.as_f64().ok_or_else(err),
            serde_json::Value::String(string) => match string.as_str() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                _ => Err(err()),
            },
            _ => Err(err()),
        };
        match self {
            Self::Bool => Ok(FV::from(fill_value.as_bool().ok_or_else(err)?)),
            Self::Int8 => Ok(FV::from(i8::try_from(int()?).map_err(|_| err())?)),
            Self::Int16 => Ok(FV::from(i16::try_from(int()?).map_err(|_| err())?)),
            Self::Int32 => Ok(FV::from(i32::try_from(int()?).map_err(|_| err())?)),
            Self::Int64 => Ok(FV::from(int()?)),
            Self::UInt8 => Ok(FV::from(u8::try_from(uint()?).map_err(|_| err())?)),
            Self::UInt16 => Ok(FV::from(u16::try_from(uint()?).map_err(|_| err())?)),
            Self::UInt32 => Ok(FV::from(u32::try_from(uint()?).map_err(|_| err())?)),
            Self::UInt64 => Ok(FV::from(uint()?)),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float32 => Ok(FV::from(float()? as f32)),
            Self::Float64 => Ok(FV::from(float()?)),
        }
    }

    /// Return the fill value metadata.
    ///
    /// # Errors
    /// Returns [`IncompatibleFillValueError`] if the fill value is incompatible with the data type.
    pub fn metadata_fill_value(
        &self,
        fill_value: &FillValue,
    ) -> Result<serde_json::Value, IncompatibleFillValueError> {
        self.validate_fill_value(fill_value)?;
        let err = || IncompatibleFillValueError(*self, fill_value.clone());
        let bytes = fill_value.as_ne_bytes();
        macro_rules! from_ne_bytes {
            ($type:ty) => {
                <$type>::from_ne_bytes(bytes.try_into().map_err(|_| err())?)
            };
        }
        let float = |value: f64| {
            if value.is_nan() {
                serde_json::Value::from("NaN")
            } else if value.is_infinite() && value.is_sign_positive() {
                serde_json::Value::from("Infinity")
            } else if value.is_infinite() {
                serde_json::Value::from("-Infinity")
            } else {
                serde_json::Value::from(value)
            }
        };
        Ok(match self {
            Self::Bool => serde_json::Value::from(bytes[0] != 0),
            Self::Int8 => serde_json::Value::from(from_ne_bytes!(i8)),
            Self::Int16 => serde_json::Value::from(from_ne_bytes!(i16)),
            Self::Int32 => serde_json::Value::from(from_ne_bytes!(i32)),
            Self::Int64 => serde_json::Value::from(from_ne_bytes!(i64)),
            Self::UInt8 => serde_json::Value::from(from_ne_bytes!(u8)),
            Self::UInt16 => serde_json::Value::from(from_ne_bytes!(u16)),
            Self::UInt32 => serde_json::Value::from(from_ne_bytes!(u32)),
            Self::UInt64 => serde_json::Value::from(from_ne_bytes!(u64)),
            Self::Float32 => float(f64::from(from_ne_bytes!(f32))),
            Self::Float64 => float(from_ne_bytes!(f64)),
        })
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for DataType {
    type Err = UnsupportedDataTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(Self::Bool),
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "uint8" => Ok(Self::UInt8),
            "uint16" => Ok(Self::UInt16),
            "uint32" => Ok(Self::UInt32),
            "uint64" => Ok(Self::UInt64),
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            _ => Err(UnsupportedDataTypeError(s.to_string())),
        }
    }
}
