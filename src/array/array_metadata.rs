//! Array metadata.
//!
//! The JSON document stored at the [metadata key](crate::storage::meta_key) of an array node.
//!
//! For example:
//! ```json
//! {
//!   "shape": [4, 3],
//!   "data_type": "float64",
//!   "fill_value": "NaN",
//!   "attributes": { "unit": "mV" }
//! }
//! ```
//! A virtual array additionally has `virtual_mappings`, and no data value of its own.

use serde::{Deserialize, Serialize};

use super::{ArrayShape, DataType, VirtualMapping};

/// Array metadata.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct ArrayMetadata {
    /// The extent of each dimension.
    pub shape: ArrayShape,
    /// The data type.
    pub data_type: DataType,
    /// The fill value, interpreted according to the data type.
    pub fill_value: serde_json::Value,
    /// Optional user metadata.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// The layout mappings of a virtual array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_mappings: Option<Vec<VirtualMapping>>,
}

impl ArrayMetadata {
    /// Returns true if the metadata describes a virtual array.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.virtual_mappings.is_some()
    }
}

impl std::fmt::Display for ArrayMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", serde_json::to_string(self).unwrap_or_default())
    }
}

impl TryFrom<&str> for ArrayMetadata {
    type Error = serde_json::Error;
    fn try_from(metadata_json: &str) -> Result<Self, Self::Error> {
        serde_json::from_str::<Self>(metadata_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_metadata() {
        let json = r#"{
            "shape": [4, 3],
            "data_type": "float64",
            "fill_value": "NaN",
            "attributes": { "unit": "mV" }
        }"#;
        let metadata = ArrayMetadata::try_from(json).unwrap();
        assert_eq!(metadata.shape, vec![4, 3]);
        assert_eq!(metadata.data_type, DataType::Float64);
        assert!(!metadata.is_virtual());
        assert_eq!(metadata.attributes["unit"], "mV");
        let round_trip = ArrayMetadata::try_from(metadata.to_string().as_str()).unwrap();
        assert_eq!(metadata, round_trip);
    }

    #[test]
    fn array_metadata_unknown_field() {
        let json = r#"{"shape": [1], "data_type": "uint8", "fill_value": 0, "chunk_grid": {}}"#;
        assert!(ArrayMetadata::try_from(json).is_err());
    }
}
