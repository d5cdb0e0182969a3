use std::sync::Arc;

use crate::node::NodePath;

use super::{Array, ArrayCreateError, ArrayShape, DataType, FillValue, VirtualLayout};

/// An [`Array`] builder.
///
/// The array builder is initialised from an array shape, data type, and fill value.
/// Attributes are empty and the array is not virtual, unless built with [`ArrayBuilder::new_virtual`].
///
/// Use the methods in the array builder to change the configuration away from these defaults, and then build the array at a path of some storage with [`ArrayBuilder::build`].
/// Note that [`build`](ArrayBuilder::build) does not modify the store; the array metadata has to be explicitly written with [`Array::store_metadata`].
///
/// For example:
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # use std::sync::Arc;
/// use nixio::array::{ArrayBuilder, DataType, FillValue};
/// # let store = Arc::new(nixio::storage::store::MemoryStore::new());
/// let mut array = ArrayBuilder::new(
///     vec![8, 8], // array shape
///     DataType::Float32,
///     FillValue::from(f32::NAN),
/// )
/// .attributes(serde_json::json!({"unit": "mV"}).as_object().cloned().unwrap_or_default())
/// .build(store.clone(), "/data/signal")?;
/// array.store_metadata()?; // write metadata to the store
///
/// array.set_data_extent(&[16, 8])?; // resize, updating the stored metadata
/// # Ok(())
/// # }
/// ```
///
/// The layout of a virtual array builder is fixed, and can only be replaced by building from another layout:
/// ```compile_fail
/// # use nixio::array::{ArrayBuilder, DataType, VirtualLayoutBuilder};
/// let layout = VirtualLayoutBuilder::new(vec![4], DataType::UInt8).finalize();
/// let mut builder = ArrayBuilder::new_virtual(layout.clone());
/// builder.virtual_layout = Some(layout);
/// ```
#[derive(Debug, Clone)]
pub struct ArrayBuilder {
    /// Array shape.
    pub shape: ArrayShape,
    /// Data type.
    pub data_type: DataType,
    /// Fill value.
    pub fill_value: FillValue,
    /// Attributes.
    pub attributes: serde_json::Map<String, serde_json::Value>,
    virtual_layout: Option<VirtualLayout>,
}

impl ArrayBuilder {
    /// Create a new array builder.
    #[must_use]
    pub fn new(shape: ArrayShape, data_type: DataType, fill_value: FillValue) -> Self {
        Self {
            shape,
            data_type,
            fill_value,
            attributes: serde_json::Map::default(),
            virtual_layout: None,
        }
    }

    /// Create a new array builder for a virtual array with `layout`.
    ///
    /// The shape and data type must remain those of `layout`, otherwise [`build`](ArrayBuilder::build) fails.
    #[must_use]
    pub fn new_virtual(layout: VirtualLayout) -> Self {
        Self {
            shape: layout.shape().to_vec(),
            data_type: *layout.data_type(),
            fill_value: layout.fill_value().clone(),
            attributes: serde_json::Map::default(),
            virtual_layout: Some(layout),
        }
    }

    /// Create a new builder copying the configuration of an existing array.
    #[must_use]
    pub fn from_array<T: ?Sized>(array: &Array<T>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            data_type: *array.data_type(),
            fill_value: array.fill_value().clone(),
            attributes: array.attributes().clone(),
            virtual_layout: array.virtual_layout(),
        }
    }

    /// Set the shape.
    pub fn shape(&mut self, shape: ArrayShape) -> &mut Self {
        self.shape = shape;
        self
    }

    /// Set the data type.
    pub fn data_type(&mut self, data_type: DataType) -> &mut Self {
        self.data_type = data_type;
        self
    }

    /// Set the fill value.
    pub fn fill_value(&mut self, fill_value: FillValue) -> &mut Self {
        self.fill_value = fill_value;
        self
    }

    /// Set the user defined attributes.
    ///
    /// If left unmodified, the user defined attributes of the array will be empty.
    pub fn attributes(
        &mut self,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> &mut Self {
        self.attributes = attributes;
        self
    }

    /// Build into an [`Array`].
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if
    ///  - the path is invalid,
    ///  - the fill value is incompatible with the data type, or
    ///  - the shape or data type of a virtual array differs from its layout.
    pub fn build<TStorage: ?Sized>(
        &self,
        storage: Arc<TStorage>,
        path: &str,
    ) -> Result<Array<TStorage>, ArrayCreateError> {
        let path = NodePath::new(path)?;
        self.data_type.validate_fill_value(&self.fill_value)?;
        if let Some(layout) = &self.virtual_layout {
            layout.validate(&self.shape, &self.data_type)?;
        }
        Ok(Array {
            storage,
            path,
            shape: self.shape.clone(),
            data_type: self.data_type,
            fill_value: self.fill_value.clone(),
            attributes: self.attributes.clone(),
            virtual_mappings: self
                .virtual_layout
                .as_ref()
                .map(|layout| layout.mappings().to_vec()),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        array::{VirtualLayoutBuilder, VirtualLayoutError},
        storage::store::MemoryStore,
    };

    use super::*;

    #[test]
    fn array_builder() {
        let mut builder = ArrayBuilder::new(vec![8, 8], DataType::Int8, FillValue::from(0i8));
        builder.shape(vec![4, 2]);
        builder.data_type(DataType::UInt16);
        builder.fill_value(FillValue::from(7u16));
        let mut attributes = serde_json::Map::new();
        attributes.insert("unit".to_string(), "s".into());
        builder.attributes(attributes.clone());

        let storage = Arc::new(MemoryStore::new());
        let array = builder.build(storage, "/").unwrap();
        assert_eq!(array.shape(), &[4, 2]);
        assert_eq!(array.data_type(), &DataType::UInt16);
        assert_eq!(array.fill_value(), &FillValue::from(7u16));
        assert_eq!(array.attributes(), &attributes);

        let builder2 = array.builder();
        assert_eq!(builder2.shape, builder.shape);
        assert_eq!(builder2.fill_value, builder.fill_value);
    }

    #[test]
    fn array_builder_invalid() {
        let storage = Arc::new(MemoryStore::new());
        let builder = ArrayBuilder::new(vec![8, 8], DataType::Int8, FillValue::from(0u16));
        assert!(matches!(
            builder.build(storage.clone(), "/"),
            Err(ArrayCreateError::InvalidFillValue(_))
        ));
        let builder = ArrayBuilder::new(vec![8, 8], DataType::Int8, FillValue::from(0i8));
        assert!(builder.build(storage, "/array/").is_err());
    }

    #[test]
    fn array_builder_virtual() {
        let storage = Arc::new(MemoryStore::new());
        let mut layout = VirtualLayoutBuilder::new(vec![8, 3], DataType::Int16);
        for i in 0..4 {
            let source = ArrayBuilder::new(vec![2, 3], DataType::Int16, FillValue::from(1i16))
                .build(storage.clone(), &format!("/s{i}"))
                .unwrap();
            layout.append(&source, 0).unwrap();
        }
        let layout = layout.finalize();

        let mut builder = ArrayBuilder::new_virtual(layout.clone());
        builder.fill_value(FillValue::from(-1i16));
        let array = builder.build(storage.clone(), "/virtual").unwrap();
        assert_eq!(array.virtual_layout().unwrap().mappings(), layout.mappings());
        assert_eq!(array.fill_value(), &FillValue::from(-1i16));

        let rebuilt = array.builder().build(storage.clone(), "/virtual").unwrap();
        assert_eq!(rebuilt.virtual_layout().unwrap().mappings().len(), 4);

        builder.shape(vec![3, 3]);
        assert!(matches!(
            builder.build(storage.clone(), "/virtual"),
            Err(ArrayCreateError::InvalidVirtualLayout(
                VirtualLayoutError::LayoutMismatch(_, _, _, _)
            ))
        ));
        builder.shape(vec![8, 3]).data_type(DataType::UInt16);
        builder.fill_value(FillValue::from(0u16));
        assert!(matches!(
            builder.build(storage, "/virtual"),
            Err(ArrayCreateError::InvalidVirtualLayout(
                VirtualLayoutError::LayoutMismatch(_, _, _, _)
            ))
        ));
    }
}
