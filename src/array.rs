//! Arrays.
//!
//! An array is a node in a hierarchy holding multidimensional data and associated metadata.
//! Its elements are stored in a single contiguous row-major value, unless it is a *virtual* array whose elements are mapped from regions of other arrays.
//!
//! Use [`ArrayBuilder`] to setup a new array, or use [`Array::new`] for an existing array.
//! A [`DataView`] is a bounded window onto any [`DataSet`], and a [`VirtualLayoutBuilder`] assembles the layout of a virtual array.

mod array_builder;
mod array_bytes;
mod array_errors;
mod array_metadata;
mod array_sync;
pub mod data_type;
mod data_view;
mod element;
mod fill_value;
mod virtual_layout;

use std::sync::Arc;

pub use self::{
    array_builder::ArrayBuilder,
    array_bytes::ArrayBytes,
    array_errors::{ArrayCreateError, ArrayError},
    array_metadata::ArrayMetadata,
    data_type::DataType,
    data_view::DataView,
    element::Element,
    fill_value::FillValue,
    virtual_layout::{VirtualLayout, VirtualLayoutBuilder, VirtualLayoutError, VirtualMapping},
};

use crate::{
    bounding_box::{BoundingBox, DataViewCreateError},
    indexer::{IndexExpression, Slice},
    node::NodePath,
    selection::Selection,
};

/// An ND index to an element in an array.
pub type ArrayIndices = Vec<u64>;

/// The shape of an array.
pub type ArrayShape = Vec<u64>;

/// The read and write interface shared by arrays and views of arrays.
///
/// Index expressions are resolved against the [`data_extent`](DataSet::data_extent) of the data set with the same rules as a [`DataView`]:
/// negative integers and slice endpoints count from the end, a slice step must be positive, and every resolved coordinate must be in bounds.
/// Dimensions addressed by an integer are squeezed from the shape of the data read.
///
/// For example:
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # use std::sync::Arc;
/// use nixio::array::{ArrayBuilder, DataSet, DataType};
/// use nixio::indexer::{IndexExpression, Slice};
/// # let store = Arc::new(nixio::storage::store::MemoryStore::new());
/// let array = ArrayBuilder::new(vec![4, 6], DataType::Int32, 0i32.into())
///     .build(store, "/signal")?;
/// array.store_metadata()?;
/// array.write_elements(&[1i32, 2, 3], Some(&(1, Slice::new(Some(0), Some(3), None)).into()))?;
///
/// let row = array.read_elements::<i32>(Some(&IndexExpression::from(1)))?;
/// assert_eq!(row, vec![1, 2, 3, 0, 0, 0]);
/// # Ok(())
/// # }
/// ```
pub trait DataSet: Send + Sync {
    /// Return the extent of each dimension.
    fn data_extent(&self) -> ArrayShape;

    /// Return the data type.
    fn data_type(&self) -> &DataType;

    /// Return the number of dimensions.
    fn dimensionality(&self) -> usize {
        self.data_extent().len()
    }

    /// Read the elements of a `selection` in the coordinates of this data set.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the selection is not within the data extent or there is an underlying storage error.
    fn read_selection(&self, selection: &Selection) -> Result<ArrayBytes, ArrayError>;

    /// Write `bytes` to the elements of a `selection` in the coordinates of this data set.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the selection is not within the data extent, the length of `bytes` does not match the selection, or there is an underlying storage error.
    fn write_selection(&self, selection: &Selection, bytes: &[u8]) -> Result<(), ArrayError>;

    /// Resolve an index expression into a [`Selection`] in the coordinates of this data set.
    ///
    /// [`None`] selects every element.
    ///
    /// # Errors
    /// Returns [`ArrayError::IndexError`] if the expression is invalid or out of bounds.
    fn resolve(&self, expression: Option<&IndexExpression>) -> Result<Selection, ArrayError> {
        let bounding_box = BoundingBox::new_with_extent(&self.data_extent());
        match expression {
            Some(expression) => Ok(bounding_box.transform(expression)?),
            None => Ok(bounding_box.to_selection()),
        }
    }

    /// Read the region addressed by `expression`, or every element if [`None`].
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the expression is invalid or out of bounds, or there is an underlying storage error.
    fn read(&self, expression: Option<&IndexExpression>) -> Result<ArrayBytes, ArrayError> {
        self.read_selection(&self.resolve(expression)?)
    }

    /// Write `bytes` to the region addressed by `expression`, or every element if [`None`].
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the expression is invalid or out of bounds, the length of `bytes` does not match the region, or there is an underlying storage error.
    fn write(&self, bytes: &[u8], expression: Option<&IndexExpression>) -> Result<(), ArrayError> {
        self.write_selection(&self.resolve(expression)?, bytes)
    }

    /// Read the region addressed by `expression` into a vector of its elements.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `T` is incompatible with the data type, or [`read`](DataSet::read) fails.
    fn read_elements<T: Element>(
        &self,
        expression: Option<&IndexExpression>,
    ) -> Result<Vec<T>, ArrayError>
    where
        Self: Sized,
    {
        T::validate_data_type(self.data_type())?;
        self.read(expression)?.into_elements::<T>()
    }

    /// Write `elements` to the region addressed by `expression`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `T` is incompatible with the data type, or [`write`](DataSet::write) fails.
    fn write_elements<T: Element>(
        &self,
        elements: &[T],
        expression: Option<&IndexExpression>,
    ) -> Result<(), ArrayError>
    where
        Self: Sized,
    {
        let bytes = T::into_array_bytes(self.data_type(), elements)?;
        self.write(&bytes, expression)
    }

    #[cfg(feature = "ndarray")]
    /// Read the region addressed by `expression` into an [`ndarray::ArrayD`].
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `T` is incompatible with the data type, or [`read`](DataSet::read) fails.
    fn read_ndarray<T: Element>(
        &self,
        expression: Option<&IndexExpression>,
    ) -> Result<ndarray::ArrayD<T>, ArrayError>
    where
        Self: Sized,
    {
        T::validate_data_type(self.data_type())?;
        self.read(expression)?.into_ndarray::<T>()
    }
}

/// An array.
///
/// ### Metadata
///
/// An array is defined by the following parameters (which are encoded in its JSON [`ArrayMetadata`]):
///  - **shape**: the length of each dimension,
///  - **data type**: the numerical representation of elements,
///  - **fill value**: the element value of regions that have never been written,
///
/// and optional parameters:
///  - **attributes**: user-defined attributes, and
///  - **virtual mappings**: the [`VirtualLayout`] of a virtual array.
///
/// ### Initialisation
///
/// A *new* array can be initialised with an [`ArrayBuilder`] or [`Array::new_with_metadata`].
/// An *existing* array can be initialised with [`Array::new`], its metadata is read from the store.
///
/// Array metadata must be written explicitly to the store with [`store_metadata`](Array::store_metadata) if an array is newly created or its attributes have been mutated.
///
/// ### Methods
///
/// Array operations are divided into categories based on the traits implemented for the backing [storage](crate::storage):
///  - [`ReadableStorageTraits`](crate::storage::ReadableStorageTraits): read array data and metadata
///    - [`retrieve_selection`](Array::retrieve_selection)
///    - [`retrieve_subset`](Array::retrieve_subset)
///  - [`ReadableWritableStorageTraits`](crate::storage::ReadableWritableStorageTraits): write array data and metadata
///    - [`store_metadata`](Array::store_metadata)
///    - [`store_selection`](Array::store_selection)
///    - [`set_data_extent`](Array::set_data_extent)
///
/// With readable and writable storage, an array is a [`DataSet`] and can be addressed with index expressions and [viewed](Array::view).
///
/// ### Parallel Writing
///
/// Writes touch only the bytes of the selected elements, so concurrent writes to disjoint regions (from any number of [`Array`]s or [`DataView`]s of the same node) are safe.
/// The value of elements in overlapping regions written concurrently depends on whichever write reached the store last.
#[derive(Debug)]
pub struct Array<TStorage: ?Sized> {
    /// The storage.
    storage: Arc<TStorage>,
    /// The path of the array in a store.
    path: NodePath,
    /// The length of each dimension.
    shape: ArrayShape,
    /// The data type.
    data_type: DataType,
    /// The element value of uninitialised portions of the array.
    fill_value: FillValue,
    /// Optional user defined attributes.
    attributes: serde_json::Map<String, serde_json::Value>,
    /// The mappings of a virtual array.
    virtual_mappings: Option<Vec<VirtualMapping>>,
}

impl<TStorage: ?Sized> Array<TStorage> {
    /// Create an array in `storage` at `path` with `metadata`.
    /// This does **not** write to the store, use [`store_metadata`](Array::store_metadata) to write `metadata` to `storage`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the path, the fill value, or a virtual mapping is invalid.
    pub fn new_with_metadata(
        storage: Arc<TStorage>,
        path: &str,
        metadata: ArrayMetadata,
    ) -> Result<Self, ArrayCreateError> {
        let path = NodePath::new(path)?;
        let fill_value = metadata
            .data_type
            .fill_value_from_metadata(&metadata.fill_value)?;
        if let Some(mappings) = &metadata.virtual_mappings {
            virtual_layout::validate_mappings(&metadata.shape, mappings)?;
        }
        Ok(Self {
            storage,
            path,
            shape: metadata.shape,
            data_type: metadata.data_type,
            fill_value,
            attributes: metadata.attributes,
            virtual_mappings: metadata.virtual_mappings,
        })
    }

    /// Mutably borrow the array attributes.
    #[must_use]
    pub fn attributes_mut(&mut self) -> &mut serde_json::Map<String, serde_json::Value> {
        &mut self.attributes
    }

    /// Get the node path.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// Get the data type.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Get the fill value.
    #[must_use]
    pub const fn fill_value(&self) -> &FillValue {
        &self.fill_value
    }

    /// Get the array shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Get the array dimensionality.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.shape.len()
    }

    /// Get the attributes.
    #[must_use]
    pub const fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.attributes
    }

    /// Returns true if the array is virtual.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.virtual_mappings.is_some()
    }

    /// Return the layout of a virtual array, or [`None`] if the array is not virtual.
    #[must_use]
    pub fn virtual_layout(&self) -> Option<VirtualLayout> {
        self.virtual_mappings.as_ref().map(|mappings| {
            VirtualLayout::new(
                self.shape.clone(),
                self.data_type,
                self.fill_value.clone(),
                mappings.clone(),
            )
        })
    }

    /// Create [`ArrayMetadata`].
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidFillValue`] if the fill value is incompatible with the data type.
    pub fn metadata(&self) -> Result<ArrayMetadata, ArrayError> {
        Ok(ArrayMetadata {
            shape: self.shape.clone(),
            data_type: self.data_type,
            fill_value: self.data_type.metadata_fill_value(&self.fill_value)?,
            attributes: self.attributes.clone(),
            virtual_mappings: self.virtual_mappings.clone(),
        })
    }

    /// Create an array builder matching the parameters of this array.
    #[must_use]
    pub fn builder(&self) -> ArrayBuilder {
        ArrayBuilder::from_array(self)
    }

    /// Create a [`DataView`] of this array bounded by `slices`.
    ///
    /// # Errors
    /// Returns [`DataViewCreateError`] if the number of slices does not match the dimensionality, or a slice is out of bounds.
    pub fn view(&self, slices: &[Slice]) -> Result<DataView<'_, Self>, DataViewCreateError>
    where
        Self: DataSet,
    {
        DataView::new(self, slices)
    }
}

#[cfg(feature = "ndarray")]
fn elements_to_ndarray<T>(shape: &[u64], elements: Vec<T>) -> Result<ndarray::ArrayD<T>, ArrayError> {
    let length = elements.len();
    let err = || ArrayError::InvalidBytesInputSize(length, shape.iter().product());
    let shape = shape
        .iter()
        .map(|&dimension| usize::try_from(dimension))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| err())?;
    ndarray::ArrayD::<T>::from_shape_vec(shape, elements).map_err(|_| err())
}
