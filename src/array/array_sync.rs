use std::sync::Arc;

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    array_subset::{ArraySubset, IncompatibleDimensionalityError},
    byte_range::byte_ranges_from_runs,
    config::global_config,
    node::NodePath,
    selection::Selection,
    storage::{
        data_key, meta_key, ReadableStorageTraits, ReadableWritableStorageTraits,
        StoreKeyStartValue,
    },
};

use super::{
    Array, ArrayBytes, ArrayCreateError, ArrayError, ArrayMetadata, ArrayShape, DataSet, DataType,
    VirtualMapping,
};

/// The part of a virtual array selection backed by one mapping.
struct MappedRegion {
    /// The region of the (unsqueezed) selection output covered by the mapping.
    output_region: ArraySubset,
    /// The selection of the mapped source array.
    source_selection: Selection,
}

impl MappedRegion {
    fn new(mapping: &VirtualMapping, selection: &Selection) -> Result<Option<Self>, ArrayError> {
        let target = mapping.target_region();
        let source = mapping.source_region();
        let squeezed = usize::from(mapping.squeezed_axis().is_some());
        if target.dimensionality() != selection.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                target.dimensionality(),
                selection.dimensionality(),
            )
            .into());
        }
        if source.dimensionality() + squeezed != selection.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                source.dimensionality() + squeezed,
                selection.dimensionality(),
            )
            .into());
        }
        let mut output_ranges = Vec::with_capacity(selection.dimensionality());
        let mut source_dimensions = Vec::with_capacity(source.dimensionality());
        let mut source_axis = 0;
        for (axis, dimension) in selection.iter().enumerate() {
            let target_start = target.start()[axis];
            let target_stop = target_start + target.shape()[axis];
            let (positions, restricted) = dimension.restrict(target_start, target_stop);
            if positions.is_empty() {
                return Ok(None);
            }
            output_ranges.push(positions);
            if mapping.squeezed_axis() != Some(axis) {
                source_dimensions
                    .push(restricted.rebase(target_start, source.start()[source_axis]));
                source_axis += 1;
            }
        }
        Ok(Some(Self {
            output_region: ArraySubset::new_with_ranges(&output_ranges),
            source_selection: Selection::new(source_dimensions),
        }))
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits> Array<TStorage> {
    /// Create an array in `storage` at `path`. The metadata is read from the store.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if there is a storage error or any metadata is invalid.
    pub fn new(storage: Arc<TStorage>, path: &str) -> Result<Self, ArrayCreateError> {
        let node_path = NodePath::new(path)?;
        let metadata: ArrayMetadata = serde_json::from_slice(
            &storage
                .get(&meta_key(&node_path))?
                .ok_or(ArrayCreateError::MissingMetadata)?,
        )?;
        Self::new_with_metadata(storage, path, metadata)
    }

    fn validate_selection(&self, selection: &Selection) -> Result<(), ArrayError> {
        if selection.dimensionality() != self.dimensionality() {
            Err(IncompatibleDimensionalityError::new(
                selection.dimensionality(),
                self.dimensionality(),
            )
            .into())
        } else if selection.inbounds(self.shape()) {
            Ok(())
        } else {
            Err(ArrayError::InvalidSelection(
                selection.clone(),
                self.shape().to_vec(),
            ))
        }
    }

    fn open_source(&self, source: &NodePath) -> Result<Self, ArrayError> {
        Self::new(self.storage.clone(), source.as_str())
            .map_err(|err| ArrayError::VirtualSourceError(source.clone(), Box::new(err)))
    }

    /// Read the elements in `selection`.
    ///
    /// Elements that have never been written hold the fill value.
    /// Dimensions addressed by a [`DimensionSelection::Index`](crate::selection::DimensionSelection::Index) are squeezed from the shape of the returned bytes.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the selection dimensionality does not match the array dimensionality,
    ///  - the selection is not within the array shape,
    ///  - a mapped source of a virtual array is invalid, or
    ///  - there is an underlying store error.
    pub fn retrieve_selection(&self, selection: &Selection) -> Result<ArrayBytes, ArrayError> {
        self.validate_selection(selection)?;
        let bytes = if let Some(mappings) = &self.virtual_mappings {
            self.retrieve_virtual_selection(mappings, selection)?
        } else {
            let runs = selection.contiguous_linearised_indices(self.shape())?;
            let byte_ranges = byte_ranges_from_runs(&runs, self.data_type().size());
            let num_elements = usize::try_from(selection.num_elements())
                .map_err(|_| ArrayError::InvalidSelection(selection.clone(), self.shape().to_vec()))?;
            match self
                .storage
                .get_partial_values_key(&data_key(self.path()), &byte_ranges)?
            {
                Some(values) => values.concat(),
                None => self.fill_value().repeat(num_elements),
            }
        };
        ArrayBytes::new(bytes, selection.shape(), *self.data_type())
    }

    /// Read the elements in `array_subset`.
    ///
    /// # Errors
    /// See [`retrieve_selection`](Array::retrieve_selection).
    pub fn retrieve_subset(&self, array_subset: &ArraySubset) -> Result<ArrayBytes, ArrayError> {
        self.retrieve_selection(&Selection::from(array_subset))
    }

    fn retrieve_virtual_selection(
        &self,
        mappings: &[VirtualMapping],
        selection: &Selection,
    ) -> Result<Vec<u8>, ArrayError> {
        let element_size = self.data_type().size();
        let output_shape = selection.unsqueezed_shape();
        let num_elements = usize::try_from(selection.num_elements())
            .map_err(|_| ArrayError::InvalidSelection(selection.clone(), self.shape().to_vec()))?;
        let mut output = self.fill_value().repeat(num_elements);

        let retrieve_mapping = |mapping: &VirtualMapping| -> Result<Option<(ArraySubset, Vec<u8>)>, ArrayError> {
            let Some(region) = MappedRegion::new(mapping, selection)? else {
                return Ok(None);
            };
            let source = self.open_source(mapping.source())?;
            if source.data_type() != self.data_type() {
                return Err(ArrayError::IncompatibleElementType);
            }
            let bytes = source.retrieve_selection(&region.source_selection)?;
            Ok(Some((region.output_region, bytes.into_bytes())))
        };
        let regions = if global_config().virtual_concurrent_reads() {
            mappings
                .par_iter()
                .map(retrieve_mapping)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            mappings
                .iter()
                .map(retrieve_mapping)
                .collect::<Result<Vec<_>, _>>()?
        };
        log::debug!(
            "resolved {} of {} mappings of virtual array {} for selection {selection}",
            regions.iter().flatten().count(),
            mappings.len(),
            self.path()
        );

        // Later mappings overwrite earlier mappings
        for (output_region, bytes) in regions.into_iter().flatten() {
            output_region.store_bytes(&bytes, &mut output, &output_shape, element_size)?;
        }
        Ok(output)
    }
}

impl<TStorage: ?Sized + ReadableWritableStorageTraits> Array<TStorage> {
    /// Store metadata.
    ///
    /// The data value of a non-virtual array is initialised with the fill value if it does not exist.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the fill value is invalid or there is an underlying store error.
    pub fn store_metadata(&self) -> Result<(), ArrayError> {
        let metadata = serde_json::to_vec_pretty(&self.metadata()?)?;
        self.storage.set(&meta_key(self.path()), &metadata)?;
        if !self.is_virtual() {
            self.initialise_data()?;
        }
        Ok(())
    }

    fn initialise_data(&self) -> Result<(), ArrayError> {
        let key = data_key(self.path());
        if self.storage.size_key(&key)?.is_none() {
            let num_elements = usize::try_from(self.shape().iter().product::<u64>()).map_err(|_| {
                ArrayError::InvalidSelection(Selection::new_with_shape(self.shape()), self.shape().to_vec())
            })?;
            self.storage
                .set(&key, &self.fill_value().repeat(num_elements))?;
        }
        Ok(())
    }

    /// Write `bytes` to the elements in `selection`.
    ///
    /// If the [validate write size](crate::config::Config#validate-write-size) configuration is disabled, a mismatched `bytes` length is not rejected:
    /// surplus bytes are ignored and elements without bytes are left unchanged.
    /// Writes to a virtual array are always validated.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the selection dimensionality does not match the array dimensionality,
    ///  - the selection is not within the array shape,
    ///  - the length of `bytes` does not match the number of selected elements,
    ///  - a mapped source of a virtual array is invalid, or
    ///  - there is an underlying store error.
    pub fn store_selection(&self, selection: &Selection, bytes: &[u8]) -> Result<(), ArrayError> {
        self.validate_selection(selection)?;
        let element_size = self.data_type().size();
        let expected_size = selection.num_elements() * element_size as u64;
        if bytes.len() as u64 != expected_size && global_config().validate_write_size() {
            return Err(ArrayError::InvalidBytesInputSize(bytes.len(), expected_size));
        }
        if let Some(mappings) = &self.virtual_mappings {
            return self.store_virtual_selection(mappings, selection, bytes);
        }

        self.initialise_data()?;
        let key = data_key(self.path());
        let runs = selection.contiguous_linearised_indices(self.shape())?;
        let mut key_start_values = Vec::with_capacity(runs.len());
        let mut offset = 0;
        for (index, count) in runs {
            let length = usize::try_from(count).unwrap_or(usize::MAX) * element_size;
            let end = std::cmp::min(offset + length, bytes.len());
            if offset >= end {
                break;
            }
            key_start_values.push(StoreKeyStartValue::new(
                key.clone(),
                index * element_size as u64,
                &bytes[offset..end],
            ));
            offset = end;
        }
        self.storage.set_partial_values(&key_start_values)?;
        Ok(())
    }

    /// Write `bytes` to the elements in `array_subset`.
    ///
    /// # Errors
    /// See [`store_selection`](Array::store_selection).
    pub fn store_subset(&self, array_subset: &ArraySubset, bytes: &[u8]) -> Result<(), ArrayError> {
        self.store_selection(&Selection::from(array_subset), bytes)
    }

    fn store_virtual_selection(
        &self,
        mappings: &[VirtualMapping],
        selection: &Selection,
        bytes: &[u8],
    ) -> Result<(), ArrayError> {
        let element_size = self.data_type().size();
        let output_shape = selection.unsqueezed_shape();
        let expected_size = selection.num_elements() * element_size as u64;
        if bytes.len() as u64 != expected_size {
            return Err(ArrayError::InvalidBytesInputSize(bytes.len(), expected_size));
        }
        for mapping in mappings {
            let Some(region) = MappedRegion::new(mapping, selection)? else {
                continue;
            };
            let source = self.open_source(mapping.source())?;
            let source_bytes = region
                .output_region
                .extract_bytes(bytes, &output_shape, element_size)?;
            source.store_selection(&region.source_selection, &source_bytes)?;
        }
        Ok(())
    }

    /// Set the extent of the array, preserving the elements in the region common to the old and new extent.
    ///
    /// New elements hold the fill value.
    /// The metadata is updated in the store.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the array is virtual,
    ///  - the dimensionality of `extent` does not match the array dimensionality, or
    ///  - there is an underlying store error.
    pub fn set_data_extent(&mut self, extent: &[u64]) -> Result<(), ArrayError> {
        if self.is_virtual() {
            return Err(ArrayError::VirtualArrayResize);
        }
        if extent.len() != self.dimensionality() {
            return Err(
                IncompatibleDimensionalityError::new(extent.len(), self.dimensionality()).into(),
            );
        }
        if extent == self.shape() {
            return self.store_metadata();
        }

        let element_size = self.data_type().size();
        let old_shape: ArrayShape = self.shape().to_vec();
        let new_shape: ArrayShape = extent.to_vec();
        let key = data_key(self.path());
        let num_elements = usize::try_from(new_shape.iter().product::<u64>()).map_err(|_| {
            ArrayError::InvalidSelection(Selection::new_with_shape(&new_shape), old_shape.clone())
        })?;
        let mut new_bytes = self.fill_value().repeat(num_elements);
        if let Some(old_bytes) = self.storage.get(&key)? {
            let overlap = ArraySubset::new_with_shape(old_shape.clone())
                .overlap(&ArraySubset::new_with_shape(new_shape.clone()))?;
            let overlap_bytes = overlap.extract_bytes(&old_bytes, &old_shape, element_size)?;
            overlap.store_bytes(&overlap_bytes, &mut new_bytes, &new_shape, element_size)?;
        }
        self.storage.set(&key, &new_bytes)?;
        log::debug!(
            "resized array {} from {old_shape:?} to {new_shape:?}",
            self.path()
        );
        self.shape = new_shape;
        self.store_metadata()
    }
}

impl<TStorage: ?Sized + ReadableWritableStorageTraits> DataSet for Array<TStorage> {
    fn data_extent(&self) -> ArrayShape {
        self.shape().to_vec()
    }

    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn read_selection(&self, selection: &Selection) -> Result<ArrayBytes, ArrayError> {
        self.retrieve_selection(selection)
    }

    fn write_selection(&self, selection: &Selection, bytes: &[u8]) -> Result<(), ArrayError> {
        self.store_selection(selection, bytes)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        array::{ArrayBuilder, Element, FillValue},
        indexer::{IndexExpression, Slice},
        storage::{store::MemoryStore, WritableStorageTraits},
    };

    use super::*;

    fn array_4x4(store: &Arc<MemoryStore>) -> Array<MemoryStore> {
        let array = ArrayBuilder::new(vec![4, 4], DataType::UInt16, FillValue::from(9u16))
            .build(store.clone(), "/array")
            .unwrap();
        array.store_metadata().unwrap();
        array
    }

    #[test]
    fn array_fill_value() {
        let store = Arc::new(MemoryStore::new());
        let array = array_4x4(&store);
        assert_eq!(
            array.read_elements::<u16>(None).unwrap(),
            vec![9; 16]
        );
        store.erase(&data_key(array.path())).unwrap();
        assert_eq!(
            array
                .retrieve_subset(&ArraySubset::new_with_ranges(&[1..2, 0..2]))
                .unwrap()
                .into_elements::<u16>()
                .unwrap(),
            vec![9; 2]
        );
    }

    #[test]
    fn array_store_retrieve() {
        let store = Arc::new(MemoryStore::new());
        let array = array_4x4(&store);
        let subset = ArraySubset::new_with_ranges(&[1..3, 1..3]);
        let bytes = u16::into_array_bytes(&DataType::UInt16, &[1, 2, 3, 4]).unwrap();
        array.store_subset(&subset, &bytes).unwrap();
        assert_eq!(
            array.read_elements::<u16>(None).unwrap(),
            vec![
                9, 9, 9, 9, //
                9, 1, 2, 9, //
                9, 3, 4, 9, //
                9, 9, 9, 9,
            ]
        );

        let column = array
            .read(Some(&(Slice::full(), 2).into()))
            .unwrap();
        assert_eq!(column.shape(), &[4]);
        assert_eq!(column.into_elements::<u16>().unwrap(), vec![9, 2, 4, 9]);

        let strided = array
            .read_elements::<u16>(Some(&"1:3, ::2".parse::<IndexExpression>().unwrap()))
            .unwrap();
        assert_eq!(strided, vec![9, 2, 9, 4]);
    }

    #[test]
    fn array_store_invalid() {
        let store = Arc::new(MemoryStore::new());
        let array = array_4x4(&store);
        let subset = ArraySubset::new_with_ranges(&[0..1, 0..5]);
        assert!(matches!(
            array.store_subset(&subset, &[0; 10]),
            Err(ArrayError::InvalidSelection(_, _))
        ));
        let subset = ArraySubset::new_with_ranges(&[0..1, 0..2]);
        assert!(matches!(
            array.store_subset(&subset, &[0; 3]),
            Err(ArrayError::InvalidBytesInputSize(3, 4))
        ));
        assert!(matches!(
            array.read_elements::<u8>(None),
            Err(ArrayError::IncompatibleElementType)
        ));
        assert!(matches!(
            array.read(Some(&IndexExpression::from(4))),
            Err(ArrayError::IndexError(_))
        ));
    }

    #[test]
    fn array_set_data_extent() {
        let store = Arc::new(MemoryStore::new());
        let mut array = array_4x4(&store);
        array
            .write_elements::<u16>(&(0..16).collect::<Vec<_>>(), None)
            .unwrap();
        array.set_data_extent(&[2, 6]).unwrap();
        assert_eq!(array.data_extent(), vec![2, 6]);
        assert_eq!(
            array.read_elements::<u16>(None).unwrap(),
            vec![0, 1, 2, 3, 9, 9, 4, 5, 6, 7, 9, 9]
        );
        let reopened = Array::new(store, "/array").unwrap();
        assert_eq!(reopened.shape(), &[2, 6]);
        assert!(array.set_data_extent(&[2]).is_err());
    }
}
