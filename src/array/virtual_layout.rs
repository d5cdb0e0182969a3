//! Virtual array layouts.
//!
//! A virtual array has no data of its own.
//! Its elements are mapped, region by region, from other arrays in the same store.
//!
//! A [`VirtualLayoutBuilder`] accumulates [`VirtualMapping`]s and is consumed by [`finalize`](VirtualLayoutBuilder::finalize) into an immutable [`VirtualLayout`].
//! The layout is then used to create the virtual array with [`ArrayBuilder::new_virtual`](super::ArrayBuilder::new_virtual).
//!
//! When a virtual array is read, mappings are applied in order, so a later mapping takes precedence over an earlier one where their target regions overlap.
//! Elements not covered by any mapping read as the fill value.
//! A write is forwarded to every mapping intersecting the written region.
//!
//! A finalized layout cannot be appended to:
//! ```compile_fail
//! # use std::sync::Arc;
//! # use nixio::array::{ArrayBuilder, DataType, VirtualLayoutBuilder};
//! # let store = Arc::new(nixio::storage::store::MemoryStore::new());
//! # let source = ArrayBuilder::new(vec![2], DataType::UInt8, 0u8.into()).build(store, "/source").unwrap();
//! let mut builder = VirtualLayoutBuilder::new(vec![4], DataType::UInt8);
//! builder.append(&source, 0).unwrap();
//! let layout = builder.finalize();
//! layout.append(&source, 0);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    array_subset::{ArraySubset, IncompatibleDimensionalityError},
    node::NodePath,
};

use super::{Array, ArrayShape, DataType, FillValue};

/// A mapping of a region of a source array to a region of a virtual array.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct VirtualMapping {
    source: NodePath,
    source_region: ArraySubset,
    target_region: ArraySubset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    squeezed_axis: Option<usize>,
}

impl VirtualMapping {
    /// Return the path of the source array.
    #[must_use]
    pub const fn source(&self) -> &NodePath {
        &self.source
    }

    /// Return the region of the source array.
    #[must_use]
    pub const fn source_region(&self) -> &ArraySubset {
        &self.source_region
    }

    /// Return the region of the virtual array.
    #[must_use]
    pub const fn target_region(&self) -> &ArraySubset {
        &self.target_region
    }

    /// Return the axis of the target region that has no counterpart in the source region.
    ///
    /// A source with one fewer dimension than the virtual array occupies a single index along this axis.
    #[must_use]
    pub const fn squeezed_axis(&self) -> Option<usize> {
        self.squeezed_axis
    }
}

/// A virtual layout error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VirtualLayoutError {
    /// The data type of a source array does not match the data type of the layout.
    #[error("source array {_0} has data type {_1}, expected {_2}")]
    IncompatibleDataType(NodePath, DataType, DataType),
    /// A source region outside of the source array.
    #[error("source region {_1} is out of bounds of source array {_0} with shape {_2:?}")]
    SourceRegionOutOfBounds(NodePath, ArraySubset, ArrayShape),
    /// A target region outside of the virtual array.
    #[error("target region {_0} is out of bounds of the virtual array with shape {_1:?}")]
    TargetRegionOutOfBounds(ArraySubset, ArrayShape),
    /// The source and target regions have different shapes.
    #[error("source region {_0} and target region {_1} have different shapes")]
    RegionShapeMismatch(ArraySubset, ArraySubset),
    /// Incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// An axis outside of the virtual array.
    #[error("axis {_0} is out of bounds for a virtual array with {_1} dimensions")]
    AxisOutOfBounds(usize, usize),
    /// An array shape or data type that differs from the layout.
    #[error("array with shape {_0:?} and data type {_1} does not match a virtual layout with shape {_2:?} and data type {_3}")]
    LayoutMismatch(ArrayShape, DataType, ArrayShape, DataType),
}

/// Validate the target of each of `mappings` against a virtual array with `shape`.
///
/// The source region of a mapping must have the shape of its target region, less the squeezed axis if any.
pub(super) fn validate_mappings(
    shape: &[u64],
    mappings: &[VirtualMapping],
) -> Result<(), VirtualLayoutError> {
    for mapping in mappings {
        let target_region = &mapping.target_region;
        if target_region.dimensionality() != shape.len() {
            return Err(IncompatibleDimensionalityError::new(
                target_region.dimensionality(),
                shape.len(),
            )
            .into());
        }
        if !target_region.inbounds(shape) {
            return Err(VirtualLayoutError::TargetRegionOutOfBounds(
                target_region.clone(),
                shape.to_vec(),
            ));
        }
        let mut expected_source_shape = target_region.shape().to_vec();
        if let Some(axis) = mapping.squeezed_axis {
            if axis >= shape.len() {
                return Err(VirtualLayoutError::AxisOutOfBounds(axis, shape.len()));
            }
            if expected_source_shape.remove(axis) != 1 {
                return Err(VirtualLayoutError::RegionShapeMismatch(
                    mapping.source_region.clone(),
                    target_region.clone(),
                ));
            }
        }
        if mapping.source_region.shape() != expected_source_shape {
            return Err(VirtualLayoutError::RegionShapeMismatch(
                mapping.source_region.clone(),
                target_region.clone(),
            ));
        }
    }
    Ok(())
}

/// A builder of a [`VirtualLayout`].
///
/// For example, stacking four arrays of shape `(L, C)` along axis 0:
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # use std::sync::Arc;
/// use nixio::array::{ArrayBuilder, DataType, VirtualLayoutBuilder};
/// # let store = Arc::new(nixio::storage::store::MemoryStore::new());
/// let (l, c) = (5, 3);
/// let mut builder = VirtualLayoutBuilder::new(vec![4 * l, c], DataType::Float64);
/// for i in 0..4 {
///     let source = ArrayBuilder::new(vec![l, c], DataType::Float64, 0f64.into())
///         .build(store.clone(), &format!("/source_{i}"))?;
///     builder.append(&source, 0)?;
/// }
/// let layout = builder.finalize();
/// assert_eq!(layout.mappings()[3].target_region().start(), &[3 * l, 0]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct VirtualLayoutBuilder {
    shape: ArrayShape,
    data_type: DataType,
    fill_value: FillValue,
    mappings: Vec<VirtualMapping>,
    append_cursors: Vec<u64>,
}

impl VirtualLayoutBuilder {
    /// Create a new virtual layout builder for a virtual array with `shape` and `data_type`.
    ///
    /// The fill value is zero (or false) unless changed with [`fill_value`](VirtualLayoutBuilder::fill_value).
    #[must_use]
    pub fn new(shape: ArrayShape, data_type: DataType) -> Self {
        Self {
            append_cursors: vec![0; shape.len()],
            shape,
            data_type,
            fill_value: data_type.default_fill_value(),
            mappings: Vec::new(),
        }
    }

    /// Set the fill value of elements not covered by any mapping.
    pub fn fill_value(&mut self, fill_value: FillValue) -> &mut Self {
        self.fill_value = fill_value;
        self
    }

    /// Return the shape of the virtual array.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the mappings registered so far.
    #[must_use]
    pub fn mappings(&self) -> &[VirtualMapping] {
        &self.mappings
    }

    fn validate_source<TStorage: ?Sized>(
        &self,
        source: &Array<TStorage>,
        source_region: &ArraySubset,
    ) -> Result<(), VirtualLayoutError> {
        if source.data_type() != &self.data_type {
            return Err(VirtualLayoutError::IncompatibleDataType(
                source.path().clone(),
                *source.data_type(),
                self.data_type,
            ));
        }
        if source_region.dimensionality() != source.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                source_region.dimensionality(),
                source.dimensionality(),
            )
            .into());
        }
        if !source_region.inbounds(source.shape()) {
            return Err(VirtualLayoutError::SourceRegionOutOfBounds(
                source.path().clone(),
                source_region.clone(),
                source.shape().to_vec(),
            ));
        }
        Ok(())
    }

    fn validate_target(&self, target_region: &ArraySubset) -> Result<(), VirtualLayoutError> {
        if target_region.dimensionality() != self.shape.len() {
            return Err(IncompatibleDimensionalityError::new(
                target_region.dimensionality(),
                self.shape.len(),
            )
            .into());
        }
        if !target_region.inbounds(&self.shape) {
            return Err(VirtualLayoutError::TargetRegionOutOfBounds(
                target_region.clone(),
                self.shape.clone(),
            ));
        }
        Ok(())
    }

    /// Map `source_region` of `source` to `target_region` of the virtual array.
    ///
    /// The source must have the same dimensionality as the virtual array.
    ///
    /// # Errors
    /// Returns a [`VirtualLayoutError`] if
    ///  - the data type of `source` does not match the layout,
    ///  - `source_region` is not within the shape of `source`,
    ///  - `target_region` is not within the shape of the virtual array, or
    ///  - the regions have different shapes.
    pub fn map<TStorage: ?Sized>(
        &mut self,
        source: &Array<TStorage>,
        source_region: ArraySubset,
        target_region: ArraySubset,
    ) -> Result<&mut Self, VirtualLayoutError> {
        self.validate_source(source, &source_region)?;
        self.validate_target(&target_region)?;
        if source_region.shape() != target_region.shape() {
            return Err(VirtualLayoutError::RegionShapeMismatch(
                source_region,
                target_region,
            ));
        }
        self.push(source.path().clone(), source_region, target_region, None);
        Ok(self)
    }

    /// Append all of `source` to the virtual array along `axis`.
    ///
    /// The target region starts at the end of the previous append along `axis`, and at the origin in all other dimensions.
    ///  - A source with the same dimensionality as the virtual array occupies its own extent along `axis`.
    ///  - A source with one fewer dimension occupies a single index along `axis`.
    ///
    /// The layout is unchanged if an error is returned.
    ///
    /// # Errors
    /// Returns a [`VirtualLayoutError`] if
    ///  - `axis` is out of bounds,
    ///  - the data type of `source` does not match the layout,
    ///  - the source dimensionality is incompatible with the virtual array, or
    ///  - the source does not fit in the remaining space along `axis`.
    pub fn append<TStorage: ?Sized>(
        &mut self,
        source: &Array<TStorage>,
        axis: usize,
    ) -> Result<&mut Self, VirtualLayoutError> {
        let dimensionality = self.shape.len();
        if axis >= dimensionality {
            return Err(VirtualLayoutError::AxisOutOfBounds(axis, dimensionality));
        }
        let source_region = ArraySubset::new_with_shape(source.shape().to_vec());
        self.validate_source(source, &source_region)?;

        let (target_shape, squeezed_axis) = if source.dimensionality() == dimensionality {
            (source.shape().to_vec(), None)
        } else if source.dimensionality() + 1 == dimensionality {
            let mut target_shape = source.shape().to_vec();
            target_shape.insert(axis, 1);
            (target_shape, Some(axis))
        } else {
            return Err(
                IncompatibleDimensionalityError::new(source.dimensionality(), dimensionality)
                    .into(),
            );
        };
        let mut target_start = vec![0; dimensionality];
        target_start[axis] = self.append_cursors[axis];
        let slab = target_shape[axis];
        let target_region = ArraySubset::new_with_start_shape(target_start, target_shape)?;
        self.validate_target(&target_region)?;

        self.append_cursors[axis] += slab;
        self.push(
            source.path().clone(),
            source_region,
            target_region,
            squeezed_axis,
        );
        Ok(self)
    }

    fn push(
        &mut self,
        source: NodePath,
        source_region: ArraySubset,
        target_region: ArraySubset,
        squeezed_axis: Option<usize>,
    ) {
        log::debug!("mapping {source_region} of {source} to {target_region} of virtual array");
        self.mappings.push(VirtualMapping {
            source,
            source_region,
            target_region,
            squeezed_axis,
        });
    }

    /// Freeze the mappings into a [`VirtualLayout`].
    ///
    /// Overlapping target regions are permitted, and are logged as a warning.
    #[must_use]
    pub fn finalize(self) -> VirtualLayout {
        for (i, earlier) in self.mappings.iter().enumerate() {
            for later in &self.mappings[i + 1..] {
                let overlapping = earlier
                    .target_region
                    .overlap(&later.target_region)
                    .is_ok_and(|overlap| !overlap.is_empty());
                if overlapping {
                    log::warn!(
                        "virtual mapping of {} overlaps the earlier mapping of {} in {}",
                        later.source,
                        earlier.source,
                        later.target_region
                    );
                }
            }
        }
        VirtualLayout::new(self.shape, self.data_type, self.fill_value, self.mappings)
    }
}

/// A finalized virtual array layout.
#[derive(Clone, Debug, PartialEq)]
pub struct VirtualLayout {
    shape: ArrayShape,
    data_type: DataType,
    fill_value: FillValue,
    mappings: Vec<VirtualMapping>,
}

impl VirtualLayout {
    pub(super) fn new(
        shape: ArrayShape,
        data_type: DataType,
        fill_value: FillValue,
        mappings: Vec<VirtualMapping>,
    ) -> Self {
        Self {
            shape,
            data_type,
            fill_value,
            mappings,
        }
    }

    /// Check that an array with `shape` and `data_type` can be backed by this layout.
    pub(super) fn validate(
        &self,
        shape: &[u64],
        data_type: &DataType,
    ) -> Result<(), VirtualLayoutError> {
        if shape != self.shape.as_slice() || data_type != &self.data_type {
            return Err(VirtualLayoutError::LayoutMismatch(
                shape.to_vec(),
                *data_type,
                self.shape.clone(),
                self.data_type,
            ));
        }
        validate_mappings(shape, &self.mappings)
    }

    /// Return the shape of the virtual array.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the data type of the virtual array.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Return the fill value of the virtual array.
    #[must_use]
    pub const fn fill_value(&self) -> &FillValue {
        &self.fill_value
    }

    /// Return the mappings in the order they are applied.
    #[must_use]
    pub fn mappings(&self) -> &[VirtualMapping] {
        &self.mappings
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{array::ArrayBuilder, storage::store::MemoryStore};

    use super::*;

    fn source(store: &Arc<MemoryStore>, path: &str, shape: ArrayShape) -> Array<MemoryStore> {
        ArrayBuilder::new(shape, DataType::Int16, 0i16.into())
            .build(store.clone(), path)
            .unwrap()
    }

    #[test]
    fn virtual_layout_append() {
        let store = Arc::new(MemoryStore::new());
        let mut builder = VirtualLayoutBuilder::new(vec![8, 3], DataType::Int16);
        for i in 0..4 {
            let source = source(&store, &format!("/s{i}"), vec![2, 3]);
            builder.append(&source, 0).unwrap();
        }
        let layout = builder.finalize();
        let targets = layout
            .mappings()
            .iter()
            .map(|mapping| mapping.target_region().to_ranges())
            .collect::<Vec<_>>();
        assert_eq!(
            targets,
            vec![
                vec![0..2, 0..3],
                vec![2..4, 0..3],
                vec![4..6, 0..3],
                vec![6..8, 0..3]
            ]
        );
        assert_eq!(layout.mappings()[2].source().as_str(), "/s2");
    }

    #[test]
    fn virtual_layout_append_squeezed() {
        let store = Arc::new(MemoryStore::new());
        let mut builder = VirtualLayoutBuilder::new(vec![3, 5], DataType::Int16);
        let row = source(&store, "/row", vec![5]);
        builder.append(&row, 0).unwrap().append(&row, 0).unwrap();
        let mapping = &builder.mappings()[1];
        assert_eq!(mapping.target_region().to_ranges(), vec![1..2, 0..5]);
        assert_eq!(mapping.source_region().to_ranges(), vec![0..5]);
        assert_eq!(mapping.squeezed_axis(), Some(0));
    }

    #[test]
    fn virtual_layout_append_errors() {
        let store = Arc::new(MemoryStore::new());
        let mut builder = VirtualLayoutBuilder::new(vec![4, 3], DataType::Int16);
        let a = source(&store, "/a", vec![3, 3]);
        builder.append(&a, 0).unwrap();
        assert_eq!(
            builder.append(&a, 0).unwrap_err(),
            VirtualLayoutError::TargetRegionOutOfBounds(
                ArraySubset::new_with_ranges(&[3..6, 0..3]),
                vec![4, 3]
            )
        );
        // a failed append leaves the layout unchanged
        assert_eq!(builder.mappings().len(), 1);
        let one_row = source(&store, "/b", vec![1, 3]);
        builder.append(&one_row, 0).unwrap();
        assert_eq!(
            builder.mappings()[1].target_region().to_ranges(),
            vec![3..4, 0..3]
        );

        assert!(matches!(
            builder.append(&one_row, 2),
            Err(VirtualLayoutError::AxisOutOfBounds(2, 2))
        ));
        let cube = source(&store, "/c", vec![1, 1, 1, 1]);
        assert!(matches!(
            builder.append(&cube, 0),
            Err(VirtualLayoutError::IncompatibleDimensionality(_))
        ));
        let float = ArrayBuilder::new(vec![1, 3], DataType::Float32, 0f32.into())
            .build(store, "/d")
            .unwrap();
        assert!(matches!(
            builder.append(&float, 0),
            Err(VirtualLayoutError::IncompatibleDataType(_, DataType::Float32, DataType::Int16))
        ));
        assert_eq!(builder.mappings().len(), 2);
    }

    #[test]
    fn virtual_layout_map() {
        let store = Arc::new(MemoryStore::new());
        let mut builder = VirtualLayoutBuilder::new(vec![4, 4], DataType::Int16);
        let a = source(&store, "/a", vec![3, 3]);
        builder
            .map(
                &a,
                ArraySubset::new_with_ranges(&[1..3, 0..2]),
                ArraySubset::new_with_ranges(&[2..4, 2..4]),
            )
            .unwrap();
        assert!(matches!(
            builder.map(
                &a,
                ArraySubset::new_with_ranges(&[1..4, 0..2]),
                ArraySubset::new_with_ranges(&[0..3, 0..2]),
            ),
            Err(VirtualLayoutError::SourceRegionOutOfBounds(_, _, _))
        ));
        assert!(matches!(
            builder.map(
                &a,
                ArraySubset::new_with_ranges(&[0..2, 0..2]),
                ArraySubset::new_with_ranges(&[0..2, 0..3]),
            ),
            Err(VirtualLayoutError::RegionShapeMismatch(_, _))
        ));
        let layout = builder.finalize();
        assert_eq!(layout.mappings().len(), 1);
        assert_eq!(layout.shape(), &[4, 4]);
        assert_eq!(layout.fill_value(), &FillValue::from(0i16));
    }

    #[test]
    fn virtual_mapping_serde() {
        let store = Arc::new(MemoryStore::new());
        let mut builder = VirtualLayoutBuilder::new(vec![2, 3], DataType::Int16);
        builder.append(&source(&store, "/row", vec![3]), 0).unwrap();
        let layout = builder.finalize();
        let json = serde_json::to_string(&layout.mappings()[0]).unwrap();
        assert_eq!(
            json,
            r#"{"source":"/row","source_region":{"start":[0],"shape":[3]},"target_region":{"start":[0,0],"shape":[1,3]},"squeezed_axis":0}"#
        );
        let mapping: VirtualMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(&mapping, &layout.mappings()[0]);
    }

    #[test]
    fn virtual_layout_validate() {
        let store = Arc::new(MemoryStore::new());
        let mut builder = VirtualLayoutBuilder::new(vec![8, 3], DataType::Int16);
        for i in 0..4 {
            builder
                .append(&source(&store, &format!("/s{i}"), vec![2, 3]), 0)
                .unwrap();
        }
        let layout = builder.finalize();
        layout.validate(&[8, 3], &DataType::Int16).unwrap();
        assert!(matches!(
            layout.validate(&[3, 3], &DataType::Int16),
            Err(VirtualLayoutError::LayoutMismatch(_, _, _, _))
        ));
        assert!(matches!(
            layout.validate(&[8, 3], &DataType::UInt16),
            Err(VirtualLayoutError::LayoutMismatch(_, _, _, _))
        ));

        assert!(matches!(
            validate_mappings(&[3, 3], layout.mappings()),
            Err(VirtualLayoutError::TargetRegionOutOfBounds(_, _))
        ));
        assert!(matches!(
            validate_mappings(&[8, 3, 1], layout.mappings()),
            Err(VirtualLayoutError::IncompatibleDimensionality(_))
        ));
    }

    #[test]
    fn virtual_mapping_validate_regions() {
        let squeezed: VirtualMapping = serde_json::from_str(
            r#"{"source":"/row","source_region":{"start":[0],"shape":[3]},"target_region":{"start":[1,0],"shape":[1,3]},"squeezed_axis":0}"#,
        )
        .unwrap();
        validate_mappings(&[2, 3], &[squeezed.clone()]).unwrap();

        let wide_slab = VirtualMapping {
            target_region: ArraySubset::new_with_ranges(&[0..2, 0..3]),
            ..squeezed.clone()
        };
        assert!(matches!(
            validate_mappings(&[2, 3], &[wide_slab]),
            Err(VirtualLayoutError::RegionShapeMismatch(_, _))
        ));
        let bad_axis = VirtualMapping {
            squeezed_axis: Some(2),
            ..squeezed.clone()
        };
        assert!(matches!(
            validate_mappings(&[2, 3], &[bad_axis]),
            Err(VirtualLayoutError::AxisOutOfBounds(2, 2))
        ));
        let unsqueezed = VirtualMapping {
            squeezed_axis: None,
            ..squeezed
        };
        assert!(matches!(
            validate_mappings(&[2, 3], &[unsqueezed]),
            Err(VirtualLayoutError::RegionShapeMismatch(_, _))
        ));
    }
}
