use crate::{
    array_subset::{ArraySubset, IncompatibleDimensionalityError},
    bounding_box::{BoundingBox, DataViewCreateError},
    indexer::{IndexError, IndexExpression, Slice},
    selection::Selection,
};

use super::{ArrayBytes, ArrayError, ArrayShape, DataSet, DataType};

/// A bounded window onto a backing [`DataSet`].
///
/// A data view holds no data of its own.
/// It borrows its backing data set and a fixed [`BoundingBox`] in backing coordinates, and translates every index expression it is given into the coordinates of the backing data set.
/// An expression can never address elements outside of the bounding box.
///
/// The [`data_extent`](DataSet::data_extent) of a view is the extent of its bounding box and cannot be changed.
/// Its [`data_type`](DataSet::data_type) is that of the backing data set.
///
/// A data view is itself a [`DataSet`], so it is substitutable anywhere a data set is expected, including as the backing of another view.
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # use std::sync::Arc;
/// use nixio::array::{ArrayBuilder, DataSet, DataType, DataView};
/// use nixio::indexer::{IndexExpression, Slice};
/// # let store = Arc::new(nixio::storage::store::MemoryStore::new());
/// let array = ArrayBuilder::new(vec![10], DataType::UInt8, 0u8.into()).build(store, "/array")?;
/// array.store_metadata()?;
/// array.write_elements(&(0..10).collect::<Vec<u8>>(), None)?;
///
/// let view = DataView::new(&array, &[Slice::from(2..7)])?;
/// assert_eq!(view.data_extent(), vec![5]);
/// assert_eq!(view.read_elements::<u8>(None)?, vec![2, 3, 4, 5, 6]);
/// assert_eq!(view.read_elements::<u8>(Some(&IndexExpression::from(-1)))?, vec![6]);
/// assert_eq!(view.read_elements::<u8>(Some(&IndexExpression::from(1..4)))?, vec![3, 4, 5]);
/// assert!(view.read(Some(&IndexExpression::from(5))).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DataView<'a, T: DataSet + ?Sized> {
    backing: &'a T,
    bounding_box: BoundingBox,
}

impl<T: DataSet + ?Sized> Clone for DataView<'_, T> {
    fn clone(&self) -> Self {
        Self {
            backing: self.backing,
            bounding_box: self.bounding_box.clone(),
        }
    }
}

impl<'a, T: DataSet + ?Sized> DataView<'a, T> {
    /// Create a data view of `backing` bounded by `slices`.
    ///
    /// The slices are resolved against the current extent of `backing` once, at construction.
    ///
    /// # Errors
    /// Returns a [`DataViewCreateError`] if
    ///  - the number of slices does not match the dimensionality of `backing`,
    ///  - a slice stops beyond the extent of `backing`, or
    ///  - a slice has a step other than 1.
    pub fn new(backing: &'a T, slices: &[Slice]) -> Result<Self, DataViewCreateError> {
        let bounding_box = BoundingBox::new(slices, &backing.data_extent())?;
        log::debug!("created data view {bounding_box}");
        Ok(Self {
            backing,
            bounding_box,
        })
    }

    /// Create a data view of `backing` bounded by `subset`.
    ///
    /// # Errors
    /// Returns a [`DataViewCreateError`] if the dimensionality of `subset` does not match `backing`, or `subset` is out of bounds.
    pub fn from_subset(backing: &'a T, subset: &ArraySubset) -> Result<Self, DataViewCreateError> {
        let to_i64 = |value: u64| i64::try_from(value).unwrap_or(i64::MAX);
        let slices = subset
            .to_ranges()
            .into_iter()
            .map(|range| Slice::new(Some(to_i64(range.start)), Some(to_i64(range.end)), None))
            .collect::<Vec<_>>();
        Self::new(backing, &slices)
    }

    /// Return the backing data set.
    #[must_use]
    pub fn backing(&self) -> &'a T {
        self.backing
    }

    /// Return the bounding box in backing coordinates.
    #[must_use]
    pub const fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Translate an index expression in view coordinates to a [`Selection`] in backing coordinates.
    ///
    /// [`None`] selects the whole bounding box.
    ///
    /// # Errors
    /// Returns an [`IndexError`] if the expression is invalid or escapes the bounding box.
    pub fn transform_coordinates(
        &self,
        expression: Option<&IndexExpression>,
    ) -> Result<Selection, IndexError> {
        match expression {
            Some(expression) => self.bounding_box.transform(expression),
            None => Ok(self.bounding_box.to_selection()),
        }
    }

    fn to_backing(&self, selection: &Selection) -> Result<Selection, ArrayError> {
        let extent = self.bounding_box.data_extent();
        if selection.dimensionality() != extent.len() {
            Err(IncompatibleDimensionalityError::new(selection.dimensionality(), extent.len()).into())
        } else if selection.inbounds(&extent) {
            Ok(selection.offset(&self.bounding_box.start())?)
        } else {
            Err(ArrayError::InvalidSelection(selection.clone(), extent))
        }
    }
}

impl<T: DataSet + ?Sized> DataSet for DataView<'_, T> {
    fn data_extent(&self) -> ArrayShape {
        self.bounding_box.data_extent()
    }

    fn data_type(&self) -> &DataType {
        self.backing.data_type()
    }

    fn read_selection(&self, selection: &Selection) -> Result<ArrayBytes, ArrayError> {
        self.backing.read_selection(&self.to_backing(selection)?)
    }

    fn write_selection(&self, selection: &Selection, bytes: &[u8]) -> Result<(), ArrayError> {
        self.backing
            .write_selection(&self.to_backing(selection)?, bytes)
    }

    fn read(&self, expression: Option<&IndexExpression>) -> Result<ArrayBytes, ArrayError> {
        self.backing
            .read_selection(&self.transform_coordinates(expression)?)
    }

    fn write(&self, bytes: &[u8], expression: Option<&IndexExpression>) -> Result<(), ArrayError> {
        self.backing
            .write_selection(&self.transform_coordinates(expression)?, bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        array::{Array, ArrayBuilder},
        indexer::Index,
        selection::{DimensionSelection, SelectionRange},
        storage::store::MemoryStore,
    };

    use super::*;

    fn array_1d() -> Array<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let array = ArrayBuilder::new(vec![10], DataType::Int32, 0i32.into())
            .build(store, "/array")
            .unwrap();
        array.store_metadata().unwrap();
        array
            .write_elements(&(0..10).collect::<Vec<i32>>(), None)
            .unwrap();
        array
    }

    fn array_3d() -> Array<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let array = ArrayBuilder::new(vec![4, 5, 6], DataType::UInt8, 0u8.into())
            .build(store, "/cube")
            .unwrap();
        array.store_metadata().unwrap();
        array
            .write_elements(&(0..120).collect::<Vec<u8>>(), None)
            .unwrap();
        array
    }

    #[test]
    fn data_view_create() {
        let array = array_3d();
        let view = DataView::new(
            &array,
            &[Slice::from(1..3), Slice::full(), Slice::from(-4..)],
        )
        .unwrap();
        assert_eq!(view.data_extent(), vec![2, 5, 4]);
        assert_eq!(view.bounding_box().ranges(), &[1..3, 0..5, 2..6]);
        assert_eq!(view.data_type(), &DataType::UInt8);
        assert_eq!(view.dimensionality(), 3);

        assert!(matches!(
            DataView::new(&array, &[Slice::from(1..3), Slice::full()]),
            Err(DataViewCreateError::IncompatibleDimensionality(_))
        ));
        assert!(matches!(
            DataView::new(&array, &[Slice::from(1..5), Slice::full(), Slice::full()]),
            Err(DataViewCreateError::OutOfBounds { dimension: 0, .. })
        ));
    }

    #[test]
    fn data_view_transform_coordinates() {
        let array = array_1d();
        let view = DataView::new(&array, &[Slice::from(2..7)]).unwrap();
        assert_eq!(
            view.transform_coordinates(Some(&0.into())).unwrap().dimensions(),
            &[DimensionSelection::Index(2)]
        );
        assert_eq!(
            view.transform_coordinates(Some(&(-1).into())).unwrap().dimensions(),
            &[DimensionSelection::Index(6)]
        );
        assert!(view
            .transform_coordinates(Some(&5.into()))
            .unwrap_err()
            .is_out_of_bounds());
        assert_eq!(
            view.transform_coordinates(Some(&(1..4).into())).unwrap().dimensions(),
            &[DimensionSelection::Range(SelectionRange::new_contiguous(3, 6))]
        );
        assert!(matches!(
            view.transform_coordinates(Some(&Slice::full().with_step(-1).into())),
            Err(IndexError::InvalidStep { dimension: 0, step: -1 })
        ));
        assert_eq!(
            view.transform_coordinates(None).unwrap(),
            view.bounding_box().to_selection()
        );
        assert_eq!(
            view.transform_coordinates(Some(&Slice::full().into())).unwrap(),
            view.bounding_box().to_selection()
        );
    }

    #[test]
    fn data_view_read_write() {
        let array = array_1d();
        let view = DataView::new(&array, &[Slice::from(2..7)]).unwrap();
        let full = view.read_elements::<i32>(None).unwrap();
        assert_eq!(full, vec![2, 3, 4, 5, 6]);
        assert_eq!(view.read_elements::<i32>(None).unwrap(), full);

        view.write_elements(&[-1i32, -2], Some(&(3..).into()))
            .unwrap();
        assert_eq!(
            array.read_elements::<i32>(None).unwrap(),
            vec![0, 1, 2, 3, 4, -1, -2, 7, 8, 9]
        );
        assert!(matches!(
            view.write_elements(&[0i32], Some(&5.into())),
            Err(ArrayError::IndexError(IndexError::IndexOutOfBounds { .. }))
        ));
    }

    #[test]
    fn data_view_ellipsis() {
        let array = array_3d();
        let view = DataView::new(
            &array,
            &[Slice::from(1..3), Slice::from(1..4), Slice::from(2..6)],
        )
        .unwrap();
        let expression = IndexExpression::from((1, Index::Ellipsis));
        let expanded = IndexExpression::from((1, Slice::full(), Slice::full()));
        assert_eq!(
            view.transform_coordinates(Some(&expression)).unwrap(),
            view.transform_coordinates(Some(&expanded)).unwrap()
        );
        let bytes = view.read(Some(&expression)).unwrap();
        assert_eq!(bytes.shape(), &[3, 4]);
        let elements = bytes.into_elements::<u8>().unwrap();
        // array[2, 1, 2]
        assert_eq!(elements[0], 2 * 30 + 6 + 2);

        let two_ellipses = IndexExpression::from((Index::Ellipsis, 1, Index::Ellipsis));
        assert!(matches!(
            view.read(Some(&two_ellipses)),
            Err(ArrayError::IndexError(IndexError::MultipleEllipsis(2)))
        ));
    }

    #[test]
    fn data_view_of_data_view() {
        let array = array_1d();
        let outer = DataView::new(&array, &[Slice::from(2..9)]).unwrap();
        let inner = DataView::new(&outer, &[Slice::from(1..4)]).unwrap();
        assert_eq!(inner.data_extent(), vec![3]);
        assert_eq!(inner.read_elements::<i32>(None).unwrap(), vec![3, 4, 5]);
        assert_eq!(
            inner
                .read_elements::<i32>(Some(&(-1).into()))
                .unwrap(),
            vec![5]
        );
        assert!(DataView::new(&outer, &[Slice::from(1..8)]).is_err());

        let selection = inner.resolve(Some(&(1..).into())).unwrap();
        assert_eq!(
            selection.dimensions(),
            &[DimensionSelection::Range(SelectionRange::new_contiguous(1, 3))]
        );
        assert_eq!(
            inner.read_selection(&selection).unwrap().into_elements::<i32>().unwrap(),
            vec![4, 5]
        );
        assert!(matches!(
            inner.read_selection(&Selection::new_with_shape(&[4])),
            Err(ArrayError::InvalidSelection(_, _))
        ));
    }

    #[test]
    fn data_view_from_subset() {
        let array = array_3d();
        let subset = ArraySubset::new_with_ranges(&[0..1, 2..5, 0..6]);
        let view = DataView::from_subset(&array, &subset).unwrap();
        assert_eq!(view.bounding_box().to_subset(), subset);
        let out_of_bounds = ArraySubset::new_with_ranges(&[0..5, 0..5, 0..6]);
        assert!(DataView::from_subset(&array, &out_of_bounds).is_err());
    }

    #[test]
    fn data_view_dyn_backing() {
        let array = array_1d();
        let backing: &dyn DataSet = &array;
        let view = DataView::new(backing, &[Slice::from(5..)]).unwrap();
        let bytes = view.read(Some(&(..2).into())).unwrap();
        assert_eq!(bytes.into_elements::<i32>().unwrap(), vec![5, 6]);
    }
}
