use std::sync::Arc;

use nixio::array::{
    Array, ArrayBuilder, ArrayError, DataSet, DataType, FillValue, VirtualLayoutBuilder,
    VirtualLayoutError,
};
use nixio::array_subset::ArraySubset;
use nixio::config::global_config_mut;
use nixio::indexer::Slice;
use nixio::storage::store::MemoryStore;

fn source(
    store: &Arc<MemoryStore>,
    path: &str,
    shape: Vec<u64>,
    elements: &[i32],
) -> Result<Array<MemoryStore>, Box<dyn std::error::Error>> {
    let array = ArrayBuilder::new(shape, DataType::Int32, FillValue::from(0i32))
        .build(store.clone(), path)?;
    array.store_metadata()?;
    array.write_elements(elements, None)?;
    Ok(array)
}

#[test]
fn virtual_array_append_blocks() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let mut layout = VirtualLayoutBuilder::new(vec![8, 3], DataType::Int32);
    let mut expected = Vec::new();
    for block in 0..4 {
        let elements = (0..6).map(|i| block * 100 + i).collect::<Vec<i32>>();
        let array = source(&store, &format!("/block{block}"), vec![2, 3], &elements)?;
        layout.append(&array, 0)?;
        expected.extend(elements);
    }
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

    let array = ArrayBuilder::new_virtual(layout.finalize()).build(store.clone(), "/blocks")?;
    array.store_metadata()?;
    assert!(array.is_virtual());
    assert_eq!(array.read_elements::<i32>(None)?, expected);
    assert_eq!(
        array.read_elements::<i32>(Some(&"3:6, 1".parse()?))?,
        vec![104, 201, 204]
    );
    assert_eq!(array.read_elements::<i32>(Some(&"-1, ...".parse()?))?, vec![303, 304, 305]);

    // reopened from the store
    let array = Array::new(store, "/blocks")?;
    assert_eq!(array.virtual_layout().map(|layout| layout.mappings().len()), Some(4));
    assert_eq!(array.read_elements::<i32>(None)?, expected);
    Ok(())
}

#[test]
fn virtual_array_append_rows() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let mut layout = VirtualLayoutBuilder::new(vec![3, 4], DataType::Int32);
    for row in 0..3 {
        let elements = (0..4).map(|i| row * 10 + i).collect::<Vec<i32>>();
        let array = source(&store, &format!("/row{row}"), vec![4], &elements)?;
        layout.append(&array, 0)?;
    }
    let array = ArrayBuilder::new_virtual(layout.finalize()).build(store, "/rows")?;
    assert_eq!(
        array.read_elements::<i32>(None)?,
        vec![0, 1, 2, 3, 10, 11, 12, 13, 20, 21, 22, 23]
    );
    assert_eq!(array.read_elements::<i32>(Some(&"..., 2".parse()?))?, vec![2, 12, 22]);
    assert_eq!(array.read_elements::<i32>(Some(&"1:, 1:3".parse()?))?, vec![11, 12, 21, 22]);
    Ok(())
}

#[test]
fn virtual_array_overlap_and_fill() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let first = source(&store, "/first", vec![2, 2], &[1, 1, 1, 1])?;
    let second = source(&store, "/second", vec![2, 2], &[2, 2, 2, 2])?;

    let mut layout = VirtualLayoutBuilder::new(vec![3, 4], DataType::Int32);
    layout.fill_value(FillValue::from(-1i32));
    layout.map(
        &first,
        ArraySubset::new_with_shape(vec![2, 2]),
        ArraySubset::new_with_ranges(&[0..2, 0..2]),
    )?;
    layout.map(
        &second,
        ArraySubset::new_with_shape(vec![2, 2]),
        ArraySubset::new_with_ranges(&[1..3, 1..3]),
    )?;
    let array = ArrayBuilder::new_virtual(layout.finalize()).build(store, "/overlap")?;

    #[rustfmt::skip]
    let expected = vec![
        1,  1, -1, -1,
        1,  2,  2, -1,
        -1, 2,  2, -1,
    ];
    for concurrent in [true, false] {
        global_config_mut().set_virtual_concurrent_reads(concurrent);
        assert_eq!(array.read_elements::<i32>(None)?, expected);
    }
    global_config_mut().set_virtual_concurrent_reads(true);
    assert_eq!(array.read_elements::<i32>(Some(&"1, 1".parse()?))?, vec![2]);
    assert_eq!(array.read_elements::<i32>(Some(&"2, 3".parse()?))?, vec![-1]);
    Ok(())
}

#[test]
fn virtual_array_write() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let left = source(&store, "/left", vec![2, 2], &[0; 4])?;
    let right = source(&store, "/right", vec![2, 3], &[0; 6])?;
    let mut layout = VirtualLayoutBuilder::new(vec![2, 5], DataType::Int32);
    layout.append(&left, 1)?.append(&right, 1)?;
    let array = ArrayBuilder::new_virtual(layout.finalize()).build(store, "/joined")?;

    array.write_elements(&[7, 8, 9], Some(&(1, 1..4).into()))?;
    assert_eq!(left.read_elements::<i32>(None)?, vec![0, 0, 0, 7]);
    assert_eq!(right.read_elements::<i32>(None)?, vec![0, 0, 0, 8, 9, 0]);
    assert_eq!(
        array.read_elements::<i32>(None)?,
        vec![0, 0, 0, 0, 0, 0, 7, 8, 9, 0]
    );
    assert!(matches!(
        array.write_elements(&[1, 2], Some(&(1, 1..4).into())),
        Err(ArrayError::InvalidBytesInputSize(..))
    ));

    // a view of a virtual array
    let view = array.view(&[Slice::full(), Slice::from(1..3)])?;
    view.write_elements(&[5, 6], Some(&0.into()))?;
    assert_eq!(left.read_elements::<i32>(None)?, vec![0, 5, 0, 7]);
    assert_eq!(right.read_elements::<i32>(Some(&0.into()))?, vec![6, 0, 0]);
    Ok(())
}

#[test]
fn virtual_array_layout_errors() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let block = source(&store, "/block", vec![2, 2], &[0; 4])?;
    let mut layout = VirtualLayoutBuilder::new(vec![3, 2], DataType::Int32);
    layout.append(&block, 0)?;
    assert!(matches!(
        layout.append(&block, 0),
        Err(VirtualLayoutError::TargetRegionOutOfBounds(..))
    ));
    assert_eq!(layout.mappings().len(), 1);
    assert!(matches!(
        layout.map(
            &block,
            ArraySubset::new_with_ranges(&[0..3, 0..2]),
            ArraySubset::new_with_ranges(&[0..3, 0..2]),
        ),
        Err(VirtualLayoutError::SourceRegionOutOfBounds(..))
    ));
    assert!(matches!(
        layout.map(
            &block,
            ArraySubset::new_with_ranges(&[0..2, 0..2]),
            ArraySubset::new_with_ranges(&[0..1, 0..2]),
        ),
        Err(VirtualLayoutError::RegionShapeMismatch(..))
    ));

    let mut array = ArrayBuilder::new_virtual(layout.finalize()).build(store, "/virtual")?;
    assert!(matches!(
        array.set_data_extent(&[4, 2]),
        Err(ArrayError::VirtualArrayResize)
    ));
    assert_eq!(array.read_elements::<i32>(Some(&2.into()))?, vec![0, 0]);
    Ok(())
}
