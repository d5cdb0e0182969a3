use std::sync::Arc;

use rayon::prelude::*;

use nixio::array::{DataSet, DataType};
use nixio::file::{File, FileMode};
use nixio::indexer::Slice;
use nixio::storage::store::{FilesystemStore, MemoryStore};
use nixio::storage::ReadableWritableStorageTraits;

const ROWS: u64 = 100;
const COLUMNS: u64 = 7;
const CHUNK_ROWS: u64 = 8;
const WORKERS: u64 = 4;

fn expected_row(row: u64) -> Vec<u64> {
    (0..COLUMNS).map(|column| row * 1000 + column).collect()
}

/// Each worker writes the chunks of rows assigned to it round-robin, through its own view of the shared array.
fn write_round_robin<TStorage: ?Sized + ReadableWritableStorageTraits>(
    storage: Arc<TStorage>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::open(storage, FileMode::Overwrite)?;
    let array = file.create_data_array("matrix", DataType::UInt64, vec![ROWS, COLUMNS])?;

    let num_chunks = ROWS.div_ceil(CHUNK_ROWS);
    (0..WORKERS)
        .into_par_iter()
        .try_for_each(|worker| -> Result<(), String> {
            for chunk_idx in (0..num_chunks).filter(|chunk_idx| chunk_idx % WORKERS == worker) {
                let start = chunk_idx * CHUNK_ROWS;
                let stop = std::cmp::min(start + CHUNK_ROWS, ROWS);
                let slice = Slice::from(i64::try_from(start).unwrap()..i64::try_from(stop).unwrap());
                let view = array
                    .view(&[slice, Slice::full()])
                    .map_err(|err| err.to_string())?;
                let elements = (start..stop).flat_map(expected_row).collect::<Vec<_>>();
                view.write_elements(&elements, None)
                    .map_err(|err| err.to_string())?;
            }
            Ok(())
        })?;

    let array = file.data_array("matrix")?;
    let expected = (0..ROWS).flat_map(expected_row).collect::<Vec<_>>();
    assert_eq!(array.read_elements::<u64>(None)?, expected);
    assert_eq!(
        array.read_elements::<u64>(Some(&(-1).into()))?,
        expected_row(ROWS - 1)
    );
    Ok(())
}

#[test]
fn parallel_write_memory() -> Result<(), Box<dyn std::error::Error>> {
    write_round_robin(Arc::new(MemoryStore::new()))
}

#[test]
fn parallel_write_filesystem() -> Result<(), Box<dyn std::error::Error>> {
    let path = tempfile::TempDir::new()?;
    write_round_robin(Arc::new(FilesystemStore::new(path.path())?))
}

#[test]
fn parallel_read_views() -> Result<(), Box<dyn std::error::Error>> {
    let file = File::open(Arc::new(MemoryStore::new()), FileMode::Overwrite)?;
    let array = file.create_data_array("matrix", DataType::UInt64, vec![ROWS, COLUMNS])?;
    let elements = (0..ROWS).flat_map(expected_row).collect::<Vec<_>>();
    array.write_elements(&elements, None)?;

    let views = (0..ROWS)
        .step_by(10)
        .map(|start| array.view(&[Slice::from(i64::try_from(start).unwrap()..), Slice::full()]))
        .collect::<Result<Vec<_>, _>>()?;
    let first_rows = views
        .par_iter()
        .map(|view| view.read_elements::<u64>(Some(&0.into())))
        .collect::<Result<Vec<_>, _>>()?;
    for (row, first_row) in (0..ROWS).step_by(10).zip(first_rows) {
        assert_eq!(first_row, expected_row(row));
    }
    Ok(())
}
