//! A rust library for bounded views and virtual compositions of multidimensional data arrays.
//!
//! `nixio` stores data arrays in a key/value [store](storage::store) and addresses them with Python-style [index expressions](indexer::IndexExpression).
//! Two layers sit on top of plain [`Array`](array::Array)s:
//!  - a [`DataView`](array::DataView) is a window onto a fixed [bounding box](bounding_box::BoundingBox) of a backing array.
//!    Index expressions given to a view are translated into backing coordinates and can never escape the bounding box.
//!  - a virtual array stitches regions of one or more arrays into a single logical array with a [`VirtualLayout`](array::VirtualLayout).
//!
//! Arrays, views and virtual arrays all implement the [`DataSet`](array::DataSet) trait, so they are interchangeable wherever data is read or written.
//!
//! ## Getting Started
//! - A [`File`](file::File) is a hierarchy root holding named data arrays.
//! - [`array::Array`] and [`storage`] are good places to start for lower level usage.
//!
//! ## Example
//! ```rust
//! # use std::sync::Arc;
//! use nixio::array::{DataSet, DataType};
//! use nixio::file::{File, FileMode};
//! use nixio::indexer::Slice;
//!
//! let store = Arc::new(nixio::storage::store::MemoryStore::new());
//! let file = File::open(store, FileMode::Overwrite)?;
//! let array = file.create_data_array("signal", DataType::Int32, vec![10])?;
//! array.write_elements(&(0..10).collect::<Vec<i32>>(), None)?;
//!
//! let view = array.view(&[Slice::from(2..7)])?;
//! assert_eq!(view.read_elements::<i32>(Some(&"1:4".parse()?))?, vec![3, 4, 5]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate Features
//! #### Default
//!  - `ndarray`: [`ndarray`] utility functions for [`DataSet`](array::DataSet) and [`ArrayBytes`](array::ArrayBytes).
//!
//! ## Logging
//! `nixio` logs through the [`log`] facade: view creation, virtual mappings and virtual resolution at the debug level, and overlapping virtual mappings as warnings.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
// #![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod array;
pub mod array_subset;
pub mod bounding_box;
pub mod byte_range;
pub mod config;
pub mod file;
pub mod indexer;
pub mod node;
pub mod selection;
pub mod storage;
