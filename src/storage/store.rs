//! Stores.
//!
//! - [`MemoryStore`] keeps every value in memory.
//! - [`FilesystemStore`] keeps every value in a file below a base directory.

mod filesystem_store;
mod memory_store;

pub use filesystem_store::{FilesystemStore, FilesystemStoreCreateError};
pub use memory_store::MemoryStore;
