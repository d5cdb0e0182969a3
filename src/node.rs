//! Nodes of a hierarchy.
//!
//! Every array in a [`File`](crate::file::File) lives at a [`NodePath`] such as `/data/signal`.
//! The node path determines the store keys of the array metadata and data (see [`meta_key`](crate::storage::meta_key) and [`data_key`](crate::storage::data_key)).

mod node_name;
mod node_path;

pub use node_name::{NodeName, NodeNameError};
pub use node_path::{NodePath, NodePathError};
