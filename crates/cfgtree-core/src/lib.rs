//! Cfgtree Core -- typed configuration tables loaded from JSON.
//!
//! Configuration is authored as one JSON object per table, organised into
//! nested namespace directories. This crate loads such a tree into typed
//! in-memory tables in one pass at startup.
//!
//! # Pieces
//!
//! - [`access::DataAccess`] -- the storage port: read text, join paths.
//!   [`access::FsAccess`] and [`access::MemoryAccess`] are provided.
//! - [`key::TableKey`] -- reversible string encoding for integer, string,
//!   bool, char and enum keys.
//! - [`table::Table`] -- keyed collection with a JSON codec that rejects
//!   undecodable and duplicate keys.
//! - [`shape::Shape`] -- which tables (name + key/value types) and child
//!   namespaces exist under a node.
//! - [`loader`] -- the recursive, all-or-nothing load.
//! - [`tree::TableTree`] -- the loaded result, owned by the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! let shape = Shape::builder()
//!     .table::<i32, Item>("items")
//!     .namespace("quests", Shape::builder().table::<u32, Quest>("main").build()?)
//!     .build()?;
//!
//! let tree = TableTree::load(&FsAccess::new("gen/data"), shape)?;
//! let sword = tree.table::<i32, Item>("items")?.get(&1);
//! let quests = tree.lookup::<u32, Quest>("quests.main")?;
//! ```

pub mod access;
pub mod key;
pub mod loader;
pub mod shape;
pub mod table;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod tree;

pub use access::{AccessError, DataAccess, FsAccess, MemoryAccess};
pub use key::TableKey;
pub use loader::{CancelToken, LoadError, LoadOptions, load, load_root};
pub use shape::{Shape, ShapeBuilder, ShapeError, TableCodec, TableDecl};
pub use table::{AnyTable, CodecError, Table, decode, encode, encode_pretty};
pub use tree::{LookupError, Namespace, TableTree};
