//! Data-described table trees.
//!
//! Where the row types are not known at compile time, a shape manifest
//! (RON, TOML or JSON) declares the tables, their key kinds and the nested
//! namespaces. Rows are loaded as `serde_json::Value`. A small TOML config
//! ties a manifest to a data root and load options.

pub mod config;
pub mod format;
pub mod manifest;

pub use config::{LoaderConfig, load_tree};
pub use format::{DataError, Format};
pub use manifest::{KeyKind, ShapeManifest, TableManifest};
