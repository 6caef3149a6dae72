//! Shape manifests: data files that declare a table tree.
//!
//! ```ron
//! (
//!     tables: [
//!         (name: "items", key: int),
//!         (name: "names", key: string),
//!     ],
//!     namespaces: {
//!         "quests": (tables: [(name: "main")]),
//!     },
//! )
//! ```
//!
//! Every declared table is loaded with `serde_json::Value` rows; the key
//! kind picks the codec.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use cfgtree_core::shape::{Shape, ShapeError, TableCodec};

use crate::format::{DataError, deserialize_file, resolve_file};

/// Key type of a manifest-declared table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Signed 64-bit integer keys.
    #[default]
    Int,
    /// Unsigned 64-bit integer keys.
    Uint,
    String,
    Bool,
}

impl KeyKind {
    /// The codec for tables with this key kind and dynamic rows.
    pub fn codec(self) -> TableCodec {
        match self {
            KeyKind::Int => TableCodec::of::<i64, Value>(),
            KeyKind::Uint => TableCodec::of::<u64, Value>(),
            KeyKind::String => TableCodec::of::<String, Value>(),
            KeyKind::Bool => TableCodec::of::<bool, Value>(),
        }
    }
}

/// One declared table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableManifest {
    pub name: String,
    #[serde(default)]
    pub key: KeyKind,
}

/// One namespace node of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ShapeManifest {
    #[serde(default)]
    pub tables: Vec<TableManifest>,
    /// Child namespaces, declared (and therefore loaded) in name order
    /// whatever their order in the file.
    #[serde(default)]
    pub namespaces: BTreeMap<String, ShapeManifest>,
}

impl ShapeManifest {
    /// Read a manifest, detecting the format from the extension. Without an
    /// extension, the one `.ron`, `.toml` or `.json` file with that base name
    /// is read.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let path = resolve_file(path)?;
        let manifest: ShapeManifest = deserialize_file(&path)?;
        tracing::debug!(
            path = %path.display(),
            tables = manifest.tables.len(),
            namespaces = manifest.namespaces.len(),
            "shape manifest read"
        );
        Ok(manifest)
    }

    /// Read a manifest and build its shape.
    pub fn load_shape(path: &Path) -> Result<Shape, DataError> {
        Self::load(path)?
            .to_shape()
            .map_err(|source| DataError::Shape {
                file: path.to_path_buf(),
                source,
            })
    }

    /// Build the [`Shape`] this manifest describes.
    pub fn to_shape(&self) -> Result<Shape, ShapeError> {
        let mut builder = Shape::builder();
        for table in &self.tables {
            builder = builder.table_with_codec(&table.name, table.key.codec());
        }
        for (name, child) in &self.namespaces {
            builder = builder.namespace(name, child.to_shape()?);
        }
        builder.build()
    }
}
