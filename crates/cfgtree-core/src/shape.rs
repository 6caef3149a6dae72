//! Schema shapes: which tables and child namespaces exist under a node.
//!
//! A shape is plain data. Each declared table carries a [`TableCodec`], a
//! function pointer monomorphised once for its `(K, V)` pair when the table
//! is registered, so the loader never re-derives a codec per call.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::key::TableKey;
use crate::table::{self, AnyTable, CodecError};

/// Separator for dotted paths such as `"ns.a2"`.
pub const PATH_SEPARATOR: char = '.';

/// Extension appended to a table name to form its file name.
pub const TABLE_EXTENSION: &str = "json";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors raised while building a [`Shape`].
#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error("invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },
}

// ===========================================================================
// Codec handle
// ===========================================================================

type DecodeFn = fn(&str) -> Result<Box<dyn AnyTable>, CodecError>;

/// Type-erased decoder for one `(K, V)` table type.
#[derive(Clone, Copy)]
pub struct TableCodec {
    key_type: &'static str,
    value_type: &'static str,
    decode: DecodeFn,
}

impl TableCodec {
    pub fn of<K, V>() -> Self
    where
        K: TableKey + Send + Sync + 'static,
        V: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        Self {
            key_type: K::KIND,
            value_type: std::any::type_name::<V>(),
            decode: decode_erased::<K, V>,
        }
    }

    pub fn key_type(&self) -> &'static str {
        self.key_type
    }

    pub fn value_type(&self) -> &'static str {
        self.value_type
    }

    pub fn decode(&self, text: &str) -> Result<Box<dyn AnyTable>, CodecError> {
        (self.decode)(text)
    }
}

impl fmt::Debug for TableCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableCodec")
            .field("key_type", &self.key_type)
            .field("value_type", &self.value_type)
            .finish()
    }
}

fn decode_erased<K, V>(text: &str) -> Result<Box<dyn AnyTable>, CodecError>
where
    K: TableKey + Send + Sync + 'static,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let table = table::decode::<K, V>(text)?;
    Ok(Box::new(table))
}

// ===========================================================================
// Shape
// ===========================================================================

/// A declared table: its name and how to decode it.
#[derive(Debug, Clone)]
pub struct TableDecl {
    name: String,
    codec: TableCodec,
}

impl TableDecl {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name of the table under its namespace directory.
    pub fn file_name(&self) -> String {
        format!("{}.{TABLE_EXTENSION}", self.name)
    }

    pub fn codec(&self) -> &TableCodec {
        &self.codec
    }
}

/// The static declaration of one namespace node. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    tables: Vec<TableDecl>,
    namespaces: Vec<(String, Shape)>,
}

impl Shape {
    pub fn builder() -> ShapeBuilder {
        ShapeBuilder::default()
    }

    /// Tables in declaration order.
    pub fn tables(&self) -> &[TableDecl] {
        &self.tables
    }

    /// Child namespaces in declaration order.
    pub fn namespaces(&self) -> &[(String, Shape)] {
        &self.namespaces
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.namespaces.is_empty()
    }

    /// Number of tables in this node and all descendants.
    pub fn table_count(&self) -> usize {
        self.tables.len()
            + self
                .namespaces
                .iter()
                .map(|(_, child)| child.table_count())
                .sum::<usize>()
    }

    /// Number of descendant namespaces, not counting this node.
    pub fn namespace_count(&self) -> usize {
        self.namespaces
            .iter()
            .map(|(_, child)| 1 + child.namespace_count())
            .sum()
    }
}

/// Builder for [`Shape`]. Name problems are collected and reported by
/// [`ShapeBuilder::build`].
#[derive(Debug, Default)]
pub struct ShapeBuilder {
    shape: Shape,
    error: Option<ShapeError>,
}

impl ShapeBuilder {
    /// Declare a table `name` keyed by `K` with rows of type `V`.
    pub fn table<K, V>(self, name: &str) -> Self
    where
        K: TableKey + Send + Sync + 'static,
        V: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.table_with_codec(name, TableCodec::of::<K, V>())
    }

    /// Declare a table with an already-built codec.
    pub fn table_with_codec(mut self, name: &str, codec: TableCodec) -> Self {
        if self.error.is_none() {
            self.error = check_name("table", name).err().or_else(|| {
                self.shape
                    .tables
                    .iter()
                    .any(|t| t.name == name)
                    .then(|| ShapeError::Duplicate {
                        kind: "table",
                        name: name.to_string(),
                    })
            });
        }
        self.shape.tables.push(TableDecl {
            name: name.to_string(),
            codec,
        });
        self
    }

    /// Declare a child namespace `name` with its own shape.
    pub fn namespace(mut self, name: &str, child: Shape) -> Self {
        if self.error.is_none() {
            self.error = check_name("namespace", name).err().or_else(|| {
                self.shape
                    .namespaces
                    .iter()
                    .any(|(n, _)| n == name)
                    .then(|| ShapeError::Duplicate {
                        kind: "namespace",
                        name: name.to_string(),
                    })
            });
        }
        self.shape.namespaces.push((name.to_string(), child));
        self
    }

    pub fn build(self) -> Result<Shape, ShapeError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.shape),
        }
    }
}

fn check_name(kind: &'static str, name: &str) -> Result<(), ShapeError> {
    let reason = if name.is_empty() {
        Some("empty")
    } else if name.contains(PATH_SEPARATOR) {
        Some("contains '.'")
    } else if name.contains(['/', '\\']) {
        Some("contains a path separator")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ShapeError::InvalidName {
            kind,
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
