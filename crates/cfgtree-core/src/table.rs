//! Keyed-collection codec: tables keyed by scalar types, stored as JSON
//! objects with string property names.
//!
//! Keys go through [`TableKey`]; values are delegated to their own serde
//! impls, so a row may hold nested records, enums or further tables.
//! Unlike a plain `HashMap` deserialization, a key that appears twice is an
//! error rather than a silent overwrite.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::{self, Entry};
use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, DeserializeOwned, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::key::TableKey;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors produced while encoding or decoding a table.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text is not a well-formed JSON object of the expected shape.
    /// `line` and `column` are 1-based, 0 when unknown.
    #[error("malformed table: {detail}")]
    Format {
        detail: String,
        line: usize,
        column: usize,
    },

    /// A property name is not a valid encoding of the key type.
    #[error("cannot decode key '{raw}' as {key_type}")]
    KeyDecode { raw: String, key_type: &'static str },

    /// Two property names decode to the same key.
    #[error("duplicate key {key} (property '{raw}')")]
    DuplicateKey { raw: String, key: String },

    /// A value refused to serialize.
    #[error("encode failed: {detail}")]
    Encode { detail: String },
}

impl CodecError {
    fn from_json(err: &serde_json::Error) -> Self {
        CodecError::Format {
            detail: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

// ===========================================================================
// Table
// ===========================================================================

/// A mapping from a scalar key to a row value, loaded from one JSON object.
#[derive(Debug, Clone)]
pub struct Table<K, V> {
    rows: HashMap<K, V>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<K: TableKey, V> Table<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(key, value)` pairs, rejecting repeated keys.
    pub fn from_rows(rows: impl IntoIterator<Item = (K, V)>) -> Result<Self, CodecError> {
        let mut table = Self::new();
        for (key, value) in rows {
            match table.rows.entry(key) {
                Entry::Occupied(slot) => {
                    let key = slot.key().encode_key();
                    return Err(CodecError::DuplicateKey {
                        raw: key.clone(),
                        key,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }
        Ok(table)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.rows.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.rows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in unspecified order.
    pub fn iter(&self) -> hash_map::Iter<'_, K, V> {
        self.rows.iter()
    }

    pub fn keys(&self) -> hash_map::Keys<'_, K, V> {
        self.rows.keys()
    }

    pub fn values(&self) -> hash_map::Values<'_, K, V> {
        self.rows.values()
    }

    pub fn as_map(&self) -> &HashMap<K, V> {
        &self.rows
    }

    pub fn into_inner(self) -> HashMap<K, V> {
        self.rows
    }
}

impl<K: TableKey, V: PartialEq> PartialEq for Table<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}

impl<K: TableKey, V: Eq> Eq for Table<K, V> {}

impl<'a, K, V> IntoIterator for &'a Table<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = hash_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

// ===========================================================================
// Codec entry points
// ===========================================================================

/// Decode a table from JSON text.
///
/// Key failures are reported as [`CodecError::KeyDecode`] or
/// [`CodecError::DuplicateKey`]; everything else (not an object, truncated
/// input, a row of the wrong shape, trailing characters) is
/// [`CodecError::Format`].
pub fn decode<K, V>(text: &str) -> Result<Table<K, V>, CodecError>
where
    K: TableKey,
    V: DeserializeOwned,
{
    let failure = RefCell::new(None);
    let mut de = serde_json::Deserializer::from_str(text);
    let visitor = TableVisitor::<K, V> {
        failure: Some(&failure),
        marker: PhantomData,
    };
    // `deserialize_any` so that non-objects reach the visitor and report
    // what was found instead.
    let result = (&mut de)
        .deserialize_any(visitor)
        .and_then(|table| de.end().map(|()| table));

    result.map_err(|err| {
        failure
            .into_inner()
            .unwrap_or_else(|| CodecError::from_json(&err))
    })
}

/// Encode a table as compact JSON text.
pub fn encode<K, V>(table: &Table<K, V>) -> Result<String, CodecError>
where
    K: TableKey,
    V: Serialize,
{
    serde_json::to_string(table).map_err(|e| CodecError::Encode {
        detail: e.to_string(),
    })
}

/// Encode a table as indented JSON text.
pub fn encode_pretty<K, V>(table: &Table<K, V>) -> Result<String, CodecError>
where
    K: TableKey,
    V: Serialize,
{
    serde_json::to_string_pretty(table).map_err(|e| CodecError::Encode {
        detail: e.to_string(),
    })
}

// ===========================================================================
// Serde impls
// ===========================================================================

impl<K: TableKey, V: Serialize> Serialize for Table<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for (key, value) in &self.rows {
            map.serialize_entry(&key.encode_key(), value)?;
        }
        map.end()
    }
}

/// Nested tables take this path; their key errors surface as format errors
/// carrying the position inside the enclosing file.
impl<'de, K, V> Deserialize<'de> for Table<K, V>
where
    K: TableKey,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TableVisitor {
            failure: None,
            marker: PhantomData,
        })
    }
}

struct TableVisitor<'a, K, V> {
    /// Slot for the structured key error when decoding a top-level table.
    failure: Option<&'a RefCell<Option<CodecError>>>,
    marker: PhantomData<fn() -> (K, V)>,
}

impl<K: TableKey, V> TableVisitor<'_, K, V> {
    fn fail<E: de::Error>(&self, err: CodecError) -> E {
        let msg = err.to_string();
        if let Some(slot) = self.failure {
            *slot.borrow_mut() = Some(err);
        }
        E::custom(msg)
    }

    fn not_an_object<E: de::Error>(found: &str) -> E {
        E::custom(format_args!("expected object, found {found}"))
    }
}

impl<'de, K, V> Visitor<'de> for TableVisitor<'_, K, V>
where
    K: TableKey,
    V: Deserialize<'de>,
{
    type Value = Table<K, V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a JSON object keyed by {}", K::KIND)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut rows = HashMap::with_capacity(map.size_hint().unwrap_or(0));

        while let Some(raw) = map.next_key::<String>()? {
            let Some(key) = K::decode_key(&raw) else {
                return Err(self.fail(CodecError::KeyDecode {
                    raw,
                    key_type: K::KIND,
                }));
            };
            let value = map.next_value::<V>()?;
            match rows.entry(key) {
                Entry::Occupied(slot) => {
                    let key = slot.key().encode_key();
                    return Err(self.fail(CodecError::DuplicateKey { raw, key }));
                }
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }

        Ok(Table { rows })
    }

    fn visit_seq<A: SeqAccess<'de>>(self, _seq: A) -> Result<Self::Value, A::Error> {
        Err(Self::not_an_object("array"))
    }

    fn visit_str<E: de::Error>(self, _v: &str) -> Result<Self::Value, E> {
        Err(Self::not_an_object("string"))
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<Self::Value, E> {
        Err(Self::not_an_object("boolean"))
    }

    fn visit_i64<E: de::Error>(self, _v: i64) -> Result<Self::Value, E> {
        Err(Self::not_an_object("number"))
    }

    fn visit_u64<E: de::Error>(self, _v: u64) -> Result<Self::Value, E> {
        Err(Self::not_an_object("number"))
    }

    fn visit_f64<E: de::Error>(self, _v: f64) -> Result<Self::Value, E> {
        Err(Self::not_an_object("number"))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Err(Self::not_an_object("null"))
    }
}

// ===========================================================================
// Type-erased view
// ===========================================================================

/// A loaded table with its key and value types erased.
///
/// Lets tooling walk a tree without naming row types; typed access goes
/// through [`Namespace::table`](crate::tree::Namespace::table).
pub trait AnyTable: Any + Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key_type(&self) -> &'static str;

    fn value_type(&self) -> &'static str;

    /// Re-encode the table through the codec.
    fn to_json(&self) -> Result<serde_json::Value, CodecError>;

    fn as_any(&self) -> &dyn Any;
}

impl<K, V> AnyTable for Table<K, V>
where
    K: TableKey + Send + Sync + 'static,
    V: Serialize + Send + Sync + 'static,
{
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn key_type(&self) -> &'static str {
        K::KIND
    }

    fn value_type(&self) -> &'static str {
        std::any::type_name::<V>()
    }

    fn to_json(&self) -> Result<serde_json::Value, CodecError> {
        serde_json::to_value(self).map_err(|e| CodecError::Encode {
            detail: e.to_string(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ===========================================================================
// Tests
// ===========================================================================
