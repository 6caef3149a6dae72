//! Loaded namespace nodes and the table tree.
//!
//! Nodes are built only by the loader and never mutated afterwards; all
//! accessors take `&self`. Typed table access downcasts the erased table
//! and reports a [`LookupError::TypeMismatch`] when the caller asks for the
//! wrong `(K, V)` pair.

use std::collections::BTreeMap;
use std::fmt;

use crate::access::DataAccess;
use crate::key::TableKey;
use crate::loader::{self, LoadError, LoadOptions};
use crate::shape::{PATH_SEPARATOR, Shape};
use crate::table::{AnyTable, Table};

/// Errors from looking up a table or namespace in a loaded tree.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("no {kind} at '{path}'")]
    Missing { kind: &'static str, path: String },

    #[error("table '{path}' is {actual_key} -> {actual_value}, not {expected_key} -> {expected_value}")]
    TypeMismatch {
        path: String,
        expected_key: &'static str,
        expected_value: &'static str,
        actual_key: &'static str,
        actual_value: &'static str,
    },
}

// ===========================================================================
// Namespace
// ===========================================================================

/// A fully populated namespace: its tables and child namespaces.
#[derive(Default)]
pub struct Namespace {
    tables: BTreeMap<String, Box<dyn AnyTable>>,
    namespaces: BTreeMap<String, Namespace>,
}

impl Namespace {
    pub(crate) fn from_parts(
        tables: BTreeMap<String, Box<dyn AnyTable>>,
        namespaces: BTreeMap<String, Namespace>,
    ) -> Self {
        Self { tables, namespaces }
    }

    /// Typed access to a table of this node.
    pub fn table<K, V>(&self, name: &str) -> Result<&Table<K, V>, LookupError>
    where
        K: TableKey + 'static,
        V: 'static,
    {
        let erased = self.erased_table(name).ok_or_else(|| LookupError::Missing {
            kind: "table",
            path: name.to_string(),
        })?;
        downcast(erased, name)
    }

    /// Type-erased access to a table of this node.
    pub fn erased_table(&self, name: &str) -> Option<&dyn AnyTable> {
        self.tables.get(name).map(|t| t.as_ref())
    }

    /// A direct child namespace.
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    /// Resolve a dotted namespace path such as `"ns.inner"`. The empty path
    /// is this node.
    pub fn find_namespace(&self, path: &str) -> Option<&Namespace> {
        if path.is_empty() {
            return Some(self);
        }
        path.split(PATH_SEPARATOR)
            .try_fold(self, |node, segment| node.namespace(segment))
    }

    /// Resolve a dotted table path such as `"ns.a2"`.
    pub fn lookup<K, V>(&self, path: &str) -> Result<&Table<K, V>, LookupError>
    where
        K: TableKey + 'static,
        V: 'static,
    {
        let erased = self
            .lookup_erased(path)
            .ok_or_else(|| LookupError::Missing {
                kind: "table",
                path: path.to_string(),
            })?;
        downcast(erased, path)
    }

    /// Type-erased variant of [`Namespace::lookup`].
    pub fn lookup_erased(&self, path: &str) -> Option<&dyn AnyTable> {
        let (parent, name) = match path.rsplit_once(PATH_SEPARATOR) {
            Some((parent, name)) => (self.find_namespace(parent)?, name),
            None => (self, path),
        };
        parent.erased_table(name)
    }

    /// Table names in sorted order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Tables in sorted name order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &dyn AnyTable)> {
        self.tables.iter().map(|(n, t)| (n.as_str(), t.as_ref()))
    }

    /// Child namespaces in sorted name order.
    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &Namespace)> {
        self.namespaces.iter().map(|(n, ns)| (n.as_str(), ns))
    }

    /// Number of tables in this node and all descendants.
    pub fn table_count(&self) -> usize {
        self.tables.len()
            + self
                .namespaces
                .values()
                .map(Namespace::table_count)
                .sum::<usize>()
    }

    /// Number of rows across this node and all descendants.
    pub fn row_count(&self) -> usize {
        self.tables.values().map(|t| t.len()).sum::<usize>()
            + self
                .namespaces
                .values()
                .map(Namespace::row_count)
                .sum::<usize>()
    }
}

fn downcast<'a, K, V>(erased: &'a dyn AnyTable, path: &str) -> Result<&'a Table<K, V>, LookupError>
where
    K: TableKey + 'static,
    V: 'static,
{
    erased
        .as_any()
        .downcast_ref::<Table<K, V>>()
        .ok_or_else(|| LookupError::TypeMismatch {
            path: path.to_string(),
            expected_key: K::KIND,
            expected_value: std::any::type_name::<V>(),
            actual_key: erased.key_type(),
            actual_value: erased.value_type(),
        })
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Rows<'a>(&'a dyn AnyTable);

        impl fmt::Debug for Rows<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} rows", self.0.len())
            }
        }

        f.debug_struct("Namespace")
            .field(
                "tables",
                &self
                    .tables
                    .iter()
                    .map(|(n, t)| (n, Rows(t.as_ref())))
                    .collect::<BTreeMap<_, _>>(),
            )
            .field("namespaces", &self.namespaces)
            .finish()
    }
}

// ===========================================================================
// Table tree
// ===========================================================================

/// The root namespace of a load, together with the shape and root path it
/// was loaded from. Owned by the application; there is no global instance.
pub struct TableTree<P> {
    root: Namespace,
    shape: Shape,
    root_path: P,
}

impl<P: Clone + fmt::Debug> TableTree<P> {
    /// Load a tree starting at the backend's root path.
    pub fn load<A>(access: &A, shape: Shape) -> Result<Self, LoadError>
    where
        A: DataAccess<Path = P>,
    {
        Self::load_with(access, access.root_path(), shape, &LoadOptions::default())
    }

    /// Load a tree starting at `root_path` with explicit options.
    pub fn load_with<A>(
        access: &A,
        root_path: P,
        shape: Shape,
        options: &LoadOptions,
    ) -> Result<Self, LoadError>
    where
        A: DataAccess<Path = P>,
    {
        let root = loader::load_root(access, &root_path, &shape, options)?;
        Ok(Self {
            root,
            shape,
            root_path,
        })
    }

    /// Load again from the same root and shape. `self` is left untouched, so
    /// a failed reload keeps the current tree usable.
    pub fn reload<A>(&self, access: &A, options: &LoadOptions) -> Result<Self, LoadError>
    where
        A: DataAccess<Path = P>,
    {
        Self::load_with(access, self.root_path.clone(), self.shape.clone(), options)
    }

    pub fn root(&self) -> &Namespace {
        &self.root
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn root_path(&self) -> &P {
        &self.root_path
    }
}

impl<P> std::ops::Deref for TableTree<P> {
    type Target = Namespace;

    fn deref(&self) -> &Namespace {
        &self.root
    }
}

impl<P: fmt::Debug> fmt::Debug for TableTree<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableTree")
            .field("root_path", &self.root_path)
            .field("root", &self.root)
            .finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn scenario_tree() -> TableTree<String> {
        TableTree::load(&scenario_access(), scenario_shape()).unwrap()
    }

    #[test]
    fn typed_table_access() {
        let tree = scenario_tree();
        let a = tree.table::<i32, Item>("a").unwrap();
        assert_eq!(a.get(&1).unwrap().name, "sword");
    }

    #[test]
    fn missing_table() {
        let tree = scenario_tree();
        let err = tree.table::<i32, Item>("nope").unwrap_err();
        assert!(matches!(err, LookupError::Missing { kind: "table", .. }));
    }

    #[test]
    fn wrong_type_is_mismatch() {
        let tree = scenario_tree();
        let err = tree.table::<u8, Item>("a").unwrap_err();
        match err {
            LookupError::TypeMismatch {
                expected_key,
                actual_key,
                ..
            } => {
                assert_eq!(expected_key, "u8");
                assert_eq!(actual_key, "i32");
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn dotted_lookup() {
        let tree = scenario_tree();
        let a2 = tree.lookup::<i32, Upgrade>("ns.a2").unwrap();
        assert_eq!(a2.get(&1).unwrap().level, 2);
        assert!(tree.lookup::<i32, Item>("a").is_ok());
        assert!(tree.lookup_erased("ns.missing").is_none());
        assert!(tree.lookup_erased("missing.a").is_none());
    }

    #[test]
    fn find_namespace_paths() {
        let tree = scenario_tree();
        assert!(tree.find_namespace("").is_some());
        assert!(tree.find_namespace("ns").is_some());
        assert!(tree.find_namespace("ns.deeper").is_none());
        assert!(tree.namespace("ns").unwrap().namespace("x").is_none());
    }

    #[test]
    fn iteration_is_sorted() {
        let tree = scenario_tree();
        let ns = tree.namespace("ns").unwrap();
        let names: Vec<_> = ns.table_names().collect();
        assert_eq!(names, ["a", "a2"]);
        let children: Vec<_> = tree.namespaces().map(|(n, _)| n).collect();
        assert_eq!(children, ["ns"]);
    }

    #[test]
    fn counts() {
        let tree = scenario_tree();
        assert_eq!(tree.table_count(), 3);
        assert_eq!(tree.row_count(), 2 + 1 + 1);
    }

    #[test]
    fn debug_lists_row_counts() {
        let tree = scenario_tree();
        let text = format!("{tree:?}");
        assert!(text.contains("2 rows"), "{text}");
        assert!(text.contains("\"ns\""), "{text}");
    }

    #[test]
    fn reload_sees_new_content() {
        let mut access = scenario_access();
        let tree = TableTree::load(&access, scenario_shape()).unwrap();

        access.insert("a.json", r#"{"9": {"name": "axe", "price": 4}}"#);
        let reloaded = tree.reload(&access, &LoadOptions::default()).unwrap();

        assert!(reloaded.table::<i32, Item>("a").unwrap().contains_key(&9));
        assert!(tree.table::<i32, Item>("a").unwrap().contains_key(&1));
    }

    #[test]
    fn failed_reload_keeps_old_tree() {
        let mut access = scenario_access();
        let tree = TableTree::load(&access, scenario_shape()).unwrap();

        access.remove("ns/a2.json");
        assert!(tree.reload(&access, &LoadOptions::default()).is_err());
        assert_eq!(tree.table_count(), 3);
    }
}
