//! Recursive table loading.
//!
//! For one namespace node: every declared table is read from
//! `<base>/<name>.json` and decoded, then every child namespace is loaded
//! from `<base>/<child>`. A node is returned only when all of its tables and
//! children loaded; the first failure aborts the node and is wrapped with
//! the table or namespace name on the way up, so the top-level error names
//! the exact location that failed.
//!
//! With the `parallel` feature and [`LoadOptions::with_parallel`], the
//! tables and child namespaces of each node are loaded on the rayon pool.
//! Results are still inspected in declaration order (tables, then
//! namespaces), so both modes report the same error for the same input.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::access::{AccessError, DataAccess};
use crate::shape::{PATH_SEPARATOR, Shape, TableDecl};
use crate::table::{AnyTable, CodecError};
use crate::tree::Namespace;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading a table tree.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The backend could not read a file or join a path.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// A table file did not decode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Loading the named table failed.
    #[error("table '{table}': {source}")]
    Table {
        table: String,
        source: Box<LoadError>,
    },

    /// Loading the named child namespace failed.
    #[error("namespace '{namespace}': {source}")]
    Namespace {
        namespace: String,
        source: Box<LoadError>,
    },

    /// The [`CancelToken`] was triggered.
    #[error("load cancelled")]
    Cancelled,

    /// The deadline passed before all tables were read.
    #[error("load deadline exceeded")]
    DeadlineExceeded,
}

impl LoadError {
    pub fn in_table(table: &str, cause: LoadError) -> Self {
        LoadError::Table {
            table: table.to_string(),
            source: Box::new(cause),
        }
    }

    pub fn in_namespace(namespace: &str, cause: LoadError) -> Self {
        LoadError::Namespace {
            namespace: namespace.to_string(),
            source: Box::new(cause),
        }
    }

    /// Dotted path of the failing table or namespace, e.g. `"ns.a2"`.
    /// Empty when the failure is not attached to any location.
    pub fn location(&self) -> String {
        let mut parts = Vec::new();
        let mut current = self;
        loop {
            match current {
                LoadError::Table { table, source } => {
                    parts.push(table.as_str());
                    current = source.as_ref();
                }
                LoadError::Namespace { namespace, source } => {
                    parts.push(namespace.as_str());
                    current = source.as_ref();
                }
                _ => break,
            }
        }
        parts.join(PATH_SEPARATOR.to_string().as_str())
    }

    /// The innermost error, with all location wrappers removed.
    pub fn root_cause(&self) -> &LoadError {
        match self {
            LoadError::Table { source, .. } | LoadError::Namespace { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

// ===========================================================================
// Options
// ===========================================================================

/// Shared flag for aborting an in-flight load.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Knobs for one load pass.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    parallel: bool,
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fan out sibling tables and namespaces. Needs the `parallel` feature;
    /// without it the load runs sequentially.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Fail with [`LoadError::DeadlineExceeded`] for any read not started
    /// before `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline relative to now. A timeout too large to represent as an
    /// `Instant` leaves the load unbounded.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn check(&self) -> Result<(), LoadError> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(LoadError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(LoadError::DeadlineExceeded);
        }
        Ok(())
    }
}

// ===========================================================================
// Entry points
// ===========================================================================

/// Load the namespace described by `shape` from `root` with default options.
pub fn load<A: DataAccess>(access: &A, root: &A::Path, shape: &Shape) -> Result<Namespace, LoadError> {
    load_root(access, root, shape, &LoadOptions::default())
}

/// Load the namespace described by `shape` from `root`.
pub fn load_root<A: DataAccess>(
    access: &A,
    root: &A::Path,
    shape: &Shape,
    options: &LoadOptions,
) -> Result<Namespace, LoadError> {
    let started = Instant::now();
    if options.parallel && !cfg!(feature = "parallel") {
        warn!("parallel loading requested without the `parallel` feature; loading sequentially");
    }

    let result = load_namespace(access, root, shape, options);

    match &result {
        Ok(node) => info!(
            root = ?root,
            tables = node.table_count(),
            rows = node.row_count(),
            namespaces = shape.namespace_count(),
            parallel = options.parallel,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "table tree loaded"
        ),
        Err(err) => warn!(
            root = ?root,
            location = %err.location(),
            error = %err,
            "table tree load failed"
        ),
    }

    result
}

fn load_namespace<A: DataAccess>(
    access: &A,
    base: &A::Path,
    shape: &Shape,
    options: &LoadOptions,
) -> Result<Namespace, LoadError> {
    debug!(
        path = ?base,
        tables = shape.tables().len(),
        namespaces = shape.namespaces().len(),
        "loading namespace"
    );

    #[cfg(feature = "parallel")]
    if options.parallel {
        return load_namespace_parallel(access, base, shape, options);
    }

    let mut tables = BTreeMap::new();
    for decl in shape.tables() {
        let table = load_table(access, base, decl, options)?;
        tables.insert(decl.name().to_string(), table);
    }

    let mut namespaces = BTreeMap::new();
    for (name, child) in shape.namespaces() {
        let node = load_child(access, base, name, child, options)?;
        namespaces.insert(name.clone(), node);
    }

    Ok(Namespace::from_parts(tables, namespaces))
}

#[cfg(feature = "parallel")]
fn load_namespace_parallel<A: DataAccess>(
    access: &A,
    base: &A::Path,
    shape: &Shape,
    options: &LoadOptions,
) -> Result<Namespace, LoadError> {
    use rayon::prelude::*;

    let (tables, namespaces) = rayon::join(
        || {
            shape
                .tables()
                .par_iter()
                .map(|decl| {
                    load_table(access, base, decl, options)
                        .map(|table| (decl.name().to_string(), table))
                })
                .collect::<Vec<_>>()
        },
        || {
            shape
                .namespaces()
                .par_iter()
                .map(|(name, child)| {
                    load_child(access, base, name, child, options).map(|node| (name.clone(), node))
                })
                .collect::<Vec<_>>()
        },
    );

    // Collected in declaration order; the first error here is the one a
    // sequential load would have hit.
    let tables = tables.into_iter().collect::<Result<BTreeMap<_, _>, _>>()?;
    let namespaces = namespaces
        .into_iter()
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    Ok(Namespace::from_parts(tables, namespaces))
}

fn load_table<A: DataAccess>(
    access: &A,
    base: &A::Path,
    decl: &TableDecl,
    options: &LoadOptions,
) -> Result<Box<dyn AnyTable>, LoadError> {
    let in_table = |cause: LoadError| LoadError::in_table(decl.name(), cause);

    options.check().map_err(in_table)?;
    let path = access
        .join(base, &decl.file_name())
        .map_err(|e| in_table(e.into()))?;

    let started = Instant::now();
    let text = access.read_text(&path).map_err(|e| in_table(e.into()))?;
    let table = decl.codec().decode(&text).map_err(|e| in_table(e.into()))?;

    debug!(
        table = decl.name(),
        path = ?path,
        rows = table.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "table loaded"
    );
    Ok(table)
}

fn load_child<A: DataAccess>(
    access: &A,
    base: &A::Path,
    name: &str,
    child: &Shape,
    options: &LoadOptions,
) -> Result<Namespace, LoadError> {
    let in_namespace = |cause: LoadError| LoadError::in_namespace(name, cause);

    let child_base = access.join(base, name).map_err(|e| in_namespace(e.into()))?;
    load_namespace(access, &child_base, child, options).map_err(in_namespace)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::MemoryAccess;
    use crate::table::Table;
    use crate::test_utils::*;

    fn load_scenario(access: &MemoryAccess, options: &LoadOptions) -> Result<Namespace, LoadError> {
        load_root(access, &access.root_path(), &scenario_shape(), options)
    }

    #[test]
    fn loads_two_level_tree() {
        let access = scenario_access();
        let root = load(&access, &access.root_path(), &scenario_shape()).unwrap();

        let a = root.table::<i32, Item>("a").unwrap();
        let keys: std::collections::BTreeSet<_> = a.keys().copied().collect();
        assert_eq!(keys, [1, 2].into());

        let ns = root.namespace("ns").unwrap();
        assert_eq!(ns.table::<i32, Item>("a").unwrap().len(), 1);
        assert_eq!(ns.table::<i32, Upgrade>("a2").unwrap().len(), 1);
    }

    #[test]
    fn missing_nested_table_is_wrapped() {
        let mut access = scenario_access();
        access.remove("ns/a2.json");

        let err = load_scenario(&access, &LoadOptions::default()).unwrap_err();
        match &err {
            LoadError::Namespace { namespace, source } => {
                assert_eq!(namespace, "ns");
                match source.as_ref() {
                    LoadError::Table { table, source } => {
                        assert_eq!(table, "a2");
                        assert!(matches!(
                            source.as_ref(),
                            LoadError::Access(AccessError::NotFound { .. })
                        ));
                    }
                    other => panic!("expected Table, got {other:?}"),
                }
            }
            other => panic!("expected Namespace, got {other:?}"),
        }
        assert_eq!(err.location(), "ns.a2");
    }

    #[test]
    fn codec_error_is_wrapped_with_table() {
        let mut access = scenario_access();
        access.insert("a.json", r#"{"abc": {"name": "x", "price": 1}}"#);

        let err = load_scenario(&access, &LoadOptions::default()).unwrap_err();
        assert_eq!(err.location(), "a");
        assert!(matches!(
            err.root_cause(),
            LoadError::Codec(CodecError::KeyDecode { raw, .. }) if raw == "abc"
        ));
    }

    #[test]
    fn empty_shape_reads_nothing() {
        let access = MemoryAccess::new("data");
        let root = load(&access, &access.root_path(), &Shape::default()).unwrap();
        assert_eq!(root.table_count(), 0);
    }

    #[test]
    fn empty_table_file_is_empty_table() {
        let access = MemoryAccess::new("data").with_file("t.json", "{}");
        let shape = Shape::builder().table::<u32, Item>("t").build().unwrap();
        let root = load(&access, &access.root_path(), &shape).unwrap();
        assert!(root.table::<u32, Item>("t").unwrap().is_empty());
    }

    #[test]
    fn sibling_tables_are_independent_types() {
        let access = MemoryAccess::new("data")
            .with_file("names.json", r#"{"x": "ex"}"#)
            .with_file("flags.json", r#"{"true": 1, "false": 0}"#);
        let shape = Shape::builder()
            .table::<String, String>("names")
            .table::<bool, u8>("flags")
            .build()
            .unwrap();

        let root = load(&access, &access.root_path(), &shape).unwrap();
        let flags: &Table<bool, u8> = root.table("flags").unwrap();
        assert_eq!(flags.get(&true), Some(&1));
    }

    #[test]
    fn cancelled_before_first_read() {
        let token = CancelToken::new();
        token.cancel();
        let options = LoadOptions::new().with_cancel(token);

        let err = load_scenario(&scenario_access(), &options).unwrap_err();
        assert!(matches!(err.root_cause(), LoadError::Cancelled));
        assert_eq!(err.location(), "a");
    }

    #[test]
    fn deadline_in_the_past() {
        let options = LoadOptions::new().with_deadline(Instant::now());
        let err = load_scenario(&scenario_access(), &options).unwrap_err();
        assert!(matches!(err.root_cause(), LoadError::DeadlineExceeded));
    }

    #[test]
    fn generous_timeout_succeeds() {
        let options = LoadOptions::new().with_timeout(Duration::from_secs(60));
        assert!(options.deadline().is_some());
        assert!(load_scenario(&scenario_access(), &options).is_ok());
    }

    #[test]
    fn unrepresentable_timeout_is_unbounded() {
        let options = LoadOptions::new().with_timeout(Duration::MAX);
        assert!(options.deadline().is_none());
        assert!(load_scenario(&scenario_access(), &options).is_ok());
    }

    #[test]
    fn first_failing_table_in_declaration_order_wins() {
        let access = MemoryAccess::new("data").with_file("b.json", "[]");
        let shape = Shape::builder()
            .table::<i32, Item>("b")
            .table::<i32, Item>("a")
            .build()
            .unwrap();

        let err = load(&access, &access.root_path(), &shape).unwrap_err();
        assert_eq!(err.location(), "b");
        assert!(matches!(err.root_cause(), LoadError::Codec(CodecError::Format { .. })));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_matches_sequential() {
        let access = scenario_access();
        let options = LoadOptions::new().with_parallel(true);
        let root = load_scenario(&access, &options).unwrap();
        assert_eq!(root.table_count(), 3);
        assert_eq!(root.row_count(), 4);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_reports_same_first_error() {
        let mut access = scenario_access();
        access.insert("a.json", "not json");
        access.remove("ns/a.json");

        let sequential = load_scenario(&access, &LoadOptions::default()).unwrap_err();
        for _ in 0..20 {
            let parallel =
                load_scenario(&access, &LoadOptions::new().with_parallel(true)).unwrap_err();
            assert_eq!(parallel.location(), sequential.location());
            assert_eq!(parallel.to_string(), sequential.to_string());
        }
        assert_eq!(sequential.location(), "a");
    }

    #[test]
    fn error_display_chains_locations() {
        let err = LoadError::in_namespace(
            "ns",
            LoadError::in_table(
                "a2",
                AccessError::NotFound {
                    path: "data/ns/a2.json".to_string(),
                }
                .into(),
            ),
        );
        let msg = format!("{err}");
        assert!(msg.contains("namespace 'ns'"));
        assert!(msg.contains("table 'a2'"));
        assert!(msg.contains("data/ns/a2.json"));
    }
}
