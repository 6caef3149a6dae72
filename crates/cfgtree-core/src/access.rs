//! Data access port: reading table text and joining path handles.
//!
//! The loader never touches storage directly; it goes through a
//! [`DataAccess`] implementation. Two backends ship with the crate:
//! [`FsAccess`] over the local filesystem and [`MemoryAccess`] over an
//! in-memory map of `path -> text` (embedded data, engine virtual
//! filesystems, tests).

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors raised by a [`DataAccess`] backend.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// Nothing exists at the given path.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// The path exists but could not be read as text.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A join segment is malformed.
    #[error("invalid path segment '{segment}' under {base}: {reason}")]
    InvalidPath {
        base: String,
        segment: String,
        reason: &'static str,
    },
}

// ===========================================================================
// Port
// ===========================================================================

/// Capability to read text blobs and build path handles.
///
/// # Concurrency
///
/// Implementations must be `Send + Sync`, and `read_text` must be safe to
/// call from several threads at once: the `parallel` loader fans reads of
/// sibling tables out across a thread pool. No caching is assumed; a reload
/// may observe new content.
pub trait DataAccess: Send + Sync {
    /// Backend-specific location of a file or directory. The loader never
    /// inspects it beyond `Debug` for diagnostics.
    type Path: Clone + Debug + Send + Sync;

    /// Read the whole blob at `path` as text.
    fn read_text(&self, path: &Self::Path) -> Result<String, AccessError>;

    /// Append one relative segment to `path`. Must not access storage.
    fn join(&self, path: &Self::Path, segment: &str) -> Result<Self::Path, AccessError>;

    /// Base location of the whole tree.
    fn root_path(&self) -> Self::Path;
}

/// Reject segments that would escape or restructure the tree.
pub fn validate_segment(base: &dyn Debug, segment: &str) -> Result<(), AccessError> {
    let reason = if segment.is_empty() {
        Some("empty segment")
    } else if segment == "." || segment == ".." {
        Some("relative component")
    } else if segment.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if segment.contains('\0') {
        Some("contains a NUL byte")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AccessError::InvalidPath {
            base: format!("{base:?}"),
            segment: segment.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

// ===========================================================================
// Filesystem backend
// ===========================================================================

/// Reads tables from a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsAccess {
    root: PathBuf,
}

impl FsAccess {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DataAccess for FsAccess {
    type Path = PathBuf;

    fn read_text(&self, path: &PathBuf) -> Result<String, AccessError> {
        std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AccessError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                AccessError::Io {
                    path: path.display().to_string(),
                    source,
                }
            }
        })
    }

    fn join(&self, path: &PathBuf, segment: &str) -> Result<PathBuf, AccessError> {
        validate_segment(path, segment)?;
        Ok(path.join(segment))
    }

    fn root_path(&self) -> PathBuf {
        self.root.clone()
    }
}

// ===========================================================================
// In-memory backend
// ===========================================================================

/// Separator used by [`MemoryAccess`] handles.
pub const MEMORY_SEPARATOR: char = '/';

/// Serves tables from an in-memory `path -> text` map.
///
/// Handles are `/`-joined strings under a root such as `"data"` or
/// `"res://gen/data"`.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccess {
    root: String,
    files: HashMap<String, String>,
}

impl MemoryAccess {
    pub fn new(root: impl Into<String>) -> Self {
        let mut root = root.into();
        while root.len() > 1 && root.ends_with(MEMORY_SEPARATOR) && !root.ends_with("://") {
            root.pop();
        }
        Self {
            root,
            files: HashMap::new(),
        }
    }

    /// Add a file at `relative` (a `/`-separated path under the root).
    pub fn with_file(mut self, relative: &str, text: impl Into<String>) -> Self {
        self.insert(relative, text);
        self
    }

    /// Add or replace a file at `relative` (a `/`-separated path under the root).
    pub fn insert(&mut self, relative: &str, text: impl Into<String>) {
        let path = self.absolute(relative);
        self.files.insert(path, text.into());
    }

    /// Remove the file at `relative`, returning its text.
    pub fn remove(&mut self, relative: &str) -> Option<String> {
        let path = self.absolute(relative);
        self.files.remove(&path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn absolute(&self, relative: &str) -> String {
        let relative = relative.trim_matches(MEMORY_SEPARATOR);
        concat_path(&self.root, relative)
    }
}

fn concat_path(base: &str, segment: &str) -> String {
    if base.is_empty() {
        segment.to_string()
    } else if base.ends_with(MEMORY_SEPARATOR) {
        format!("{base}{segment}")
    } else {
        format!("{base}{MEMORY_SEPARATOR}{segment}")
    }
}

impl DataAccess for MemoryAccess {
    type Path = String;

    fn read_text(&self, path: &String) -> Result<String, AccessError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| AccessError::NotFound { path: path.clone() })
    }

    fn join(&self, path: &String, segment: &str) -> Result<String, AccessError> {
        validate_segment(path, segment)?;
        Ok(concat_path(path, segment))
    }

    fn root_path(&self) -> String {
        self.root.clone()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
