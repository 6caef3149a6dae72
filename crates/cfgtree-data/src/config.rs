//! Loader configuration file.
//!
//! ```toml
//! root = "gen/data"
//! manifest = "gen/shape.ron"
//! parallel = true
//! timeout_ms = 5000
//! ```
//!
//! Relative `root` and `manifest` paths are resolved against the directory
//! holding the config file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use cfgtree_core::access::FsAccess;
use cfgtree_core::loader::LoadOptions;
use cfgtree_core::tree::TableTree;

use crate::format::{DataError, Format, deserialize_str};
use crate::manifest::ShapeManifest;

/// Where the data lives, what shape it has and how to load it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    /// Directory holding the root namespace.
    pub root: PathBuf,
    /// Shape manifest (RON, TOML or JSON).
    pub manifest: PathBuf,
    #[serde(default)]
    pub parallel: bool,
    /// Deadline for the whole load, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl LoaderConfig {
    /// Read a TOML config file and resolve its paths.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or(Path::new(""));
        Self::from_toml_str(&content, base_dir, path)
    }

    /// Parse config text; relative paths are resolved against `base_dir`.
    pub fn from_toml_str(content: &str, base_dir: &Path, origin: &Path) -> Result<Self, DataError> {
        let mut config: LoaderConfig = deserialize_str(content, Format::Toml, origin)?;
        config.root = base_dir.join(&config.root);
        config.manifest = base_dir.join(&config.manifest);
        Ok(config)
    }

    /// In-process options for this config. The timeout starts counting now.
    pub fn load_options(&self) -> LoadOptions {
        let options = LoadOptions::new().with_parallel(self.parallel);
        match self.timeout_ms {
            Some(ms) => options.with_timeout(Duration::from_millis(ms)),
            None => options,
        }
    }
}

/// Read the manifest named by `config` and load the tree from its root
/// directory.
pub fn load_tree(config: &LoaderConfig) -> Result<TableTree<PathBuf>, DataError> {
    let shape = ShapeManifest::load_shape(&config.manifest)?;
    let access = FsAccess::new(&config.root);
    let tree = TableTree::load_with(&access, config.root.clone(), shape, &config.load_options())?;
    Ok(tree)
}
