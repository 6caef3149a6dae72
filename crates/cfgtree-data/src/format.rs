//! Format detection, file discovery and deserialization for manifest and
//! config files.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use cfgtree_core::loader::LoadError;
use cfgtree_core::shape::ShapeError;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while reading manifests and configs.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// A required file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The manifest declares an invalid shape.
    #[error("invalid shape in {file}: {source}")]
    Shape { file: PathBuf, source: ShapeError },

    /// Loading the described tree failed.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported manifest formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a file with the given base name in any supported
/// format. Returns `Ok(None)` if none exists and `ConflictingFormats` if
/// more than one does.
pub fn find_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataError> {
    let mut found: Option<PathBuf> = None;

    for format in Format::ALL {
        let candidate = dir.join(format!("{base_name}.{}", format.extension()));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_file`], but a missing file is an error.
pub fn require_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataError> {
    find_file(dir, base_name)?.ok_or_else(|| DataError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

/// Resolve a manifest or config path. A path with an extension is used as
/// is; a bare base name such as `gen/shape` is looked up in every supported
/// format and must match exactly one file.
pub fn resolve_file(path: &Path) -> Result<PathBuf, DataError> {
    if path.extension().is_some() {
        return Ok(path.to_path_buf());
    }
    let base_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DataError::UnsupportedFormat {
            file: path.to_path_buf(),
        })?;
    let dir = path.parent().unwrap_or(Path::new(""));
    require_file(dir, base_name)
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

/// Deserialize `content` in `format`; `origin` is only used in errors.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    origin: &Path,
) -> Result<T, DataError> {
    let parse_error = |detail: String| DataError::Parse {
        file: origin.to_path_buf(),
        detail,
    };

    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
