//! Container-file readers.
//!
//! A reader opens a container by path and materializes it into a
//! [`ContainerTree`]. The file handle is released before `open` returns, so
//! ingestion never holds a container open while writing to the store.

mod document;
#[cfg(feature = "hdf5")]
mod native;

use crate::types::ContainerTree;
use std::path::{Path, PathBuf};

/// Errors raised while opening a container.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("container file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("unsupported container format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed container {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },
}

/// On-disk container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Hdf5,
    Json,
    Yaml,
}

impl Format {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "h5" | "hdf5" | "he5" | "nc" => Some(Format::Hdf5),
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }
}

/// Open a container file and materialize its tree.
pub fn open(path: &Path) -> Result<ContainerTree, SourceError> {
    if !path.is_file() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }
    match Format::from_path(path) {
        Some(Format::Json) => document::read_json(path),
        Some(Format::Yaml) => document::read_yaml(path),
        Some(Format::Hdf5) => read_hdf5(path),
        None => Err(SourceError::UnsupportedFormat(path.to_path_buf())),
    }
}

#[cfg(feature = "hdf5")]
fn read_hdf5(path: &Path) -> Result<ContainerTree, SourceError> {
    native::read(path)
}

#[cfg(not(feature = "hdf5"))]
fn read_hdf5(path: &Path) -> Result<ContainerTree, SourceError> {
    log::warn!("HDF5 support not compiled in; rebuild with --features hdf5");
    Err(SourceError::UnsupportedFormat(path.to_path_buf()))
}

/// Returns true if `path` has one of the given extensions (case-insensitive).
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext)))
}
