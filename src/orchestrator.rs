//! Recursive directory ingestion.
//!
//! Each directory's container files depend on the files of the directory
//! above it. Files and subdirectories are visited in sorted order; symbolic
//! links to directories are not followed.

use crate::ingest::{IngestReport, Ingestor};
use crate::source::has_extension;
use crate::store::{GraphStore, WriteSummary};
use eyre::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// Outcome of a directory ingestion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryReport {
    /// One report per ingested file, in visit order.
    pub files: Vec<IngestReport>,
    /// Directories scanned, the root included.
    pub directories: usize,
}

impl DirectoryReport {
    pub fn total(&self) -> WriteSummary {
        let mut total = WriteSummary::default();
        for report in &self.files {
            total += report.written;
        }
        total
    }
}

/// Container files and subdirectories directly inside `dir`, both sorted.
pub fn scan_directory(dir: &Path, extensions: &[String]) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let entries = std::fs::read_dir(dir).wrap_err_with(|| format!("Failed to read directory {}", dir.display()))?;

    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    for entry in entries {
        let entry = entry.wrap_err_with(|| format!("Failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .wrap_err_with(|| format!("Failed to stat {}", path.display()))?;

        if file_type.is_dir() {
            subdirs.push(path);
        } else if (file_type.is_file() || (file_type.is_symlink() && path.is_file()))
            && has_extension(&path, extensions)
        {
            files.push(path);
        } else if file_type.is_symlink() {
            log::debug!("Not following {}", path.display());
        }
    }

    files.sort();
    subdirs.sort();
    Ok((files, subdirs))
}

impl<S: GraphStore + ?Sized> Ingestor<'_, S> {
    /// Ingest every container file under `root`.
    ///
    /// Files directly in `root` depend on `seed`; files in each subdirectory
    /// depend on the files of its parent directory. The first failure stops
    /// the traversal.
    pub fn ingest_directory(&mut self, root: &Path, seed: &[PathBuf]) -> Result<DirectoryReport> {
        if !root.is_dir() {
            bail!("Not a directory: {}", root.display());
        }

        let mut report = DirectoryReport::default();
        self.scan(root, seed, &mut report)?;
        // No container files anywhere: a requested reset still happens.
        self.apply_pending_reset()?;
        log::info!(
            "Ingested {} files from {} directories under {}",
            report.files.len(),
            report.directories,
            root.display()
        );
        Ok(report)
    }

    fn scan(&mut self, dir: &Path, seed: &[PathBuf], report: &mut DirectoryReport) -> Result<()> {
        let (files, subdirs) = scan_directory(dir, &self.config.extensions)?;
        report.directories += 1;
        log::debug!(
            "Scanning {}: {} files, {} subdirectories",
            dir.display(),
            files.len(),
            subdirs.len()
        );

        for file in &files {
            report.files.push(self.ingest_file(file, seed)?);
        }
        for subdir in &subdirs {
            self.scan(subdir, &files, report)?;
        }
        Ok(())
    }
}
