//! Shared test infrastructure for h5graph integration tests.
//!
//! Provides TestEnv helper for consistent test setup/teardown, and store
//! wrappers that observe or disturb the statements the engine issues.

#![allow(dead_code)]

use h5graph::{
    DirectoryReport, GraphStats, GraphStore, IngestConfig, IngestReport, Ingestor, SqliteStore, Statement,
    StoreError, StoredNode, WriteSummary,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Root leaf `x` holding 5 and root leaf `y` holding a 3-vector.
pub const SCALAR_AND_VECTOR: &str = r#"{
    "members": [
        {"kind": "dataset", "name": "x", "dtype": "int", "data": 5},
        {"kind": "dataset", "name": "y", "dtype": "float", "shape": [3], "data": [1.0, 2.0, 3.0]}
    ]
}"#;

/// `/A/B/z` holding "ok".
pub const NESTED: &str = r#"{
    "members": [
        {"kind": "group", "name": "A", "members": [
            {"kind": "group", "name": "B", "members": [
                {"kind": "dataset", "name": "z", "dtype": "string", "data": "ok"}
            ]}
        ]}
    ]
}"#;

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub store: SqliteStore,
}

impl TestEnv {
    /// Create a new test environment with an empty in-memory store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = SqliteStore::open_in_memory().expect("Failed to open store");
        Self { temp_dir, store }
    }

    /// Absolute path of `relative` inside the temp dir.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }

    /// Write a container document, creating parent directories.
    pub fn write_doc(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directory");
        }
        std::fs::write(&path, contents).expect("Failed to write document");
        path
    }

    /// Ingest a file with the default config.
    pub fn ingest(&mut self, path: &Path, depends_on: &[PathBuf]) -> IngestReport {
        self.ingest_with(IngestConfig::default(), path, depends_on)
    }

    /// Ingest a file with a custom config.
    pub fn ingest_with(&mut self, config: IngestConfig, path: &Path, depends_on: &[PathBuf]) -> IngestReport {
        Ingestor::new(&mut self.store, config)
            .expect("Invalid config")
            .ingest_file(path, depends_on)
            .expect("Failed to ingest file")
    }

    /// Ingest a directory tree with the given extensions.
    pub fn ingest_dir(&mut self, dir: &Path, seed: &[PathBuf]) -> DirectoryReport {
        let config = IngestConfig::default().with_extensions(["json"]);
        Ingestor::new(&mut self.store, config)
            .expect("Invalid config")
            .ingest_directory(dir, seed)
            .expect("Failed to ingest directory")
    }

    pub fn stats(&mut self) -> GraphStats {
        self.store.stats().expect("Failed to read stats")
    }

    /// The single File node stored for `path`.
    pub fn file_node(&self, path: &Path) -> StoredNode {
        let mut files = self
            .store
            .files_at(&path.to_string_lossy())
            .expect("Failed to query files");
        assert_eq!(files.len(), 1, "Expected one File node for {}", path.display());
        files.remove(0)
    }

    /// Names of the nodes held by `id`.
    pub fn child_names(&self, id: i64) -> Vec<String> {
        self.store
            .children(id)
            .expect("Failed to query children")
            .into_iter()
            .map(|n| n.name)
            .collect()
    }

    /// Filepaths of the Files that `id` depends on.
    pub fn dependency_paths(&self, id: i64) -> Vec<String> {
        self.store
            .dependencies(id)
            .expect("Failed to query dependencies")
            .into_iter()
            .filter_map(|n| n.filepath)
            .collect()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// One executed statement as seen by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub kind: &'static str,
    /// File name, container paths, or dependency targets.
    pub keys: Vec<String>,
}

/// Records every statement before passing it on to a SQLite store.
pub struct RecordingStore {
    pub inner: SqliteStore,
    pub log: Vec<Recorded>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().expect("Failed to open store"),
            log: Vec::new(),
        }
    }

    /// Paths written by each `groups` statement, in order.
    pub fn group_batches(&self) -> Vec<Vec<String>> {
        self.log
            .iter()
            .filter(|r| r.kind == "groups")
            .map(|r| r.keys.clone())
            .collect()
    }
}

impl GraphStore for RecordingStore {
    fn execute(&mut self, statement: &Statement<'_>) -> Result<WriteSummary, StoreError> {
        let keys = match statement {
            Statement::CreateFile(file) => vec![file.name.clone()],
            Statement::CreateGroups { rows, .. } => rows.iter().map(|r| r.hdf5_path.clone()).collect(),
            Statement::WriteDatasets { rows, .. } => rows.iter().map(|r| r.hdf5_path.clone()).collect(),
            Statement::LinkDependencies { targets, .. } => targets.to_vec(),
        };
        self.log.push(Recorded {
            kind: statement.kind(),
            keys,
        });
        self.inner.execute(statement)
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        self.inner.reset()
    }

    fn stats(&mut self) -> Result<GraphStats, StoreError> {
        self.inner.stats()
    }
}

/// Rejects statements carrying more than `limit` records with a transient error.
pub struct FlakyStore {
    pub inner: SqliteStore,
    pub limit: usize,
    pub rejected: usize,
    /// Sizes of the statements that went through.
    pub accepted: Vec<usize>,
}

impl FlakyStore {
    pub fn new(limit: usize) -> Self {
        Self {
            inner: SqliteStore::open_in_memory().expect("Failed to open store"),
            limit,
            rejected: 0,
            accepted: Vec::new(),
        }
    }
}

impl GraphStore for FlakyStore {
    fn execute(&mut self, statement: &Statement<'_>) -> Result<WriteSummary, StoreError> {
        if statement.len() > self.limit {
            self.rejected += 1;
            return Err(StoreError::Transient(format!("{} records exceed limit {}", statement.len(), self.limit)));
        }
        self.accepted.push(statement.len());
        self.inner.execute(statement)
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        self.inner.reset()
    }

    fn stats(&mut self) -> Result<GraphStats, StoreError> {
        self.inner.stats()
    }
}

/// A document with `n` root-level scalar datasets `d0..dn`.
pub fn many_scalars(n: usize) -> String {
    let members: Vec<String> = (0..n)
        .map(|i| format!(r#"{{"kind": "dataset", "name": "d{}", "dtype": "int", "data": {}}}"#, i, i))
        .collect();
    format!(r#"{{"members": [{}]}}"#, members.join(", "))
}
