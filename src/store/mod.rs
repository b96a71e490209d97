//! Graph-store clients.
//!
//! The engine talks to a store through [`GraphStore`]: one [`Statement`] per
//! call, executed as a single atomic write, answered with the counts of what
//! it created. The SQLite backend is always available; the Neo4j backend is
//! behind the `neo4j` feature.

pub mod cypher;
#[cfg(feature = "neo4j")]
pub mod neo4j;
pub mod sqlite;

use crate::config::StoreConfig;
use crate::types::{ContainerRecord, FileRecord, LeafRecord};
use std::ops::AddAssign;
use std::time::Duration;

pub use sqlite::{SqliteStore, StoredNode};

/// Errors reported by a graph store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot connect to graph store at {uri}: {reason}")]
    Connection { uri: String, reason: String },

    /// Overload or lock contention; the same write may succeed later.
    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("unsupported store uri: {0}")]
    Unsupported(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// One logical write: a query template plus the records bound to it.
#[derive(Debug, Clone, Copy)]
pub enum Statement<'a> {
    /// Create the File node of a run.
    CreateFile(&'a FileRecord),

    /// Create Group nodes, each linked from its parent in the same run.
    CreateGroups { run: &'a str, rows: &'a [ContainerRecord] },

    /// Upsert value-bearing Dataset nodes by (name, value); create structural ones.
    WriteDatasets { run: &'a str, rows: &'a [LeafRecord] },

    /// Link the run's File node to every File node whose filepath is listed.
    LinkDependencies { run: &'a str, targets: &'a [String] },
}

impl Statement<'_> {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::CreateFile(_) => "file",
            Statement::CreateGroups { .. } => "groups",
            Statement::WriteDatasets { .. } => "datasets",
            Statement::LinkDependencies { .. } => "dependencies",
        }
    }

    /// Number of bound records.
    pub fn len(&self) -> usize {
        match self {
            Statement::CreateFile(_) => 1,
            Statement::CreateGroups { rows, .. } => rows.len(),
            Statement::WriteDatasets { rows, .. } => rows.len(),
            Statement::LinkDependencies { targets, .. } => targets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counts reported for a write. Observability only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub nodes_created: u64,
    pub relationships_created: u64,
    pub elapsed: Duration,
}

impl AddAssign for WriteSummary {
    fn add_assign(&mut self, other: Self) {
        self.nodes_created += other.nodes_created;
        self.relationships_created += other.relationships_created;
        self.elapsed += other.elapsed;
    }
}

/// Node and edge counts of the whole store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub files: u64,
    pub groups: u64,
    pub datasets: u64,
    pub holds: u64,
    pub depends_on: u64,
}

/// A graph store the engine can write to.
pub trait GraphStore {
    /// Execute one statement atomically.
    fn execute(&mut self, statement: &Statement<'_>) -> Result<WriteSummary, StoreError>;

    /// Delete every node and edge.
    fn reset(&mut self) -> Result<(), StoreError>;

    fn stats(&mut self) -> Result<GraphStats, StoreError>;
}

impl<S: GraphStore + ?Sized> GraphStore for Box<S> {
    fn execute(&mut self, statement: &Statement<'_>) -> Result<WriteSummary, StoreError> {
        (**self).execute(statement)
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        (**self).reset()
    }

    fn stats(&mut self) -> Result<GraphStats, StoreError> {
        (**self).stats()
    }
}

/// Open the store named by `config.uri`.
///
/// `sqlite://<path>` and `sqlite::memory:` open the embedded store;
/// `neo4j://`, `neo4j+s://` and `bolt://` need the `neo4j` feature.
pub fn open(config: &StoreConfig) -> Result<Box<dyn GraphStore>, StoreError> {
    let uri = config.uri.as_str();
    if uri == "sqlite::memory:" {
        return Ok(Box::new(SqliteStore::open_in_memory()?));
    }
    if let Some(path) = uri.strip_prefix("sqlite://") {
        if path.is_empty() {
            return Err(StoreError::Unsupported(uri.to_string()));
        }
        return Ok(Box::new(SqliteStore::open(std::path::Path::new(path))?));
    }
    if ["neo4j://", "neo4j+s://", "neo4j+ssc://", "bolt://", "bolt+s://"]
        .iter()
        .any(|scheme| uri.starts_with(scheme))
    {
        return open_neo4j(config);
    }
    Err(StoreError::Unsupported(uri.to_string()))
}

#[cfg(feature = "neo4j")]
fn open_neo4j(config: &StoreConfig) -> Result<Box<dyn GraphStore>, StoreError> {
    Ok(Box::new(neo4j::Neo4jStore::connect(config)?))
}

#[cfg(not(feature = "neo4j"))]
fn open_neo4j(config: &StoreConfig) -> Result<Box<dyn GraphStore>, StoreError> {
    Err(StoreError::Unsupported(format!(
        "{} (built without the neo4j feature)",
        config.uri
    )))
}
