//! h5graph: ingest HDF5-style container trees into a property graph.
//!
//! Each container file becomes a File node holding its Group hierarchy and
//! its Datasets. Scalar datasets are shared across files by (name, value);
//! everything else is created per ingestion run. Files can be linked with
//! `depends_on` edges, either explicitly or by directory nesting.
//!
//! # Example
//!
//! ```no_run
//! use h5graph::{IngestConfig, Ingestor, SqliteStore};
//! use std::path::{Path, PathBuf};
//!
//! let mut store = SqliteStore::open(Path::new("graph.db")).unwrap();
//! let mut ingestor = Ingestor::new(&mut store, IngestConfig::default()).unwrap();
//!
//! // Ingest one file
//! let base = ingestor.ingest_file(Path::new("runs/base.h5"), &[]).unwrap();
//!
//! // Ingest another that depends on it
//! let deps = vec![PathBuf::from("runs/base.h5")];
//! ingestor.ingest_file(Path::new("runs/next.h5"), &deps).unwrap();
//!
//! // Or a whole tree, each level depending on the one above
//! let report = ingestor.ingest_directory(Path::new("runs"), &[]).unwrap();
//! println!("{} files, {} nodes", report.files.len(), report.total().nodes_created);
//! # let _ = base;
//! ```

mod ingest;
mod link;
mod orchestrator;
mod registry;
mod walker;
mod writer;

pub mod coerce;
pub mod config;
pub mod source;
pub mod store;
pub mod types;

// Re-export public API
pub use config::{IngestConfig, RetryPolicy, StoreConfig};
pub use ingest::{IngestReport, Ingestor};
pub use link::link_dependencies;
pub use orchestrator::{DirectoryReport, scan_directory};
pub use registry::Registry;
pub use source::SourceError;
pub use store::{GraphStats, GraphStore, SqliteStore, Statement, StoreError, StoredNode, WriteSummary};
pub use types::{ContainerRecord, ContainerTree, FileRecord, LeafRecord, NodeClass, Value};
pub use walker::{WalkStats, classify, walk};
pub use writer::{BatchWriter, FlushReport};
