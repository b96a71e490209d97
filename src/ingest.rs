//! Single-file ingestion: read, walk, write, link.

use crate::config::IngestConfig;
use crate::link::link_dependencies;
use crate::registry::Registry;
use crate::source;
use crate::store::{GraphStore, WriteSummary};
use crate::types::{Attributes, FileRecord, file_name, path_key};
use crate::walker::{self, WalkStats};
use crate::writer::BatchWriter;
use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Prefix of every run id.
pub const RUN_PREFIX: &str = "ig-";

/// Outcome of one file ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub filepath: String,
    pub run: String,
    pub walk: WalkStats,
    /// Store totals, dependency edges included.
    pub written: WriteSummary,
    pub chunks: usize,
    /// `depends_on` edges created.
    pub dependencies: u64,
}

/// Ingests container files into a graph store.
///
/// The store is borrowed for the ingestor's lifetime; every call gets its own
/// run id and its own [`Registry`].
pub struct Ingestor<'s, S: GraphStore + ?Sized> {
    pub(crate) store: &'s mut S,
    pub(crate) config: IngestConfig,
    reset_pending: bool,
}

impl<'s, S: GraphStore + ?Sized> Ingestor<'s, S> {
    pub fn new(store: &'s mut S, config: IngestConfig) -> Result<Self> {
        config.validate().wrap_err("Invalid ingest configuration")?;
        Ok(Self {
            store,
            config,
            reset_pending: false,
        })
    }

    /// Empty the store before the first write.
    ///
    /// The reset waits until an input has been read successfully, so a
    /// missing or unreadable input leaves the store as it was.
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset_pending = reset;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Delete everything in the store now.
    pub fn reset(&mut self) -> Result<()> {
        self.store.reset().wrap_err("Failed to reset graph store")?;
        self.reset_pending = false;
        log::info!("Graph store reset");
        Ok(())
    }

    /// Run a reset requested with [`Ingestor::with_reset`], once.
    pub(crate) fn apply_pending_reset(&mut self) -> Result<()> {
        if self.reset_pending {
            self.reset()?;
        }
        Ok(())
    }

    /// Ingest one container file, then link it to `depends_on`.
    ///
    /// The file is fully read before the first store write, so an unreadable
    /// file leaves the store untouched.
    pub fn ingest_file(&mut self, path: &Path, depends_on: &[PathBuf]) -> Result<IngestReport> {
        let tree = source::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?;

        let ingested_at = Utc::now();
        let filepath = path_key(path);
        let name = file_name(path);

        let mut registry = Registry::new();
        let walk = walker::walk(&tree, &name, &self.config, &mut registry);

        let file = FileRecord {
            run: run_id(&filepath, ingested_at, &walk),
            name,
            filepath,
            ingested_at,
            attributes: if self.config.transfer_attributes {
                tree.attributes
            } else {
                Attributes::new()
            },
        };
        log::info!(
            "Ingesting {} as run {}: {} groups, {} datasets, {} excluded, {} skipped",
            file.filepath,
            file.run,
            walk.containers,
            walk.leaves,
            walk.excluded,
            walk.skipped
        );

        self.apply_pending_reset()?;

        let flushed = BatchWriter::new(&mut *self.store, &self.config)
            .flush(&file, registry)
            .wrap_err_with(|| format!("Failed to write {}", file.filepath))?;

        let dependencies = link_dependencies(&mut *self.store, &file, depends_on)?;

        let mut written = flushed.written;
        written.relationships_created += dependencies;

        log::info!(
            "Ingested {}: {} nodes, {} relationships in {}ms",
            file.filepath,
            written.nodes_created,
            written.relationships_created,
            written.elapsed.as_millis()
        );

        Ok(IngestReport {
            filepath: file.filepath,
            run: file.run,
            walk,
            written,
            chunks: flushed.chunks,
            dependencies,
        })
    }
}

/// Id of one ingestion run: a digest over what the run read and when, salted
/// so two runs over the same file in the same instant still differ.
fn run_id(filepath: &str, ingested_at: DateTime<Utc>, walk: &WalkStats) -> String {
    let salt: u64 = rand::rng().random();
    let digest = Sha256::new()
        .chain_update(filepath)
        .chain_update(ingested_at.to_rfc3339())
        .chain_update(format!("{}/{}/{}", walk.containers, walk.leaves, walk.excluded))
        .chain_update(salt.to_le_bytes())
        .finalize();
    let hex: String = digest.iter().take(5).map(|b| format!("{:02x}", b)).collect();
    format!("{}{}", RUN_PREFIX, hex)
}
