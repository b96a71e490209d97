//! Ingestion and store configuration.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of records per store transaction.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default store location.
pub const DEFAULT_URI: &str = "sqlite://h5graph.db";

/// What to do when a chunk write fails with a transient store error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Abort the ingestion on the first failure.
    #[default]
    None,
    /// Halve the chunk size and retry, up to `max_retries` times per chunk.
    Adaptive { max_retries: u32 },
}

/// Options controlling one ingestion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Dataset names to skip (exact match on the last path segment).
    pub exclude_datasets: Vec<String>,

    /// Group names to skip (exact match on the last path segment).
    pub exclude_groups: Vec<String>,

    /// Substrings of full paths to skip, for groups and datasets.
    pub exclude_paths: Vec<String>,

    /// Records per store transaction.
    pub batch_size: usize,

    /// Copy scalar source attributes onto created nodes.
    pub transfer_attributes: bool,

    pub retry: RetryPolicy,

    /// File extensions picked up by directory ingestion.
    pub extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            exclude_datasets: Vec::new(),
            exclude_groups: Vec::new(),
            exclude_paths: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            transfer_attributes: false,
            retry: RetryPolicy::None,
            extensions: vec!["h5".to_string(), "hdf5".to_string()],
        }
    }
}

impl IngestConfig {
    /// Load a config from a YAML file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: IngestConfig =
            serde_yaml::from_str(&text).with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            eyre::bail!("batch_size must be at least 1");
        }
        if self.exclude_paths.iter().any(|p| p.is_empty()) {
            eyre::bail!("exclude_paths must not contain an empty string");
        }
        Ok(())
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_attributes(mut self, transfer: bool) -> Self {
        self.transfer_attributes = transfer;
        self
    }
}

/// Connection parameters for the graph store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl StoreConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            username: "neo4j".to_string(),
            password: "neo4jadmin".to_string(),
            database: "neo4j".to_string(),
        }
    }
}
