//! CLI argument parsing for h5graph.

use clap::{Args, Parser, Subcommand};
use eyre::Result;
use h5graph::config::DEFAULT_URI;
use h5graph::{IngestConfig, RetryPolicy, StoreConfig};
use std::path::PathBuf;

#[cfg(feature = "hdf5")]
const AFTER_HELP: &str = "Inputs: .h5/.hdf5/.he5/.nc (HDF5) and .json/.yaml (container documents)
Logs are written to: ~/.local/share/h5graph/logs/h5graph.log";

#[cfg(not(feature = "hdf5"))]
const AFTER_HELP: &str = "Inputs: .json/.yaml (container documents). HDF5 files need a build with --features hdf5
Logs are written to: ~/.local/share/h5graph/logs/h5graph.log";

#[derive(Parser)]
#[command(
    name = "h5graph",
    about = "Ingest HDF5 container trees into a property graph",
    version = env!("GIT_DESCRIBE"),
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// Graph store URI (sqlite://<path>, sqlite::memory:, neo4j://host:port)
    #[arg(long, global = true, default_value = DEFAULT_URI)]
    pub uri: String,

    /// Graph store user
    #[arg(short = 'u', long, global = true, default_value = "neo4j")]
    pub username: String,

    /// Graph store password
    #[arg(short = 'p', long, global = true, default_value = "neo4jadmin")]
    pub password: String,

    /// Graph database name
    #[arg(long, global = true, default_value = "neo4j")]
    pub database: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            uri: self.uri.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Ingest a single container file
    File {
        /// Container file
        path: PathBuf,

        #[command(flatten)]
        ingest: IngestArgs,
    },

    /// Ingest every container file under a directory
    Directory {
        /// Root directory
        dir: PathBuf,

        #[command(flatten)]
        ingest: IngestArgs,
    },

    /// Delete every node and relationship in the store
    Reset,

    /// Show node and relationship counts
    Stats,
}

#[derive(Args, Debug, Default)]
pub struct IngestArgs {
    /// YAML ingest config; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Dataset names to skip (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude_datasets: Vec<String>,

    /// Group names to skip (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude_groups: Vec<String>,

    /// Path substrings to skip (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude_paths: Vec<String>,

    /// Records per store transaction
    #[arg(short, long, alias = "batchsize")]
    pub batch_size: Option<usize>,

    /// Copy scalar attributes onto nodes
    #[arg(long)]
    pub transfer_attrs: bool,

    /// Halve the batch size and retry on transient store failures
    #[arg(long)]
    pub adaptive_batch: bool,

    /// Retries per chunk with --adaptive-batch
    #[arg(long, default_value = "5")]
    pub max_retries: u32,

    /// Files the ingested file(s) depend on (comma-separated)
    #[arg(long = "connect-to-filepath", alias = "depends-on", value_delimiter = ',')]
    pub depends_on: Vec<PathBuf>,

    /// File extensions picked up in directory mode (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Reset the store before ingesting
    #[arg(long)]
    pub reset: bool,
}

impl IngestArgs {
    /// Build the ingest config: file values first, then flags.
    pub fn to_config(&self) -> Result<IngestConfig> {
        let mut config = match &self.config {
            Some(path) => IngestConfig::load(path)?,
            None => IngestConfig::default(),
        };

        config.exclude_datasets.extend(self.exclude_datasets.iter().cloned());
        config.exclude_groups.extend(self.exclude_groups.iter().cloned());
        config.exclude_paths.extend(self.exclude_paths.iter().cloned());
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if self.transfer_attrs {
            config.transfer_attributes = true;
        }
        if self.adaptive_batch {
            config.retry = RetryPolicy::Adaptive {
                max_retries: self.max_retries,
            };
        }
        if !self.extensions.is_empty() {
            config.extensions = self.extensions.clone();
        }

        config.validate()?;
        Ok(config)
    }
}
