//! Depth-ordered batch writes of one file's records.
//!
//! The File node goes first, then Group records one depth level at a time,
//! then every Dataset record. Each level is a barrier: a level's chunks are
//! all committed before the next level starts, so a Group's parent is always
//! in the store when the Group is written.

use crate::config::{IngestConfig, RetryPolicy};
use crate::registry::Registry;
use crate::store::{GraphStore, Statement, StoreError, WriteSummary};
use crate::types::FileRecord;
use eyre::{Context, Result};

/// Consecutive successful chunks before a reduced chunk size is doubled.
const GROWTH_STREAK: u32 = 4;

/// Totals for one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub written: WriteSummary,
    pub chunks: usize,
    /// Container depth levels written.
    pub levels: usize,
    /// Chunk writes retried after a transient failure.
    pub retries: usize,
}

/// Chunk size state for the adaptive retry policy.
#[derive(Debug)]
struct ChunkSizer {
    configured: usize,
    current: usize,
    max_retries: u32,
    attempts: u32,
    streak: u32,
}

impl ChunkSizer {
    fn new(batch_size: usize, retry: RetryPolicy) -> Self {
        let max_retries = match retry {
            RetryPolicy::None => 0,
            RetryPolicy::Adaptive { max_retries } => max_retries,
        };
        Self {
            configured: batch_size.max(1),
            current: batch_size.max(1),
            max_retries,
            attempts: 0,
            streak: 0,
        }
    }

    fn size(&self) -> usize {
        self.current
    }

    fn succeeded(&mut self) {
        self.attempts = 0;
        if self.current < self.configured {
            self.streak += 1;
            if self.streak >= GROWTH_STREAK {
                self.current = (self.current * 2).min(self.configured);
                self.streak = 0;
            }
        }
    }

    /// Shrink after a transient failure. False once the retry budget is spent.
    fn failed(&mut self) -> bool {
        if self.attempts >= self.max_retries {
            return false;
        }
        self.attempts += 1;
        self.current = (self.current / 2).max(1);
        self.streak = 0;
        true
    }
}

/// Writes a [`Registry`] to a store in depth order.
pub struct BatchWriter<'s, S: GraphStore + ?Sized> {
    store: &'s mut S,
    sizer: ChunkSizer,
    report: FlushReport,
}

impl<'s, S: GraphStore + ?Sized> BatchWriter<'s, S> {
    pub fn new(store: &'s mut S, config: &IngestConfig) -> Self {
        Self {
            store,
            sizer: ChunkSizer::new(config.batch_size, config.retry),
            report: FlushReport::default(),
        }
    }

    /// Write the File node, every Group level and then every Dataset.
    ///
    /// Any store failure that is not retried aborts the remaining writes.
    pub fn flush(mut self, file: &FileRecord, registry: Registry) -> Result<FlushReport> {
        let summary = self
            .submit(&Statement::CreateFile(file))
            .wrap_err_with(|| format!("Failed to create File node for {}", file.filepath))?;
        self.report.written += summary;

        let run = file.run.as_str();
        let (levels, leaves) = registry.into_levels();

        for (depth, rows) in &levels {
            log::debug!("Writing {} groups at depth {}", rows.len(), depth);
            let summary = self
                .submit_chunked(rows, |chunk| Statement::CreateGroups { run, rows: chunk })
                .wrap_err_with(|| format!("Failed to write groups at depth {}", depth))?;
            self.report.written += summary;
            self.report.levels += 1;
        }

        log::debug!("Writing {} datasets", leaves.len());
        let summary = self
            .submit_chunked(&leaves, |chunk| Statement::WriteDatasets { run, rows: chunk })
            .wrap_err("Failed to write datasets")?;
        self.report.written += summary;

        Ok(self.report)
    }

    fn submit(&mut self, statement: &Statement<'_>) -> Result<WriteSummary, StoreError> {
        let summary = self.store.execute(statement)?;
        self.report.chunks += 1;
        log::info!(
            "Wrote {} {}: {} nodes, {} relationships in {}ms",
            statement.len(),
            statement.kind(),
            summary.nodes_created,
            summary.relationships_created,
            summary.elapsed.as_millis()
        );
        Ok(summary)
    }

    /// Write `rows` in chunks, one statement per chunk.
    fn submit_chunked<'r, T>(
        &mut self,
        rows: &'r [T],
        make: impl Fn(&'r [T]) -> Statement<'r>,
    ) -> Result<WriteSummary, StoreError> {
        let mut total = WriteSummary::default();
        let mut offset = 0;

        while offset < rows.len() {
            let end = (offset + self.sizer.size()).min(rows.len());
            let statement = make(&rows[offset..end]);
            match self.submit(&statement) {
                Ok(summary) => {
                    total += summary;
                    offset = end;
                    self.sizer.succeeded();
                }
                Err(e) if e.is_transient() && self.sizer.failed() => {
                    log::warn!(
                        "Transient failure writing {} {}, retrying with chunk size {}: {}",
                        statement.len(),
                        statement.kind(),
                        self.sizer.size(),
                        e
                    );
                    self.report.retries += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(total)
    }
}
