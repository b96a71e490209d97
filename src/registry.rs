//! Per-file accumulation of records between the read and write phases.

use crate::types::{ContainerRecord, LeafRecord};
use std::collections::BTreeMap;

/// Records collected by the walker for one file.
///
/// No deduplication happens here; the writer and the store own that policy.
/// A registry is created per ingestion call and consumed by the writer.
#[derive(Debug, Default)]
pub struct Registry {
    containers: Vec<ContainerRecord>,
    leaves: Vec<LeafRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_container(&mut self, record: ContainerRecord) {
        self.containers.push(record);
    }

    pub fn push_leaf(&mut self, record: LeafRecord) {
        self.leaves.push(record);
    }

    pub fn containers(&self) -> &[ContainerRecord] {
        &self.containers
    }

    pub fn leaves(&self) -> &[LeafRecord] {
        &self.leaves
    }

    pub fn len(&self) -> usize {
        self.containers.len() + self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split into container levels keyed by ascending depth, plus all leaves.
    pub fn into_levels(self) -> (BTreeMap<usize, Vec<ContainerRecord>>, Vec<LeafRecord>) {
        let mut levels: BTreeMap<usize, Vec<ContainerRecord>> = BTreeMap::new();
        for record in self.containers {
            levels.entry(record.depth()).or_default().push(record);
        }
        (levels, self.leaves)
    }
}
