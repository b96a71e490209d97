//! `depends_on` edges between File nodes.

use crate::store::{GraphStore, Statement};
use crate::types::{FileRecord, path_key};
use eyre::{Context, Result};
use std::path::PathBuf;

/// Link `file` to every stored File whose filepath is in `depends_on`.
///
/// Returns the number of edges created. Paths naming `file` itself are
/// dropped, and targets with no stored File node are skipped by the store.
pub fn link_dependencies<S: GraphStore + ?Sized>(
    store: &mut S,
    file: &FileRecord,
    depends_on: &[PathBuf],
) -> Result<u64> {
    let targets: Vec<String> = depends_on
        .iter()
        .map(|p| path_key(p))
        .filter(|t| *t != file.filepath)
        .collect();
    if targets.is_empty() {
        return Ok(0);
    }

    let summary = store
        .execute(&Statement::LinkDependencies {
            run: &file.run,
            targets: &targets,
        })
        .wrap_err_with(|| format!("Failed to link dependencies of {}", file.filepath))?;

    if (summary.relationships_created as usize) < targets.len() {
        log::warn!(
            "{}: {} of {} dependency targets linked",
            file.filepath,
            summary.relationships_created,
            targets.len()
        );
    } else {
        log::info!("{}: linked {} dependencies", file.filepath, summary.relationships_created);
    }
    Ok(summary.relationships_created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GraphStats, StoreError, WriteSummary};
    use crate::types::Attributes;
    use chrono::Utc;

    #[derive(Default)]
    struct Capture {
        targets: Vec<Vec<String>>,
    }

    impl GraphStore for Capture {
        fn execute(&mut self, statement: &Statement<'_>) -> Result<WriteSummary, StoreError> {
            if let Statement::LinkDependencies { targets, .. } = statement {
                self.targets.push(targets.to_vec());
            }
            Ok(WriteSummary {
                relationships_created: 1,
                ..WriteSummary::default()
            })
        }

        fn reset(&mut self) -> Result<(), StoreError> {
            Ok(())
        }

        fn stats(&mut self) -> Result<GraphStats, StoreError> {
            Ok(GraphStats::default())
        }
    }

    fn file(filepath: &str) -> FileRecord {
        FileRecord {
            name: "b.h5".into(),
            filepath: filepath.into(),
            run: "ig-0000000000".into(),
            ingested_at: Utc::now(),
            attributes: Attributes::new(),
        }
    }

    #[test]
    fn test_empty_list_is_noop() {
        let mut store = Capture::default();
        assert_eq!(link_dependencies(&mut store, &file("root/b.h5"), &[]).unwrap(), 0);
        assert!(store.targets.is_empty());
    }

    #[test]
    fn test_self_dropped() {
        let mut store = Capture::default();
        let deps = vec![PathBuf::from("root/a.h5"), PathBuf::from("root/b.h5")];

        let created = link_dependencies(&mut store, &file("root/b.h5"), &deps).unwrap();

        assert_eq!(created, 1);
        assert_eq!(store.targets, vec![vec!["root/a.h5".to_string()]]);
    }

    #[test]
    fn test_only_self_is_noop() {
        let mut store = Capture::default();
        let deps = vec![PathBuf::from("root/b.h5")];
        link_dependencies(&mut store, &file("root/b.h5"), &deps).unwrap();
        assert!(store.targets.is_empty());
    }
}
