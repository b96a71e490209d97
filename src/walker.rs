//! Pre-order traversal of a container tree into graph records.

use crate::coerce::coerce_dataset;
use crate::config::IngestConfig;
use crate::registry::Registry;
use crate::types::{
    Attributes, ContainerRecord, ContainerTree, LeafRecord, NodeClass, ObjectKind, PATH_SEPARATOR, Payload, TreeNode,
};

/// Counts gathered during one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub visited: usize,
    pub containers: usize,
    pub leaves: usize,
    /// Leaves whose payload did not coerce to a scalar.
    pub structural: usize,
    pub excluded: usize,
    /// Named datatypes and links.
    pub skipped: usize,
}

/// Classify a node by its declared kind.
pub fn classify(node: &TreeNode) -> NodeClass {
    match node.kind {
        ObjectKind::Group { .. } => NodeClass::Container,
        ObjectKind::Dataset(_) => NodeClass::Leaf,
        ObjectKind::NamedDatatype | ObjectKind::SoftLink { .. } => NodeClass::Other,
    }
}

/// Parent key of a node: the file name at root level, otherwise the containing path.
pub fn parent_key(path: &str, file_name: &str) -> String {
    match path.rsplit_once(PATH_SEPARATOR) {
        Some((prefix, _)) if !prefix.is_empty() => prefix.to_string(),
        _ => file_name.to_string(),
    }
}

/// Exclusion filters; each one suppresses only the node it matches.
struct Filters<'a> {
    datasets: &'a [String],
    groups: &'a [String],
    paths: &'a [String],
}

impl Filters<'_> {
    fn excludes(&self, class: NodeClass, node: &TreeNode) -> bool {
        let by_name = match class {
            NodeClass::Container => self.groups.iter().any(|g| *g == node.name),
            NodeClass::Leaf => self.datasets.iter().any(|d| *d == node.name),
            NodeClass::Other => false,
        };
        by_name || self.paths.iter().any(|p| node.path.contains(p.as_str()))
    }
}

/// Walk `tree` once and push its records into `registry`.
pub fn walk(tree: &ContainerTree, file_name: &str, config: &IngestConfig, registry: &mut Registry) -> WalkStats {
    let filters = Filters {
        datasets: &config.exclude_datasets,
        groups: &config.exclude_groups,
        paths: &config.exclude_paths,
    };
    let attributes = |node: &TreeNode| {
        if config.transfer_attributes {
            node.attributes.clone()
        } else {
            Attributes::new()
        }
    };

    let mut stats = WalkStats::default();
    let mut stack: Vec<&TreeNode> = tree.members.iter().rev().collect();

    while let Some(node) = stack.pop() {
        stats.visited += 1;
        let class = classify(node);

        if let ObjectKind::Group { children } = &node.kind {
            stack.extend(children.iter().rev());
        }

        if filters.excludes(class, node) {
            log::debug!("Excluded {}", node.path);
            stats.excluded += 1;
            continue;
        }

        match (&node.kind, class) {
            (ObjectKind::Group { .. }, NodeClass::Container) => {
                registry.push_container(ContainerRecord {
                    name: node.name.clone(),
                    hdf5_path: node.path.clone(),
                    parent: parent_key(&node.path, file_name),
                    attributes: attributes(node),
                });
                stats.containers += 1;
            }
            (ObjectKind::Dataset(info), NodeClass::Leaf) => {
                if let Payload::Unreadable(reason) = &info.payload {
                    log::warn!("Unreadable dataset {}: {}", node.path, reason);
                }
                let value = coerce_dataset(info);
                if value.is_none() {
                    stats.structural += 1;
                }
                registry.push_leaf(LeafRecord {
                    name: node.name.clone(),
                    hdf5_path: node.path.clone(),
                    parent: parent_key(&node.path, file_name),
                    value,
                    attributes: attributes(node),
                });
                stats.leaves += 1;
            }
            _ => {
                log::debug!("Skipping {} ({:?})", node.path, class);
                stats.skipped += 1;
            }
        }
    }

    stats
}
