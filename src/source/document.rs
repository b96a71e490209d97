//! Container documents: a JSON/YAML description of an HDF5-style tree.
//!
//! ```yaml
//! attributes: {creator: sim}
//! members:
//!   - {kind: dataset, name: x, dtype: int, data: 5}
//!   - {kind: dataset, name: y, dtype: float, shape: [3], data: [1.0, 2.0, 3.0]}
//!   - kind: group
//!     name: A
//!     members:
//!       - {kind: dataset, name: z, dtype: string, data: ok}
//! ```

use super::SourceError;
use crate::coerce::coerce_attribute;
use crate::types::{Attributes, ContainerTree, DataType, DatasetInfo, ObjectKind, Payload, RawScalar, TreeNode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

type RawAttributes = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    attributes: RawAttributes,
    #[serde(default)]
    members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Member {
    Group {
        name: String,
        #[serde(default)]
        attributes: RawAttributes,
        #[serde(default)]
        members: Vec<Member>,
    },
    Dataset {
        name: String,
        dtype: DataType,
        #[serde(default)]
        shape: Vec<usize>,
        #[serde(default)]
        data: Option<serde_json::Value>,
        #[serde(default)]
        attributes: RawAttributes,
    },
    Datatype {
        name: String,
    },
    SoftLink {
        name: String,
        target: String,
    },
}

impl Member {
    fn name(&self) -> &str {
        match self {
            Member::Group { name, .. }
            | Member::Dataset { name, .. }
            | Member::Datatype { name }
            | Member::SoftLink { name, .. } => name,
        }
    }
}

/// Read a JSON container document.
pub fn read_json(path: &Path) -> Result<ContainerTree, SourceError> {
    let text = read_text(path)?;
    let doc: Document = serde_json::from_str(&text).map_err(|e| SourceError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    into_tree(path, doc)
}

/// Read a YAML container document.
pub fn read_yaml(path: &Path) -> Result<ContainerTree, SourceError> {
    let text = read_text(path)?;
    let doc: Document = serde_yaml::from_str(&text).map_err(|e| SourceError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    into_tree(path, doc)
}

fn read_text(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn into_tree(path: &Path, doc: Document) -> Result<ContainerTree, SourceError> {
    let members = build_members(doc.members, "").map_err(|reason| SourceError::Malformed {
        path: path.to_path_buf(),
        reason,
    })?;

    Ok(ContainerTree {
        filepath: path.to_path_buf(),
        attributes: convert_attributes(&doc.attributes),
        members,
    })
}

fn build_members(members: Vec<Member>, prefix: &str) -> Result<Vec<TreeNode>, String> {
    let mut nodes = Vec::with_capacity(members.len());
    for member in members {
        let name = member.name().to_string();
        if name.is_empty() || name.contains('/') {
            return Err(format!("invalid member name {:?} under {:?}", name, prefix));
        }
        let path = format!("{}/{}", prefix, name);

        let (attributes, kind) = match member {
            Member::Group {
                attributes, members, ..
            } => {
                let children = build_members(members, &path)?;
                (convert_attributes(&attributes), ObjectKind::Group { children })
            }
            Member::Dataset {
                dtype,
                shape,
                data,
                attributes,
                ..
            } => {
                let payload = dataset_payload(&shape, data.as_ref());
                (
                    convert_attributes(&attributes),
                    ObjectKind::Dataset(DatasetInfo { dtype, shape, payload }),
                )
            }
            Member::Datatype { .. } => (Attributes::new(), ObjectKind::NamedDatatype),
            Member::SoftLink { target, .. } => (Attributes::new(), ObjectKind::SoftLink { target }),
        };

        nodes.push(TreeNode {
            name,
            path,
            attributes,
            kind,
        });
    }
    Ok(nodes)
}

fn dataset_payload(shape: &[usize], data: Option<&serde_json::Value>) -> Payload {
    if !shape.is_empty() {
        return Payload::Unread;
    }
    match data {
        None | Some(serde_json::Value::Null) => Payload::Empty,
        Some(value) => match raw_from_json(value) {
            Some(raw) => Payload::Scalar(raw),
            None => Payload::Unreadable(format!("expected a scalar, found {}", value)),
        },
    }
}

fn raw_from_json(value: &serde_json::Value) -> Option<RawScalar> {
    match value {
        serde_json::Value::Bool(b) => Some(RawScalar::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(RawScalar::Int(i))
            } else if let Some(u) = n.as_u64() {
                Some(RawScalar::Uint(u))
            } else {
                n.as_f64().map(RawScalar::Float)
            }
        }
        serde_json::Value::String(s) => Some(RawScalar::Text(s.clone())),
        _ => None,
    }
}

fn convert_attributes(raw: &RawAttributes) -> Attributes {
    raw.iter()
        .filter_map(|(key, value)| match raw_from_json(value).as_ref().and_then(coerce_attribute) {
            Some(v) => Some((key.clone(), v)),
            None => {
                log::debug!("Skipping non-scalar attribute {}", key);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_read_yaml_nested() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "nested.yaml",
            r#"
attributes: {creator: sim}
members:
  - kind: group
    name: A
    attributes: {step: 3}
    members:
      - kind: group
        name: B
        members:
          - {kind: dataset, name: z, dtype: string, data: ok}
"#,
        );

        let tree = read_yaml(&path).unwrap();
        assert_eq!(tree.attributes.get("creator"), Some(&Value::Text("sim".into())));
        assert_eq!(tree.members.len(), 1);

        let a = &tree.members[0];
        assert_eq!(a.path, "/A");
        assert_eq!(a.attributes.get("step"), Some(&Value::Int(3)));
        let ObjectKind::Group { children } = &a.kind else {
            panic!("expected group");
        };
        let ObjectKind::Group { children } = &children[0].kind else {
            panic!("expected group");
        };
        assert_eq!(children[0].path, "/A/B/z");
        assert!(matches!(
            &children[0].kind,
            ObjectKind::Dataset(DatasetInfo { payload: Payload::Scalar(RawScalar::Text(s)), .. }) if s == "ok"
        ));
    }

    #[test]
    fn test_read_json_payloads() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "payloads.json",
            r#"{"members": [
                {"kind": "dataset", "name": "x", "dtype": "int", "data": 5},
                {"kind": "dataset", "name": "y", "dtype": "float", "shape": [3], "data": [1, 2, 3]},
                {"kind": "dataset", "name": "e", "dtype": "int"},
                {"kind": "dataset", "name": "bad", "dtype": "int", "data": {"nested": true}},
                {"kind": "datatype", "name": "T"},
                {"kind": "soft_link", "name": "alias", "target": "/x"}
            ]}"#,
        );

        let tree = read_json(&path).unwrap();
        let payloads: Vec<_> = tree
            .members
            .iter()
            .map(|m| match &m.kind {
                ObjectKind::Dataset(info) => Some(info.payload.clone()),
                _ => None,
            })
            .collect();

        assert_eq!(payloads[0], Some(Payload::Scalar(RawScalar::Int(5))));
        assert_eq!(payloads[1], Some(Payload::Unread));
        assert_eq!(payloads[2], Some(Payload::Empty));
        assert!(matches!(payloads[3], Some(Payload::Unreadable(_))));
        assert_eq!(tree.members[4].kind, ObjectKind::NamedDatatype);
        assert_eq!(
            tree.members[5].kind,
            ObjectKind::SoftLink {
                target: "/x".into()
            }
        );
    }

    #[test]
    fn test_non_scalar_attributes_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "attrs.json", r#"{"attributes": {"units": "m", "dims": [1, 2]}}"#);

        let tree = read_json(&path).unwrap();
        assert_eq!(tree.attributes.len(), 1);
        assert!(tree.attributes.contains_key("units"));
    }

    #[test]
    fn test_invalid_member_name_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "bad.json",
            r#"{"members": [{"kind": "dataset", "name": "a/b", "dtype": "int", "data": 1}]}"#,
        );

        assert!(matches!(read_json(&path), Err(SourceError::Malformed { .. })));
    }

    #[test]
    fn test_unknown_dtype_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "dtype.json",
            r#"{"members": [{"kind": "dataset", "name": "a", "dtype": "complex128"}]}"#,
        );

        assert!(matches!(read_json(&path), Err(SourceError::Malformed { .. })));
    }
}
