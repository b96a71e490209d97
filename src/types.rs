//! Core data types for h5graph: container trees, scalar values and graph records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Path separator inside a container.
pub const PATH_SEPARATOR: char = '/';

/// A primitive the graph store accepts as a property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Key used to deduplicate value-bearing datasets.
    ///
    /// Numerically equal integers and floats share a key, matching the
    /// store's property equality.
    pub fn identity_key(&self) -> String {
        match self {
            Value::Bool(b) => format!("b:{}", b),
            Value::Int(i) => format!("n:{}", i),
            Value::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
                    format!("n:{}", *f as i64)
                } else {
                    format!("n:{}", f)
                }
            }
            Value::Text(s) => format!("s:{}", s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Key/value attributes copied from a source node.
pub type Attributes = BTreeMap<String, Value>;

/// Declared element type of a dataset or attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Bool,
    Int,
    Uint,
    Float,
    /// Variable-length text.
    String,
    FixedString,
    Enum,
    Compound,
    Array,
    Opaque,
    Reference,
}

impl DataType {
    /// Returns true for the text element types.
    pub fn is_text(&self) -> bool {
        matches!(self, DataType::String | DataType::FixedString)
    }
}

/// A single element as read from a container, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawScalar {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// What the reader managed to load for a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Null dataspace: the dataset has no extent at all.
    Empty,
    /// The single element of a scalar dataset.
    Scalar(RawScalar),
    /// Elements of a non-scalar dataset; never loaded.
    Unread,
    /// The reader failed to load the element.
    Unreadable(String),
}

/// Shape, type and payload of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetInfo {
    pub dtype: DataType,
    /// Empty for a true scalar.
    pub shape: Vec<usize>,
    pub payload: Payload,
}

/// Declared object kind of a node in the container tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Group { children: Vec<TreeNode> },
    Dataset(DatasetInfo),
    NamedDatatype,
    SoftLink { target: String },
}

/// A named node of a container tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Last path segment.
    pub name: String,
    /// Full path inside the container, e.g. "/A/B".
    pub path: String,
    pub attributes: Attributes,
    pub kind: ObjectKind,
}

/// A fully materialized container file.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerTree {
    pub filepath: PathBuf,
    /// Attributes of the root group.
    pub attributes: Attributes,
    /// Direct children of the root group.
    pub members: Vec<TreeNode>,
}

impl ContainerTree {
    /// The file name used as parent key for root-level nodes.
    pub fn file_name(&self) -> String {
        file_name(&self.filepath)
    }
}

/// Last component of a path, or the whole path when it has none.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// The string stored as `filepath` on File nodes and matched by dependency links.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Count of path separators in a container path.
pub fn depth(hdf5_path: &str) -> usize {
    hdf5_path.matches(PATH_SEPARATOR).count()
}

/// Classification of a tree node for the walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    Container,
    Leaf,
    Other,
}

/// The File node of one ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub name: String,
    pub filepath: String,
    /// Unique id of this ingestion run: "ig-" + 10 hex chars.
    pub run: String,
    pub ingested_at: DateTime<Utc>,
    pub attributes: Attributes,
}

/// A group to be written as a Group node.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRecord {
    pub name: String,
    pub hdf5_path: String,
    /// File name for root-level groups, otherwise the containing group's path.
    pub parent: String,
    pub attributes: Attributes,
}

impl ContainerRecord {
    pub fn depth(&self) -> usize {
        depth(&self.hdf5_path)
    }
}

/// A dataset to be written as a Dataset node.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafRecord {
    pub name: String,
    pub hdf5_path: String,
    pub parent: String,
    /// None for structural datasets.
    pub value: Option<Value>,
    pub attributes: Attributes,
}

impl LeafRecord {
    /// Value-bearing datasets are shared by (name, value).
    pub fn is_value_bearing(&self) -> bool {
        self.value.is_some()
    }
}
