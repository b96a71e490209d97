//! Cypher for write statements.
//!
//! [`template`] gives the parameterized query a backend executes, with the
//! rows bound as `$rows`. The text only depends on the statement kind, so the
//! server plans it once. [`render`] inlines the rows as literals for
//! inspection.

use super::Statement;
use crate::types::{Attributes, ContainerRecord, FileRecord, LeafRecord, Value};
use std::borrow::Cow;

/// Delete every node and relationship.
pub const RESET: &str = "MATCH (n) DETACH DELETE n";

/// Total node and relationship counts.
pub const COUNT_ALL: &str = "CALL { MATCH (n) RETURN count(n) AS nodes } \
     CALL { MATCH ()-[r]->() RETURN count(r) AS rels } \
     RETURN nodes, rels";

/// Counts by label and relationship type.
pub const STATS: &str = "CALL { MATCH (n:File) RETURN count(n) AS files } \
     CALL { MATCH (n:Group) RETURN count(n) AS groups } \
     CALL { MATCH (n:Dataset) RETURN count(n) AS datasets } \
     CALL { MATCH ()-[r:holds]->() RETURN count(r) AS holds } \
     CALL { MATCH ()-[r:depends_on]->() RETURN count(r) AS depends_on } \
     RETURN files, groups, datasets, holds, depends_on";

/// Indexes backing the parent, dependency and shared-dataset lookups.
pub const SCHEMA: &[&str] = &[
    "CREATE INDEX group_run_path IF NOT EXISTS FOR (g:Group) ON (g.run, g.hdf5_path)",
    "CREATE INDEX file_run_name IF NOT EXISTS FOR (f:File) ON (f.run, f.name)",
    "CREATE INDEX file_filepath IF NOT EXISTS FOR (f:File) ON (f.filepath)",
    "CREATE INDEX dataset_name_value IF NOT EXISTS FOR (d:Dataset) ON (d.name, d.value)",
];

const CREATE_FILE: &str = "CREATE (f:File {name: $name, filepath: $filepath, run: $run, ingested_at: $ingested_at})
SET f += $attrs";

const MATCH_PARENT: &str = "OPTIONAL MATCH (p:File|Group {run: run}) \
     WHERE (p:File AND p.name = entry.parent) OR (p:Group AND p.hdf5_path = entry.parent)";

const CREATE_GROUPS: &str = "CREATE (g:Group {name: entry.name, hdf5_path: entry.hdf5_path, run: run})
SET g += entry.attrs
FOREACH (ignoreMe IN CASE WHEN p IS NULL THEN [] ELSE [1] END | CREATE (p)-[:holds]->(g))";

const WRITE_DATASETS: &str = "FOREACH (ignoreMe IN CASE WHEN entry.value IS NULL THEN [1] ELSE [] END |
    CREATE (d:Dataset {name: entry.name, hdf5_path: entry.hdf5_path, run: run})
    SET d += entry.attrs
    FOREACH (linkMe IN CASE WHEN p IS NULL THEN [] ELSE [1] END | CREATE (p)-[:holds]->(d))
)
FOREACH (ignoreMe IN CASE WHEN entry.value IS NOT NULL THEN [1] ELSE [] END |
    MERGE (d:Dataset {name: entry.name, value: entry.value})
        ON CREATE SET d.hdf5_path = entry.hdf5_path, d += entry.attrs
    FOREACH (linkMe IN CASE WHEN p IS NULL THEN [] ELSE [1] END | MERGE (p)-[:holds]->(d))
)";

const LINK_DEPENDENCIES: &str = "MATCH (f:File {run: run}), (c:File {filepath: path})
WHERE c <> f
MERGE (f)-[:depends_on]->(c)";

/// Parameterized query for a statement.
///
/// Files bind `$name`, `$filepath`, `$run`, `$ingested_at` and `$attrs`.
/// Groups and datasets bind `$run` and `$rows`; dependencies bind `$run` and
/// `$targets`.
pub fn template(statement: &Statement<'_>) -> String {
    match statement {
        Statement::CreateFile(_) => CREATE_FILE.to_string(),
        Statement::CreateGroups { .. } => unwind("$run", "$rows", "entry", &[MATCH_PARENT, CREATE_GROUPS]),
        Statement::WriteDatasets { .. } => unwind("$run", "$rows", "entry", &[MATCH_PARENT, WRITE_DATASETS]),
        Statement::LinkDependencies { .. } => unwind("$run", "$targets", "path", &[LINK_DEPENDENCIES]),
    }
}

/// Render a statement as a self-contained query with inline literals.
pub fn render(statement: &Statement<'_>) -> String {
    match statement {
        Statement::CreateFile(file) => render_file(file),
        Statement::CreateGroups { run, rows } => {
            let rows: Vec<String> = rows.iter().map(group_row).collect();
            let list = format!("[{}]", rows.join(", "));
            unwind(&quote_string(run), &list, "entry", &[MATCH_PARENT, CREATE_GROUPS])
        }
        Statement::WriteDatasets { run, rows } => {
            let rows: Vec<String> = rows.iter().map(dataset_row).collect();
            let list = format!("[{}]", rows.join(", "));
            unwind(&quote_string(run), &list, "entry", &[MATCH_PARENT, WRITE_DATASETS])
        }
        Statement::LinkDependencies { run, targets } => {
            let targets: Vec<String> = targets.iter().map(|t| quote_string(t)).collect();
            let list = format!("[{}]", targets.join(", "));
            unwind(&quote_string(run), &list, "path", &[LINK_DEPENDENCIES])
        }
    }
}

fn unwind(run: &str, list: &str, alias: &str, body: &[&str]) -> String {
    format!("WITH {} AS run\nUNWIND {} AS {}\n{}", run, list, alias, body.join("\n"))
}

fn render_file(file: &FileRecord) -> String {
    format!(
        "CREATE (f:File {{name: {}, filepath: {}, run: {}, ingested_at: {}}})\nSET f += {}",
        quote_string(&file.name),
        quote_string(&file.filepath),
        quote_string(&file.run),
        quote_string(&file.ingested_at.to_rfc3339()),
        map_literal(&file.attributes)
    )
}

fn group_row(row: &ContainerRecord) -> String {
    format!(
        "{{name: {}, hdf5_path: {}, parent: {}, attrs: {}}}",
        quote_string(&row.name),
        quote_string(&row.hdf5_path),
        quote_string(&row.parent),
        map_literal(&row.attributes)
    )
}

fn dataset_row(row: &LeafRecord) -> String {
    format!(
        "{{name: {}, hdf5_path: {}, parent: {}, value: {}, attrs: {}}}",
        quote_string(&row.name),
        quote_string(&row.hdf5_path),
        quote_string(&row.parent),
        row.value.as_ref().map(literal).unwrap_or_else(|| "null".to_string()),
        map_literal(&row.attributes)
    )
}

/// Cypher literal for a property value.
pub fn literal(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => {
            if f.is_nan() {
                "0.0/0.0".to_string()
            } else if f.is_infinite() {
                let s = if *f > 0.0 { "1.0/0.0" } else { "-1.0/0.0" };
                s.to_string()
            } else {
                let s = f.to_string();
                if s.contains('.') || s.contains('e') || s.contains('E') {
                    s
                } else {
                    format!("{}.0", s)
                }
            }
        }
        Value::Text(s) => quote_string(s),
    }
}

/// Map literal with every key backtick-quoted.
fn map_literal(attributes: &Attributes) -> String {
    let pairs: Vec<String> = attributes
        .iter()
        .map(|(k, v)| format!("`{}`: {}", k.replace('`', "``"), literal(v)))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

fn escape_string(s: &str) -> Cow<'_, str> {
    if !s.chars().any(|c| matches!(c, '\\' | '\'' | '"' | '\n' | '\r' | '\t' | '\0')) {
        return Cow::Borrowed(s);
    }

    let mut escaped = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\0' => escaped.push_str("\\u0000"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Quote a string for Cypher with single quotes.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", escape_string(s))
}
