//! Embedded property graph on SQLite.
//!
//! Nodes and edges live in two tables. Each statement runs in its own
//! transaction, so a chunk is either fully written or not at all.

use super::{GraphStats, GraphStore, Statement, StoreError, WriteSummary};
use crate::types::{Attributes, ContainerRecord, FileRecord, LeafRecord, Value};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Transaction, params};
use std::path::Path;
use std::time::{Duration, Instant};

/// How long to wait on a locked database before reporting a transient failure.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => StoreError::Transient(e.to_string()),
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

/// A node as persisted, for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredNode {
    pub id: i64,
    pub label: String,
    pub name: String,
    pub hdf5_path: Option<String>,
    pub filepath: Option<String>,
    pub run: Option<String>,
    pub value: Option<Value>,
    pub attributes: Attributes,
}

/// Graph store backed by a SQLite database file.
pub struct SqliteStore {
    db: Connection,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = Connection::open(path).map_err(|e| StoreError::Connection {
            uri: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::with_connection(db)
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db = Connection::open_in_memory().map_err(|e| StoreError::Connection {
            uri: ":memory:".to_string(),
            reason: e.to_string(),
        })?;
        Self::with_connection(db)
    }

    fn with_connection(db: Connection) -> Result<Self, StoreError> {
        db.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self { db };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize SQLite schema.
    fn init_schema(&self) -> Result<(), StoreError> {
        self.db.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                label TEXT NOT NULL CHECK (label IN ('File', 'Group', 'Dataset')),
                name TEXT NOT NULL,
                hdf5_path TEXT,
                filepath TEXT,
                run TEXT,
                ingested_at TEXT,
                value TEXT,
                value_key TEXT,
                attrs TEXT NOT NULL DEFAULT '{}'
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_identity
                ON nodes(name, value_key) WHERE label = 'Dataset' AND value_key IS NOT NULL;
            CREATE INDEX IF NOT EXISTS idx_nodes_run_path ON nodes(run, hdf5_path);
            CREATE INDEX IF NOT EXISTS idx_nodes_filepath ON nodes(filepath);

            CREATE TABLE IF NOT EXISTS edges (
                src INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
                dst INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
                kind TEXT NOT NULL CHECK (kind IN ('holds', 'depends_on')),
                PRIMARY KEY (src, dst, kind)
            );
            CREATE INDEX IF NOT EXISTS idx_edges_dst ON edges(dst);
        "#,
        )?;
        Ok(())
    }

    fn create_file(&mut self, file: &FileRecord) -> Result<WriteSummary, StoreError> {
        let tx = self.db.transaction()?;
        tx.execute(
            r#"
            INSERT INTO nodes (label, name, filepath, run, ingested_at, attrs)
            VALUES ('File', ?, ?, ?, ?, ?)
            "#,
            params![
                file.name,
                file.filepath,
                file.run,
                file.ingested_at.to_rfc3339(),
                attrs_json(&file.attributes)?,
            ],
        )?;
        tx.commit()?;

        Ok(WriteSummary {
            nodes_created: 1,
            ..WriteSummary::default()
        })
    }

    fn create_groups(&mut self, run: &str, rows: &[ContainerRecord]) -> Result<WriteSummary, StoreError> {
        let tx = self.db.transaction()?;
        let mut summary = WriteSummary::default();

        for row in rows {
            tx.execute(
                r#"
                INSERT INTO nodes (label, name, hdf5_path, run, attrs)
                VALUES ('Group', ?, ?, ?, ?)
                "#,
                params![row.name, row.hdf5_path, run, attrs_json(&row.attributes)?],
            )?;
            let id = tx.last_insert_rowid();
            summary.nodes_created += 1;

            match find_parent(&tx, run, &row.parent)? {
                Some(parent) => summary.relationships_created += insert_edge(&tx, parent, id, "holds")?,
                None => log::warn!("No parent {} for group {}; holds edge omitted", row.parent, row.hdf5_path),
            }
        }

        tx.commit()?;
        Ok(summary)
    }

    fn write_datasets(&mut self, run: &str, rows: &[LeafRecord]) -> Result<WriteSummary, StoreError> {
        let tx = self.db.transaction()?;
        let mut summary = WriteSummary::default();

        for row in rows {
            let id = match &row.value {
                Some(value) => {
                    let key = value.identity_key();
                    let existing: Option<i64> = tx
                        .query_row(
                            "SELECT id FROM nodes WHERE label = 'Dataset' AND name = ? AND value_key = ?",
                            params![row.name, key],
                            |r| r.get(0),
                        )
                        .optional()?;

                    match existing {
                        Some(id) => id,
                        None => {
                            let value_json =
                                serde_json::to_string(value).map_err(|e| StoreError::Backend(e.to_string()))?;
                            tx.execute(
                                r#"
                                INSERT INTO nodes (label, name, hdf5_path, value, value_key, attrs)
                                VALUES ('Dataset', ?, ?, ?, ?, ?)
                                "#,
                                params![row.name, row.hdf5_path, value_json, key, attrs_json(&row.attributes)?],
                            )?;
                            summary.nodes_created += 1;
                            tx.last_insert_rowid()
                        }
                    }
                }
                None => {
                    tx.execute(
                        r#"
                        INSERT INTO nodes (label, name, hdf5_path, run, attrs)
                        VALUES ('Dataset', ?, ?, ?, ?)
                        "#,
                        params![row.name, row.hdf5_path, run, attrs_json(&row.attributes)?],
                    )?;
                    summary.nodes_created += 1;
                    tx.last_insert_rowid()
                }
            };

            match find_parent(&tx, run, &row.parent)? {
                Some(parent) => summary.relationships_created += insert_edge(&tx, parent, id, "holds")?,
                None => log::warn!("No parent {} for dataset {}; holds edge omitted", row.parent, row.hdf5_path),
            }
        }

        tx.commit()?;
        Ok(summary)
    }

    fn link_dependencies(&mut self, run: &str, targets: &[String]) -> Result<WriteSummary, StoreError> {
        let tx = self.db.transaction()?;
        let mut summary = WriteSummary::default();

        let own: Option<i64> = tx
            .query_row("SELECT id FROM nodes WHERE label = 'File' AND run = ?", params![run], |r| {
                r.get(0)
            })
            .optional()?;
        let Some(own) = own else {
            log::warn!("No File node for run {}; dependencies skipped", run);
            return Ok(summary);
        };

        for target in targets {
            let ids: Vec<i64> = {
                let mut stmt = tx.prepare("SELECT id FROM nodes WHERE label = 'File' AND filepath = ? AND id != ?")?;
                let rows = stmt.query_map(params![target, own], |r| r.get(0))?;
                let ids = rows.collect::<Result<Vec<i64>, _>>()?;
                ids
            };

            if ids.is_empty() {
                log::warn!("No File node with filepath {}; dependency skipped", target);
            }
            for id in ids {
                summary.relationships_created += insert_edge(&tx, own, id, "depends_on")?;
            }
        }

        tx.commit()?;
        Ok(summary)
    }

    /// All nodes with the given label, in creation order.
    pub fn nodes_with_label(&self, label: &str) -> Result<Vec<StoredNode>, StoreError> {
        self.query_nodes(&format!("{} WHERE label = ? ORDER BY id", SELECT_NODE), params![label])
    }

    /// Dataset nodes with the given name.
    pub fn datasets_named(&self, name: &str) -> Result<Vec<StoredNode>, StoreError> {
        self.query_nodes(
            &format!("{} WHERE label = 'Dataset' AND name = ? ORDER BY id", SELECT_NODE),
            params![name],
        )
    }

    /// The Group node of a run at the given path.
    pub fn group(&self, run: &str, hdf5_path: &str) -> Result<Option<StoredNode>, StoreError> {
        let mut nodes = self.query_nodes(
            &format!("{} WHERE label = 'Group' AND run = ? AND hdf5_path = ?", SELECT_NODE),
            params![run, hdf5_path],
        )?;
        Ok(nodes.pop())
    }

    /// File nodes with the given filepath.
    pub fn files_at(&self, filepath: &str) -> Result<Vec<StoredNode>, StoreError> {
        self.query_nodes(
            &format!("{} WHERE label = 'File' AND filepath = ? ORDER BY id", SELECT_NODE),
            params![filepath],
        )
    }

    /// Nodes reached from `id` over `holds` edges.
    pub fn children(&self, id: i64) -> Result<Vec<StoredNode>, StoreError> {
        self.query_nodes(
            &format!(
                "{} WHERE id IN (SELECT dst FROM edges WHERE src = ? AND kind = 'holds') ORDER BY id",
                SELECT_NODE
            ),
            params![id],
        )
    }

    /// Nodes holding `id`.
    pub fn parents(&self, id: i64) -> Result<Vec<StoredNode>, StoreError> {
        self.query_nodes(
            &format!(
                "{} WHERE id IN (SELECT src FROM edges WHERE dst = ? AND kind = 'holds') ORDER BY id",
                SELECT_NODE
            ),
            params![id],
        )
    }

    /// File nodes that `id` depends on.
    pub fn dependencies(&self, id: i64) -> Result<Vec<StoredNode>, StoreError> {
        self.query_nodes(
            &format!(
                "{} WHERE id IN (SELECT dst FROM edges WHERE src = ? AND kind = 'depends_on') ORDER BY id",
                SELECT_NODE
            ),
            params![id],
        )
    }

    fn query_nodes(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<StoredNode>, StoreError> {
        let mut stmt = self.db.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_node)?;
        let nodes = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(nodes)
    }

    fn count(&self, sql: &str) -> Result<u64, StoreError> {
        let n: i64 = self.db.query_row(sql, [], |r| r.get(0))?;
        Ok(n as u64)
    }
}

impl GraphStore for SqliteStore {
    fn execute(&mut self, statement: &Statement<'_>) -> Result<WriteSummary, StoreError> {
        let start = Instant::now();
        let mut summary = match statement {
            Statement::CreateFile(file) => self.create_file(file)?,
            Statement::CreateGroups { run, rows } => self.create_groups(run, rows)?,
            Statement::WriteDatasets { run, rows } => self.write_datasets(run, rows)?,
            Statement::LinkDependencies { run, targets } => self.link_dependencies(run, targets)?,
        };
        summary.elapsed = start.elapsed();
        Ok(summary)
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        self.db.execute_batch(
            r#"
            DELETE FROM edges;
            DELETE FROM nodes;
        "#,
        )?;
        Ok(())
    }

    fn stats(&mut self) -> Result<GraphStats, StoreError> {
        Ok(GraphStats {
            files: self.count("SELECT COUNT(*) FROM nodes WHERE label = 'File'")?,
            groups: self.count("SELECT COUNT(*) FROM nodes WHERE label = 'Group'")?,
            datasets: self.count("SELECT COUNT(*) FROM nodes WHERE label = 'Dataset'")?,
            holds: self.count("SELECT COUNT(*) FROM edges WHERE kind = 'holds'")?,
            depends_on: self.count("SELECT COUNT(*) FROM edges WHERE kind = 'depends_on'")?,
        })
    }
}

const SELECT_NODE: &str = "SELECT id, label, name, hdf5_path, filepath, run, value, attrs FROM nodes";

fn row_to_node(row: &rusqlite::Row) -> rusqlite::Result<StoredNode> {
    let value: Option<String> = row.get(6)?;
    let attrs: String = row.get(7)?;
    Ok(StoredNode {
        id: row.get(0)?,
        label: row.get(1)?,
        name: row.get(2)?,
        hdf5_path: row.get(3)?,
        filepath: row.get(4)?,
        run: row.get(5)?,
        value: value.and_then(|v| serde_json::from_str(&v).ok()),
        attributes: serde_json::from_str(&attrs).unwrap_or_default(),
    })
}

/// The run's File node by name, or the run's Group node by full path.
fn find_parent(tx: &Transaction, run: &str, parent: &str) -> Result<Option<i64>, StoreError> {
    let id = tx
        .query_row(
            r#"
            SELECT id FROM nodes
            WHERE run = ?1
              AND ((label = 'File' AND name = ?2) OR (label = 'Group' AND hdf5_path = ?2))
            ORDER BY id
            LIMIT 1
            "#,
            params![run, parent],
            |r| r.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Insert an edge unless it already exists. Returns the number created.
fn insert_edge(tx: &Transaction, src: i64, dst: i64, kind: &str) -> Result<u64, StoreError> {
    let n = tx.execute(
        "INSERT OR IGNORE INTO edges (src, dst, kind) VALUES (?, ?, ?)",
        params![src, dst, kind],
    )?;
    Ok(n as u64)
}

fn attrs_json(attributes: &Attributes) -> Result<String, StoreError> {
    serde_json::to_string(attributes).map_err(|e| StoreError::Backend(e.to_string()))
}
