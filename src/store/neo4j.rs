//! Neo4j backend over bolt.
//!
//! Statements run as parameterized Cypher on a private tokio runtime, one
//! blocking call per statement. Created counts come from the store totals
//! before and after the write, so they are approximate when other clients
//! write concurrently.

use super::{GraphStats, GraphStore, Statement, StoreError, WriteSummary, cypher};
use crate::config::StoreConfig;
use crate::types::{Attributes, ContainerRecord, LeafRecord, Value};
use neo4rs::{BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph, Query};
use std::time::Instant;
use tokio::runtime::Runtime;

const TOTALS: [&str; 2] = ["nodes", "rels"];

/// Graph store backed by a Neo4j server.
pub struct Neo4jStore {
    runtime: Runtime,
    graph: Graph,
}

impl Neo4jStore {
    /// Connect and verify that the server answers.
    pub fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let connection_error = |reason: String| StoreError::Connection {
            uri: config.uri.clone(),
            reason,
        };

        let runtime = Runtime::new().map_err(|e| StoreError::Backend(e.to_string()))?;
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.username)
            .password(&config.password)
            .db(config.database.as_str())
            .build()
            .map_err(|e| connection_error(e.to_string()))?;
        let graph = {
            let _guard = runtime.enter();
            Graph::connect(neo_config).map_err(|e| connection_error(e.to_string()))?
        };

        runtime
            .block_on(graph.run(Query::new("RETURN 1".to_string())))
            .map_err(|e| connection_error(e.to_string()))?;

        let store = Self { runtime, graph };
        for index in cypher::SCHEMA {
            store.run(Query::new(index.to_string()))?;
        }

        log::info!("Connected to {}", config.uri);
        Ok(store)
    }

    fn run(&self, query: Query) -> Result<(), StoreError> {
        self.runtime.block_on(self.graph.run(query)).map_err(classify)
    }

    /// Fetch a single row of integer columns.
    fn fetch_counts(&self, query: &str, columns: &[&str]) -> Result<Vec<u64>, StoreError> {
        self.runtime.block_on(async {
            let mut rows = self.graph.execute(Query::new(query.to_string())).await.map_err(classify)?;
            let Some(row) = rows.next().await.map_err(classify)? else {
                return Ok(vec![0; columns.len()]);
            };
            columns
                .iter()
                .map(|column| {
                    row.get::<i64>(column)
                        .map(|n| n as u64)
                        .map_err(|e| StoreError::Backend(e.to_string()))
                })
                .collect()
        })
    }
}

/// Bind a statement's values to its template.
fn bind(statement: &Statement<'_>) -> Query {
    let query = Query::new(cypher::template(statement));
    match statement {
        Statement::CreateFile(file) => query
            .param("name", file.name.as_str())
            .param("filepath", file.filepath.as_str())
            .param("run", file.run.as_str())
            .param("ingested_at", file.ingested_at.to_rfc3339())
            .param("attrs", bolt_map(&file.attributes)),
        Statement::CreateGroups { run, rows } => query
            .param("run", *run)
            .param("rows", bolt_list(rows.iter().map(group_row))),
        Statement::WriteDatasets { run, rows } => query
            .param("run", *run)
            .param("rows", bolt_list(rows.iter().map(dataset_row))),
        Statement::LinkDependencies { run, targets } => query
            .param("run", *run)
            .param("targets", bolt_list(targets.iter().map(|t| BoltType::from(t.as_str())))),
    }
}

fn group_row(row: &ContainerRecord) -> BoltType {
    let mut map = BoltMap::new();
    map.put(BoltString::from("name"), BoltType::from(row.name.as_str()));
    map.put(BoltString::from("hdf5_path"), BoltType::from(row.hdf5_path.as_str()));
    map.put(BoltString::from("parent"), BoltType::from(row.parent.as_str()));
    map.put(BoltString::from("attrs"), bolt_map(&row.attributes));
    BoltType::Map(map)
}

fn dataset_row(row: &LeafRecord) -> BoltType {
    let mut map = BoltMap::new();
    map.put(BoltString::from("name"), BoltType::from(row.name.as_str()));
    map.put(BoltString::from("hdf5_path"), BoltType::from(row.hdf5_path.as_str()));
    map.put(BoltString::from("parent"), BoltType::from(row.parent.as_str()));
    let value = row.value.as_ref().map(bolt_value).unwrap_or(BoltType::Null(BoltNull));
    map.put(BoltString::from("value"), value);
    map.put(BoltString::from("attrs"), bolt_map(&row.attributes));
    BoltType::Map(map)
}

fn bolt_list(items: impl Iterator<Item = BoltType>) -> BoltType {
    let mut list = BoltList::new();
    for item in items {
        list.push(item);
    }
    BoltType::List(list)
}

fn bolt_map(attributes: &Attributes) -> BoltType {
    let mut map = BoltMap::new();
    for (key, value) in attributes {
        map.put(BoltString::from(key.as_str()), bolt_value(value));
    }
    BoltType::Map(map)
}

fn bolt_value(value: &Value) -> BoltType {
    match value {
        Value::Bool(b) => BoltType::from(*b),
        Value::Int(i) => BoltType::from(*i),
        Value::Float(f) => BoltType::from(*f),
        Value::Text(s) => BoltType::from(s.as_str()),
    }
}

/// Created counts from the totals around a committed write.
///
/// The write cannot be undone once it committed, so a failed re-count only
/// loses the numbers; it never surfaces as an error the writer would retry.
fn created(before: &[u64], after: Result<Vec<u64>, StoreError>) -> (u64, u64) {
    match after {
        Ok(after) => (
            after[0].saturating_sub(before[0]),
            after[1].saturating_sub(before[1]),
        ),
        Err(e) => {
            log::warn!("Write committed but totals could not be re-read, reporting zero created: {}", e);
            (0, 0)
        }
    }
}

/// Neo4j reports overload and lock timeouts as `Neo.TransientError.*`.
fn classify(e: neo4rs::Error) -> StoreError {
    let message = e.to_string();
    if message.contains("TransientError") {
        StoreError::Transient(message)
    } else {
        StoreError::Backend(message)
    }
}

impl GraphStore for Neo4jStore {
    fn execute(&mut self, statement: &Statement<'_>) -> Result<WriteSummary, StoreError> {
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", cypher::render(statement));
        }

        let start = Instant::now();
        let before = self.fetch_counts(cypher::COUNT_ALL, &TOTALS)?;
        self.run(bind(statement))?;
        let elapsed = start.elapsed();
        let (nodes_created, relationships_created) = created(&before, self.fetch_counts(cypher::COUNT_ALL, &TOTALS));

        Ok(WriteSummary {
            nodes_created,
            relationships_created,
            elapsed,
        })
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        self.run(Query::new(cypher::RESET.to_string()))
    }

    fn stats(&mut self) -> Result<GraphStats, StoreError> {
        let counts = self.fetch_counts(cypher::STATS, &["files", "groups", "datasets", "holds", "depends_on"])?;
        Ok(GraphStats {
            files: counts[0],
            groups: counts[1],
            datasets: counts[2],
            holds: counts[3],
            depends_on: counts[4],
        })
    }
}
