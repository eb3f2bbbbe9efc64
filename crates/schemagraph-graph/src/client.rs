//! The graph provider contract and the Neo4j-backed provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use schemagraph_core::config::{load_section, DEFAULT_ENV_PREFIX};

use crate::model::{EntityModel, SchemaError};
use crate::records;
use crate::statement::Params;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ── Record Sets ──────────────────────────────────────────────────

/// One result row, keyed by column name.
pub type Record = serde_json::Map<String, Value>;

/// Write counters for one statement, from the store's result summary when
/// the provider has one. [`records::update_stats`] also folds in counter
/// columns returned by the statement itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub nodes_created: u64,
    pub nodes_deleted: u64,
    pub relationships_created: u64,
    pub relationships_deleted: u64,
}

/// The raw result of executing one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub records: Vec<Record>,
    pub stats: UpdateStats,
}

/// Which counters [`GraphProvider::confirm_update`] inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Node,
    Relation,
}

// ── Provider Contract ────────────────────────────────────────────

/// The store behind every [`EntityModel`].
///
/// One provider is typically shared by many models. Implementations must be
/// safe to call concurrently; models issue one `query` per operation.
#[async_trait]
pub trait GraphProvider: Send + Sync {
    /// Execute one statement with its parameters.
    async fn query(&self, statement: &str, params: &Params) -> Result<RecordSet, GraphError>;

    /// Flatten each row into a plain property map.
    fn format_records(&self, set: &RecordSet) -> Vec<Record> {
        records::format_records(set)
    }

    /// True iff the statement created or deleted at least one entity of `kind`.
    fn confirm_update(&self, set: &RecordSet, kind: UpdateKind) -> bool {
        records::confirm_update(set, kind)
    }
}

// ── Neo4j ────────────────────────────────────────────────────────

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
    /// Log every statement and its parameter names from models built by the client.
    #[serde(default)]
    pub query_logs: bool,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "password".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
            query_logs: false,
        }
    }
}

impl GraphConfig {
    /// Load the `[neo4j]` section from `<file_prefix>.toml` and
    /// `SCHEMAGRAPH__NEO4J__*` environment variables.
    pub fn load(file_prefix: &str) -> Result<Self, GraphError> {
        load_section(file_prefix, DEFAULT_ENV_PREFIX, "neo4j")
            .map_err(|e| GraphError::Connection(e.to_string()))
    }
}

/// Thread-safe Neo4j client with connection pooling.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct Neo4jClient {
    graph: Graph,
    query_logs: bool,
}

impl Neo4jClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self {
            graph,
            query_logs: config.query_logs,
        })
    }

    /// Get a reference to the underlying neo4rs Graph for direct operations.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }

    /// Build a model for `label` backed by this client.
    pub fn model<P>(&self, label: &str) -> Result<EntityModel<P>, SchemaError>
    where
        P: Serialize + DeserializeOwned,
    {
        let provider: Arc<dyn GraphProvider> = Arc::new(self.clone());
        Ok(EntityModel::new(provider, label)?.with_query_logs(self.query_logs))
    }
}

#[async_trait]
impl GraphProvider for Neo4jClient {
    async fn query(&self, statement: &str, params: &Params) -> Result<RecordSet, GraphError> {
        let mut q = neo4rs::query(statement);
        for (key, value) in params {
            q = q.param(key, json_to_bolt(value)?);
        }

        let mut stream = self.graph.execute(q).await?;
        let mut records = Vec::new();
        while let Some(row) = stream.next().await? {
            let record: Record = row
                .to()
                .map_err(|e| GraphError::Serialization(format!("Failed to read row: {e}")))?;
            records.push(record);
        }

        // neo4rs 0.8 exposes no result summary; write statements return
        // their own counter columns instead
        Ok(RecordSet {
            records,
            stats: UpdateStats::default(),
        })
    }
}

/// Convert a JSON parameter into a Bolt value.
///
/// Bolt integers are signed 64-bit; larger integers are rejected rather
/// than rounded through a float.
fn json_to_bolt(value: &Value) -> Result<BoltType, GraphError> {
    Ok(match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                BoltType::from(i)
            } else if n.is_u64() {
                return Err(GraphError::Serialization(format!(
                    "Integer {n} exceeds the Bolt integer range"
                )));
            } else {
                BoltType::from(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => BoltType::from(s.clone()),
        Value::Array(items) => BoltType::List(BoltList {
            value: items.iter().map(json_to_bolt).collect::<Result<_, _>>()?,
        }),
        Value::Object(map) => BoltType::Map(BoltMap {
            value: map
                .iter()
                .map(|(k, v)| Ok((BoltString::from(k.as_str()), json_to_bolt(v)?)))
                .collect::<Result<HashMap<_, _>, GraphError>>()?,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = GraphConfig::default();
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.user, "neo4j");
        assert_eq!(config.max_connections, 16);
        assert_eq!(config.fetch_size, 256);
        assert!(!config.query_logs);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: GraphConfig =
            serde_json::from_value(json!({"uri": "bolt://db:7687", "query_logs": true})).unwrap();
        assert_eq!(config.uri, "bolt://db:7687");
        assert_eq!(config.user, "neo4j");
        assert!(config.query_logs);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = GraphConfig::load(schemagraph_core::config::DEFAULT_FILE_PREFIX).unwrap();
        assert_eq!(config.user, "neo4j");
        assert_eq!(config.fetch_size, 256);
    }

    #[test]
    fn test_json_to_bolt_scalars() {
        assert!(matches!(json_to_bolt(&json!(null)), Ok(BoltType::Null(_))));
        assert!(matches!(json_to_bolt(&json!(true)), Ok(BoltType::Boolean(_))));
        assert!(matches!(json_to_bolt(&json!(3)), Ok(BoltType::Integer(_))));
        assert!(matches!(json_to_bolt(&json!(i64::MAX)), Ok(BoltType::Integer(_))));
        assert!(matches!(json_to_bolt(&json!(2.5)), Ok(BoltType::Float(_))));
        assert!(matches!(json_to_bolt(&json!("x")), Ok(BoltType::String(_))));
    }

    #[test]
    fn test_json_to_bolt_nested() {
        match json_to_bolt(&json!([1, "a", {"k": false}])).unwrap() {
            BoltType::List(list) => {
                assert_eq!(list.value.len(), 3);
                assert!(matches!(list.value[2], BoltType::Map(_)));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_json_to_bolt_rejects_unsigned_overflow() {
        let too_big = json!(u64::MAX);
        assert!(matches!(
            json_to_bolt(&too_big),
            Err(GraphError::Serialization(_))
        ));
        assert!(json_to_bolt(&json!({"ids": [1, u64::MAX]})).is_err());
    }
}
