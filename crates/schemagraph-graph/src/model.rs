//! Schema-bound models: one node label plus its declared relations.
//!
//! Every operation follows the same shape: validate the caller's property
//! bags, build one statement, execute it through the shared
//! [`GraphProvider`], and map the outcome into a [`ModelResult`]. Validation
//! failures return before any statement is built, so a rejected call never
//! reaches the provider.
//!
//! Reads live in `queries.rs`, writes in `mutations.rs`.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use schemagraph_core::sanitize::{self, Validation};
use schemagraph_core::{CoreError, Direction, ErrorKind, Properties, RelationTarget};

use crate::client::{GraphError, GraphProvider, RecordSet};
use crate::statement::{Params, StatementBuilder};

// ── Errors ───────────────────────────────────────────────────────

/// Failure of a model operation.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Illegal Inputs: {0}")]
    Inputs(#[source] CoreError),

    #[error("No such Relation: {id}")]
    Relation { id: String },

    #[error("Server Error: {0}")]
    Server(#[from] GraphError),
}

impl ModelError {
    /// The user-visible kind; the attached cause is for diagnostics only.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Inputs(_) => ErrorKind::Inputs,
            Self::Relation { .. } => ErrorKind::Relation,
            Self::Server(_) => ErrorKind::Server,
        }
    }
}

impl From<CoreError> for ModelError {
    fn from(e: CoreError) -> Self {
        Self::Inputs(e)
    }
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Invalid model declaration.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Invalid relationship type {rel_type} on relation {id}")]
    InvalidRelationType { id: String, rel_type: String },

    #[error("Invalid relation id: {0}")]
    InvalidRelationId(String),

    #[error("Invalid hop pattern {hops} on relation {id}")]
    InvalidHops { id: String, hops: String },

    #[error("Duplicate relation id: {0}")]
    DuplicateRelationId(String),
}

// ── Relations ────────────────────────────────────────────────────

/// A relation declared on a model, looked up by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    pub id: String,
    pub rel_type: String,
    pub target: RelationTarget,
    pub direction: Direction,
    /// Variable-length suffix such as `*1..3`, used when joining.
    pub hops: Option<String>,
}

impl RelationSpec {
    pub fn new(id: &str, target: impl Into<RelationTarget>, rel_type: &str) -> Self {
        Self {
            id: id.to_string(),
            rel_type: rel_type.to_string(),
            target: target.into(),
            direction: Direction::default(),
            hops: None,
        }
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn hops(mut self, hops: &str) -> Self {
        self.hops = Some(hops.to_string());
        self
    }
}

/// A relationship described inline rather than by a declared id.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticRelation {
    pub rel_type: String,
    pub direction: Direction,
    pub destination: RelationTarget,
    pub destination_filter: Properties,
}

impl StaticRelation {
    pub fn new(rel_type: &str, destination: impl Into<RelationTarget>) -> Self {
        Self {
            rel_type: rel_type.to_string(),
            direction: Direction::default(),
            destination: destination.into(),
            destination_filter: Properties::new(),
        }
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn destination_filter(mut self, filter: Properties) -> Self {
        self.destination_filter = filter;
        self
    }
}

/// One relation to follow in [`EntityModel::get_nodes`].
#[derive(Debug, Clone, PartialEq)]
pub struct RelationJoin {
    pub id: String,
    /// Equality filter on the destination nodes.
    pub filter: Properties,
    /// OPTIONAL MATCH keeps source nodes without a destination.
    pub optional: bool,
}

impl RelationJoin {
    pub fn optional(id: &str) -> Self {
        Self {
            id: id.to_string(),
            filter: Properties::new(),
            optional: true,
        }
    }

    pub fn required(id: &str) -> Self {
        Self {
            optional: false,
            ..Self::optional(id)
        }
    }

    pub fn filter(mut self, filter: Properties) -> Self {
        self.filter = filter;
        self
    }
}

/// Arguments of [`EntityModel::get_nodes`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetNodes {
    pub filter: Properties,
    pub relations: Vec<RelationJoin>,
    /// Join every declared relation (optionally) that `relations` does not
    /// already name.
    pub all_relations: bool,
}

impl GetNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Properties) -> Self {
        self.filter = filter;
        self
    }

    pub fn join(mut self, join: RelationJoin) -> Self {
        self.relations.push(join);
        self
    }

    pub fn with_all_relations(mut self) -> Self {
        self.all_relations = true;
        self
    }
}

/// A node read back from the store, with the collections of related nodes
/// requested through [`GetNodes`], keyed by destination label.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<P> {
    pub properties: P,
    pub related: BTreeMap<String, Vec<Value>>,
}

// ── Model ────────────────────────────────────────────────────────

/// A node label, its declared relations, and the provider that stores it.
pub struct EntityModel<P> {
    label: String,
    relations: Vec<RelationSpec>,
    provider: Arc<dyn GraphProvider>,
    query_logs: bool,
    _props: PhantomData<fn() -> P>,
}

impl<P> std::fmt::Debug for EntityModel<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityModel")
            .field("label", &self.label)
            .field("relations", &self.relations)
            .field("query_logs", &self.query_logs)
            .finish()
    }
}

impl<P> EntityModel<P>
where
    P: serde::Serialize + DeserializeOwned,
{
    pub fn new(provider: Arc<dyn GraphProvider>, label: &str) -> Result<Self, SchemaError> {
        if !sanitize::is_identifier(label) {
            return Err(SchemaError::InvalidLabel(label.to_string()));
        }
        Ok(Self {
            label: label.to_string(),
            relations: Vec::new(),
            provider,
            query_logs: false,
            _props: PhantomData,
        })
    }

    /// Declare the model's relations. Ids must be unique; relationship types
    /// and resolved target labels must be identifiers.
    pub fn with_relations(mut self, relations: Vec<RelationSpec>) -> Result<Self, SchemaError> {
        for (i, rel) in relations.iter().enumerate() {
            if rel.id.is_empty() || rel.id.contains('`') {
                return Err(SchemaError::InvalidRelationId(rel.id.clone()));
            }
            if relations[..i].iter().any(|r| r.id == rel.id) {
                return Err(SchemaError::DuplicateRelationId(rel.id.clone()));
            }
            if !sanitize::is_identifier(&rel.rel_type) {
                return Err(SchemaError::InvalidRelationType {
                    id: rel.id.clone(),
                    rel_type: rel.rel_type.clone(),
                });
            }
            if let RelationTarget::Label(label) = &rel.target {
                if !sanitize::is_identifier(label) {
                    return Err(SchemaError::InvalidLabel(label.clone()));
                }
            }
            if let Some(hops) = &rel.hops {
                if !is_hop_pattern(hops) {
                    return Err(SchemaError::InvalidHops {
                        id: rel.id.clone(),
                        hops: hops.clone(),
                    });
                }
            }
        }
        self.relations = relations;
        Ok(self)
    }

    pub fn with_query_logs(mut self, enabled: bool) -> Self {
        self.query_logs = enabled;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn relations(&self) -> &[RelationSpec] {
        &self.relations
    }

    /// Look up a declared relation by id.
    pub fn relation(&self, id: &str) -> ModelResult<&RelationSpec> {
        self.relations
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ModelError::Relation { id: id.to_string() })
    }

    /// Bypass value sanitization for exactly one write operation.
    ///
    /// The returned view is consumed by the operation it runs, so the bypass
    /// cannot leak into later calls on the model.
    pub fn no_check(&self) -> Unchecked<'_, P> {
        Unchecked { model: self }
    }

    // ── Shared plumbing ──────────────────────────────────────────

    pub(crate) fn provider(&self) -> &dyn GraphProvider {
        self.provider.as_ref()
    }

    pub(crate) fn validate(&self, bags: &[&Properties], validation: Validation) -> ModelResult<()> {
        for bag in bags {
            sanitize::check_properties(bag, validation)?;
        }
        Ok(())
    }

    /// Render and run one statement.
    pub(crate) async fn execute(
        &self,
        builder: &StatementBuilder,
        returns: Option<&str>,
    ) -> ModelResult<RecordSet> {
        let statement = builder.build(returns);
        if self.query_logs {
            // keys only: unchecked values may be secrets
            let params = param_keys(&statement.params);
            tracing::info!(
                label = %self.label,
                statement = %statement.text,
                params = %params,
                "Executing statement"
            );
        } else {
            tracing::trace!(label = %self.label, statement = %statement.text, "Executing statement");
        }

        match self.provider.query(&statement.text, &statement.params).await {
            Ok(set) => Ok(set),
            Err(e) => {
                tracing::error!(label = %self.label, error = %e, "Statement failed");
                Err(ModelError::Server(e))
            }
        }
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> ModelResult<T> {
    serde_json::from_value(value).map_err(|e| {
        ModelError::Server(GraphError::Serialization(format!(
            "Failed to decode record: {e}"
        )))
    })
}

fn param_keys(params: &Params) -> String {
    params.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// `*`, `*2`, `*1..3`, `*..3`, `*2..`
fn is_hop_pattern(hops: &str) -> bool {
    match hops.strip_prefix('*') {
        Some(rest) => {
            let mut parts = rest.splitn(2, "..");
            let lower = parts.next().unwrap_or_default();
            let upper = parts.next().unwrap_or_default();
            lower.chars().all(|c| c.is_ascii_digit()) && upper.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

// ── One-shot bypass ──────────────────────────────────────────────

/// Write operations with value sanitization skipped, from
/// [`EntityModel::no_check`]. Property keys are still checked.
pub struct Unchecked<'a, P> {
    model: &'a EntityModel<P>,
}

impl<'a, P> Unchecked<'a, P>
where
    P: serde::Serialize + DeserializeOwned,
{
    pub async fn create_nodes(self, nodes: &[P]) -> ModelResult<Vec<P>> {
        self.model.create_nodes_with(nodes, Validation::SkipValues).await
    }

    pub async fn create_nodes_raw(self, nodes: &[Properties]) -> ModelResult<Vec<P>> {
        self.model
            .create_nodes_raw_with(nodes, Validation::SkipValues)
            .await
    }

    pub async fn update_node(self, filter: &Properties, data: &Properties) -> ModelResult<Vec<P>> {
        self.model
            .update_node_with(filter, data, Validation::SkipValues)
            .await
    }

    pub async fn delete_node(self, filter: &Properties) -> ModelResult<bool> {
        self.model
            .delete_node_with(filter, Validation::SkipValues)
            .await
    }

    pub async fn create_static_relation(
        self,
        filter: &Properties,
        relation: &StaticRelation,
    ) -> ModelResult<bool> {
        self.model
            .create_static_relation_with(filter, relation, Validation::SkipValues)
            .await
    }

    pub async fn create_relation(
        self,
        relation_id: &str,
        filter: &Properties,
        destination_filter: &Properties,
    ) -> ModelResult<bool> {
        self.model
            .create_relation_with(relation_id, filter, destination_filter, Validation::SkipValues)
            .await
    }

    pub async fn delete_relation(
        self,
        relation_id: &str,
        filter: &Properties,
        destination_filter: &Properties,
    ) -> ModelResult<bool> {
        self.model
            .delete_relation_with(relation_id, filter, destination_filter, Validation::SkipValues)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_patterns() {
        assert!(is_hop_pattern("*"));
        assert!(is_hop_pattern("*2"));
        assert!(is_hop_pattern("*1..3"));
        assert!(is_hop_pattern("*..3"));
        assert!(!is_hop_pattern("1..3"));
        assert!(!is_hop_pattern("*1..3]->(x"));
    }

    #[test]
    fn test_param_keys_omit_values() {
        let mut params = Params::new();
        params.insert("hash0".into(), Value::from("s3cr3t"));
        params.insert("uid1".into(), Value::from(7));
        let logged = param_keys(&params);
        assert_eq!(logged, "hash0, uid1");
        assert!(!logged.contains("s3cr3t"));
    }

    #[test]
    fn test_error_kinds() {
        let err = ModelError::Relation { id: "x".into() };
        assert_eq!(err.kind(), ErrorKind::Relation);
        assert_eq!(err.to_string(), "No such Relation: x");

        let err = ModelError::from(CoreError::IllegalValue { key: "title".into() });
        assert_eq!(err.kind(), ErrorKind::Inputs);

        let err = ModelError::from(GraphError::Connection("down".into()));
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.kind().to_string(), "Server Error");
    }

    #[test]
    fn test_relation_spec_defaults() {
        let rel = RelationSpec::new("self rel", schemagraph_core::SELF_LABEL, "HAS_TEST");
        assert_eq!(rel.direction, Direction::To);
        assert_eq!(rel.target, RelationTarget::SelfLabel);
        assert!(rel.hops.is_none());
    }
}
