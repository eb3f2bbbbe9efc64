//! Write operations for entity models.
//!
//! Each public operation validates with [`Validation::Enforce`]; the
//! `*_with` variants take the validation mode so that
//! [`EntityModel::no_check`] can run the same code with value checks
//! skipped.

use serde::de::DeserializeOwned;
use serde_json::Value;

use schemagraph_core::sanitize::{self, Validation};
use schemagraph_core::Properties;

use crate::client::UpdateKind;
use crate::model::{decode, EntityModel, ModelResult, StaticRelation};
use crate::records::{NODES_DELETED, RELATIONSHIPS_CREATED, RELATIONSHIPS_DELETED};
use crate::statement::StatementBuilder;

const NODE_VAR: &str = "node";

impl<P> EntityModel<P>
where
    P: serde::Serialize + DeserializeOwned,
{
    // ── Nodes ────────────────────────────────────────────────────

    /// Create all `nodes` in one statement (`node0`, `node1`, ...).
    ///
    /// Every node is validated first; one bad node rejects the whole batch.
    /// An empty batch returns without contacting the store.
    pub async fn create_nodes(&self, nodes: &[P]) -> ModelResult<Vec<P>> {
        self.create_nodes_with(nodes, Validation::Enforce).await
    }

    /// Like [`create_nodes`](Self::create_nodes), from property bags. Use
    /// this to mark individual values as unchecked.
    pub async fn create_nodes_raw(&self, nodes: &[Properties]) -> ModelResult<Vec<P>> {
        self.create_nodes_raw_with(nodes, Validation::Enforce).await
    }

    pub(crate) async fn create_nodes_with(
        &self,
        nodes: &[P],
        validation: Validation,
    ) -> ModelResult<Vec<P>> {
        let bags = nodes
            .iter()
            .map(Properties::from_serialize)
            .collect::<Result<Vec<_>, _>>()?;
        self.create_nodes_raw_with(&bags, validation).await
    }

    pub(crate) async fn create_nodes_raw_with(
        &self,
        nodes: &[Properties],
        validation: Validation,
    ) -> ModelResult<Vec<P>> {
        let bags: Vec<&Properties> = nodes.iter().collect();
        self.validate(&bags, validation)?;
        if nodes.is_empty() {
            return Ok(Vec::new());
        }

        let mut q = StatementBuilder::new();
        let mut vars = Vec::with_capacity(nodes.len());
        for (i, props) in nodes.iter().enumerate() {
            let var = format!("{NODE_VAR}{i}");
            q.create(&var, Some(self.label()), Some(props));
            vars.push(var);
        }
        let returns = vars
            .iter()
            .map(|v| format!("{v}{{.*}} AS {v}"))
            .collect::<Vec<_>>()
            .join(", ");

        let set = self.execute(&q, Some(&returns)).await?;
        tracing::debug!(
            label = %self.label(),
            created = set.stats.nodes_created,
            "Created nodes"
        );

        let mut created = Vec::with_capacity(nodes.len());
        for record in &set.records {
            for var in &vars {
                if let Some(value) = record.get(var) {
                    created.push(decode(value.clone())?);
                }
            }
        }
        Ok(created)
    }

    /// Set `data` on every node matching `filter` and return the updated nodes.
    pub async fn update_node(&self, filter: &Properties, data: &Properties) -> ModelResult<Vec<P>> {
        self.update_node_with(filter, data, Validation::Enforce)
            .await
    }

    pub(crate) async fn update_node_with(
        &self,
        filter: &Properties,
        data: &Properties,
        validation: Validation,
    ) -> ModelResult<Vec<P>> {
        self.validate(&[filter, data], validation)?;

        let mut q = self.match_filtered(NODE_VAR, filter);
        for (key, value) in data.iter() {
            q.set(NODE_VAR, key, value.value().clone());
        }

        let set = self
            .execute(&q, Some(&format!("{NODE_VAR}{{.*}} AS {NODE_VAR}")))
            .await?;
        self.provider()
            .format_records(&set)
            .into_iter()
            .map(|record| decode(Value::Object(record)))
            .collect()
    }

    /// `DETACH DELETE` every node matching `filter`. True iff at least one
    /// node was deleted.
    pub async fn delete_node(&self, filter: &Properties) -> ModelResult<bool> {
        self.delete_node_with(filter, Validation::Enforce).await
    }

    pub(crate) async fn delete_node_with(
        &self,
        filter: &Properties,
        validation: Validation,
    ) -> ModelResult<bool> {
        self.validate(&[filter], validation)?;

        let mut q = self.match_filtered(NODE_VAR, filter);
        q.delete(&[NODE_VAR], true);

        let set = self
            .execute(&q, Some(&format!("count(*) AS {NODES_DELETED}")))
            .await?;
        Ok(self.provider().confirm_update(&set, UpdateKind::Node))
    }

    // ── Relations ────────────────────────────────────────────────

    /// `MERGE` a relationship from the nodes matching `filter` (`n1`) to the
    /// destination nodes (`n2`). Idempotent: re-running with the same
    /// endpoints creates nothing and returns false.
    ///
    /// The statement reports the number of new edges as its
    /// `relationships_created` column, so no result summary is needed.
    pub async fn create_static_relation(
        &self,
        filter: &Properties,
        relation: &StaticRelation,
    ) -> ModelResult<bool> {
        self.create_static_relation_with(filter, relation, Validation::Enforce)
            .await
    }

    pub(crate) async fn create_static_relation_with(
        &self,
        filter: &Properties,
        relation: &StaticRelation,
        validation: Validation,
    ) -> ModelResult<bool> {
        self.validate(&[filter, &relation.destination_filter], validation)?;
        let dst_label = relation.destination.resolve(self.label());
        sanitize::check_identifier(&relation.rel_type)?;
        sanitize::check_identifier(dst_label)?;

        let mut q = StatementBuilder::new();
        q.match_node("n1", Some(self.label()), None);
        for (key, value) in filter.iter() {
            q.where_eq("n1", key, value.value().clone());
        }
        q.match_node("n2", Some(dst_label), None);
        for (key, value) in relation.destination_filter.iter() {
            q.where_eq("n2", key, value.value().clone());
        }
        // edges already in place; the difference below counts new ones
        q.optional_match("n1", None, None)
            .relation(Some("existing"), Some(&relation.rel_type), relation.direction, None)
            .node(Some("n2"), None, None);
        q.merge("n1", "n2", "r", &relation.rel_type, relation.direction);

        let returns =
            format!("count(DISTINCT r) - count(DISTINCT existing) AS {RELATIONSHIPS_CREATED}");
        let set = self.execute(&q, Some(&returns)).await?;
        Ok(self.provider().confirm_update(&set, UpdateKind::Relation))
    }

    /// Create the declared relation `relation_id` between the nodes matching
    /// `filter` and those matching `destination_filter`.
    pub async fn create_relation(
        &self,
        relation_id: &str,
        filter: &Properties,
        destination_filter: &Properties,
    ) -> ModelResult<bool> {
        self.create_relation_with(relation_id, filter, destination_filter, Validation::Enforce)
            .await
    }

    pub(crate) async fn create_relation_with(
        &self,
        relation_id: &str,
        filter: &Properties,
        destination_filter: &Properties,
        validation: Validation,
    ) -> ModelResult<bool> {
        self.validate(&[filter, destination_filter], validation)?;
        let spec = self.relation(relation_id)?;

        let relation = StaticRelation {
            rel_type: spec.rel_type.clone(),
            direction: spec.direction,
            destination: spec.target.clone(),
            destination_filter: destination_filter.clone(),
        };
        self.create_static_relation_with(filter, &relation, validation)
            .await
    }

    /// Delete the declared relation `relation_id` between matching endpoints.
    /// True iff at least one relationship was deleted.
    ///
    /// The hop pattern of the declaration only applies to joins; deletion
    /// always targets single relationships.
    pub async fn delete_relation(
        &self,
        relation_id: &str,
        filter: &Properties,
        destination_filter: &Properties,
    ) -> ModelResult<bool> {
        self.delete_relation_with(relation_id, filter, destination_filter, Validation::Enforce)
            .await
    }

    pub(crate) async fn delete_relation_with(
        &self,
        relation_id: &str,
        filter: &Properties,
        destination_filter: &Properties,
        validation: Validation,
    ) -> ModelResult<bool> {
        self.validate(&[filter, destination_filter], validation)?;
        let spec = self.relation(relation_id)?;
        let dst_label = spec.target.resolve(self.label());

        let mut q = StatementBuilder::new();
        q.match_node("src", Some(self.label()), Some(filter))
            .relation(Some("r"), Some(&spec.rel_type), spec.direction, None)
            .node(Some("dst"), Some(dst_label), Some(destination_filter))
            .delete(&["r"], false);

        let set = self
            .execute(&q, Some(&format!("count(*) AS {RELATIONSHIPS_DELETED}")))
            .await?;
        Ok(self.provider().confirm_update(&set, UpdateKind::Relation))
    }

    // ── Helpers ──────────────────────────────────────────────────

    /// `MATCH (var:Label) WHERE var.k = $k0 AND ...`
    fn match_filtered(&self, var: &str, filter: &Properties) -> StatementBuilder {
        let mut q = StatementBuilder::new();
        q.match_node(var, Some(self.label()), None);
        for (key, value) in filter.iter() {
            q.where_eq(var, key, value.value().clone());
        }
        q
    }
}
