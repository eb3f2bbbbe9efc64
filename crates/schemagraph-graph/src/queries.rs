//! Read operations for entity models.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use schemagraph_core::sanitize::Validation;
use schemagraph_core::Properties;

use crate::model::{decode, EntityModel, GetNodes, ModelResult, Node, RelationJoin};
use crate::statement::StatementBuilder;

const NODE_VAR: &str = "node";

impl<P> EntityModel<P>
where
    P: serde::Serialize + DeserializeOwned,
{
    /// Get nodes of this label matching `args.filter`, optionally joined with
    /// the collections of related nodes.
    ///
    /// Each join adds a `MATCH`/`OPTIONAL MATCH` hop to `dst<i>` and one
    /// `collect(DISTINCT dst<i>{.*})` entry to the projection, keyed by the
    /// destination label, or by the relation id when the label is taken, or
    /// by `<id>_<n>` when both are.
    pub async fn get_nodes(&self, args: &GetNodes) -> ModelResult<Vec<Node<P>>> {
        let mut bags = vec![&args.filter];
        bags.extend(args.relations.iter().map(|j| &j.filter));
        self.validate(&bags, Validation::Enforce)?;

        let mut joins: Vec<RelationJoin> = args.relations.clone();
        if args.all_relations {
            for rel in self.relations() {
                if !joins.iter().any(|j| j.id == rel.id) {
                    joins.push(RelationJoin::optional(&rel.id));
                }
            }
        }

        let mut q = StatementBuilder::new();
        q.match_node(NODE_VAR, Some(self.label()), None);
        for (key, value) in args.filter.iter() {
            q.where_eq(NODE_VAR, key, value.value().clone());
        }

        let mut collections: Vec<String> = Vec::with_capacity(joins.len());
        let mut projections: Vec<String> = Vec::with_capacity(joins.len());
        for (i, join) in joins.iter().enumerate() {
            let spec = self.relation(&join.id)?;
            let dst_var = format!("dst{i}");
            let dst_label = spec.target.resolve(self.label());

            if join.optional {
                q.optional_match(NODE_VAR, None, None);
            } else {
                q.match_node(NODE_VAR, None, None);
            }
            q.relation(None, Some(&spec.rel_type), spec.direction, spec.hops.as_deref())
                .node(Some(&dst_var), Some(dst_label), None);
            for (key, value) in join.filter.iter() {
                q.where_eq(&dst_var, key, value.value().clone());
            }

            let name = collection_name(&collections, dst_label, &spec.id);
            projections.push(format!("`{name}`: collect(DISTINCT {dst_var}{{.*}})"));
            collections.push(name);
        }

        let returns = if projections.is_empty() {
            format!("{NODE_VAR}{{.*}} AS {NODE_VAR}")
        } else {
            format!("{NODE_VAR}{{.*, {}}} AS {NODE_VAR}", projections.join(", "))
        };

        let set = self.execute(&q, Some(&returns)).await?;
        self.provider()
            .format_records(&set)
            .into_iter()
            .map(|mut record| {
                let mut related = BTreeMap::new();
                for name in &collections {
                    let items = match record.remove(name) {
                        Some(Value::Array(items)) => items,
                        Some(Value::Null) | None => Vec::new(),
                        Some(other) => vec![other],
                    };
                    related.insert(name.clone(), items);
                }
                Ok(Node {
                    properties: decode(Value::Object(record))?,
                    related,
                })
            })
            .collect()
    }

    /// True iff at least one node of this label matches `filter`.
    ///
    /// Unlike every other operation this never reports an error: illegal
    /// input and store failures both read as `false`, indistinguishable from
    /// "no match".
    pub async fn check_match(&self, filter: &Properties) -> bool {
        if self.validate(&[filter], Validation::Enforce).is_err() {
            return false;
        }

        let mut q = StatementBuilder::new();
        q.match_node("n", Some(self.label()), None);
        for (key, value) in filter.iter() {
            q.where_eq("n", key, value.value().clone());
        }

        match self.execute(&q, Some("n{.*} AS n")).await {
            Ok(set) => !set.records.is_empty(),
            Err(_) => false,
        }
    }
}

/// First unused projection key among `label`, `id`, `id_1`, `id_2`, ...
fn collection_name(taken: &[String], label: &str, id: &str) -> String {
    let free = |name: &str| !taken.iter().any(|t| t == name);
    if free(label) {
        return label.to_string();
    }
    if free(id) {
        return id.to_string();
    }
    (1..)
        .map(|n| format!("{id}_{n}"))
        .find(|name| free(name))
        .unwrap_or_else(|| id.to_string())
}
