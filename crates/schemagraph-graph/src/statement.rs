//! Fluent builder for Cypher statements with bound parameters.
//!
//! The builder records an ordered list of clauses and renders the statement
//! text in a single pass, so whitespace and `WHERE`/`AND` placement are a
//! function of the clause sequence alone:
//!
//! - one space separates clauses, except that relationship fragments abut the
//!   node patterns on both sides;
//! - the first `WHERE` after a reading clause (`MATCH`, `OPTIONAL MATCH`,
//!   `CREATE`, `MERGE`) renders as `WHERE`, later ones as `AND`.
//!
//! Literal values never enter the text. Each one is stored in the parameter
//! map under a fresh key (`<property><counter>`, e.g. `title0`, `title1`) and
//! referenced as `$key`.
//!
//! Labels, variables and property keys are written as given. Callers are
//! responsible for passing identifiers only.

use serde_json::Value;

use schemagraph_core::{Direction, Properties};

/// Statement parameters, keyed by placeholder name.
pub type Params = serde_json::Map<String, Value>;

/// A rendered statement ready to send to a [`GraphProvider`](crate::GraphProvider).
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Params,
}

/// Kind of the most recently appended clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    None,
    Match,
    Create,
    Merge,
    Node,
    Relation,
    Where,
    Set,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
struct NodePattern {
    var: Option<String>,
    label: Option<String>,
    /// (property key, parameter key)
    props: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
struct RelationPattern {
    var: Option<String>,
    rel_type: Option<String>,
    direction: Direction,
    hops: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Match {
        optional: bool,
        node: NodePattern,
    },
    Create(NodePattern),
    Merge {
        left: NodePattern,
        rel: RelationPattern,
        right: NodePattern,
    },
    Node(NodePattern),
    Relation(RelationPattern),
    Where {
        var: String,
        key: String,
        param: String,
        negate: bool,
    },
    WhereNode(String),
    Set {
        var: String,
        key: String,
        param: String,
    },
    Delete {
        vars: Vec<String>,
        detach: bool,
    },
}

impl Clause {
    fn kind(&self) -> ClauseKind {
        match self {
            Self::Match { .. } => ClauseKind::Match,
            Self::Create(_) => ClauseKind::Create,
            Self::Merge { .. } => ClauseKind::Merge,
            Self::Node(_) => ClauseKind::Node,
            Self::Relation(_) => ClauseKind::Relation,
            Self::Where { .. } | Self::WhereNode(_) => ClauseKind::Where,
            Self::Set { .. } => ClauseKind::Set,
            Self::Delete { .. } => ClauseKind::Delete,
        }
    }
}

/// Accumulates one statement and its parameters. Create one per operation.
#[derive(Debug, Clone, Default)]
pub struct StatementBuilder {
    clauses: Vec<Clause>,
    params: Params,
    counter: usize,
}

impl StatementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `MATCH (var:Label {props})`
    pub fn match_node(
        &mut self,
        var: &str,
        label: Option<&str>,
        props: Option<&Properties>,
    ) -> &mut Self {
        let node = self.node_pattern(Some(var), label, props);
        self.clauses.push(Clause::Match {
            optional: false,
            node,
        });
        self
    }

    /// `OPTIONAL MATCH (var:Label {props})`
    pub fn optional_match(
        &mut self,
        var: &str,
        label: Option<&str>,
        props: Option<&Properties>,
    ) -> &mut Self {
        let node = self.node_pattern(Some(var), label, props);
        self.clauses.push(Clause::Match {
            optional: true,
            node,
        });
        self
    }

    /// `CREATE (var:Label {props})`
    pub fn create(
        &mut self,
        var: &str,
        label: Option<&str>,
        props: Option<&Properties>,
    ) -> &mut Self {
        let node = self.node_pattern(Some(var), label, props);
        self.clauses.push(Clause::Create(node));
        self
    }

    /// A bare node pattern, usually following a [`relation`](Self::relation).
    pub fn node(
        &mut self,
        var: Option<&str>,
        label: Option<&str>,
        props: Option<&Properties>,
    ) -> &mut Self {
        let node = self.node_pattern(var, label, props);
        self.clauses.push(Clause::Node(node));
        self
    }

    /// A relationship pattern such as `-[r:TYPE]->`, `<-[r:TYPE]-` or
    /// `-[r:TYPE*1..3]-`.
    pub fn relation(
        &mut self,
        var: Option<&str>,
        rel_type: Option<&str>,
        direction: Direction,
        hops: Option<&str>,
    ) -> &mut Self {
        self.clauses.push(Clause::Relation(RelationPattern {
            var: non_empty(var),
            rel_type: non_empty(rel_type),
            direction,
            hops: non_empty(hops),
        }));
        self
    }

    /// `MERGE (left)-[rel_var:rel_type]->(right)`
    pub fn merge(
        &mut self,
        left: &str,
        right: &str,
        rel_var: &str,
        rel_type: &str,
        direction: Direction,
    ) -> &mut Self {
        let left = self.node_pattern(Some(left), None, None);
        let right = self.node_pattern(Some(right), None, None);
        self.clauses.push(Clause::Merge {
            left,
            rel: RelationPattern {
                var: non_empty(Some(rel_var)),
                rel_type: non_empty(Some(rel_type)),
                direction,
                hops: None,
            },
            right,
        });
        self
    }

    /// `WHERE var.key = $param`, or `AND ...` when a predicate is already open.
    pub fn where_eq(&mut self, var: &str, key: &str, value: impl Into<Value>) -> &mut Self {
        self.push_where(var, key, value.into(), false)
    }

    /// `WHERE NOT var.key = $param`, or `AND NOT ...`.
    pub fn where_not_eq(&mut self, var: &str, key: &str, value: impl Into<Value>) -> &mut Self {
        self.push_where(var, key, value.into(), true)
    }

    /// Existence predicate `WHERE (var)`, to be continued with a relation and
    /// node, e.g. `WHERE (n)-[:HAS]->(m)`.
    pub fn where_node(&mut self, var: &str) -> &mut Self {
        self.clauses.push(Clause::WhereNode(var.to_string()));
        self
    }

    /// `SET var.key = $param`
    pub fn set(&mut self, var: &str, key: &str, value: impl Into<Value>) -> &mut Self {
        let param = self.bind(key, value.into());
        self.clauses.push(Clause::Set {
            var: var.to_string(),
            key: key.to_string(),
            param,
        });
        self
    }

    /// `DELETE a, b` or `DETACH DELETE a, b`
    pub fn delete(&mut self, vars: &[&str], detach: bool) -> &mut Self {
        self.clauses.push(Clause::Delete {
            vars: vars.iter().map(|v| v.to_string()).collect(),
            detach,
        });
        self
    }

    /// Statement text, optionally followed by `RETURN <returns>`.
    pub fn get(&self, returns: Option<&str>) -> String {
        let mut text = self.render();
        if let Some(returns) = returns {
            text.push_str(" RETURN ");
            text.push_str(returns);
        }
        text
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn last_clause_kind(&self) -> ClauseKind {
        self.clauses.last().map_or(ClauseKind::None, Clause::kind)
    }

    /// Snapshot of text and parameters.
    pub fn build(&self, returns: Option<&str>) -> Statement {
        Statement {
            text: self.get(returns),
            params: self.params.clone(),
        }
    }

    // ── Internals ────────────────────────────────────────────────

    fn push_where(&mut self, var: &str, key: &str, value: Value, negate: bool) -> &mut Self {
        let param = self.bind(key, value);
        self.clauses.push(Clause::Where {
            var: var.to_string(),
            key: key.to_string(),
            param,
            negate,
        });
        self
    }

    fn node_pattern(
        &mut self,
        var: Option<&str>,
        label: Option<&str>,
        props: Option<&Properties>,
    ) -> NodePattern {
        let props = props
            .map(|p| {
                p.iter()
                    .map(|(key, value)| (key.to_string(), self.bind(key, value.value().clone())))
                    .collect()
            })
            .unwrap_or_default();
        NodePattern {
            var: non_empty(var),
            label: non_empty(label),
            props,
        }
    }

    /// Store a value under a fresh placeholder key and return the key.
    fn bind(&mut self, key: &str, value: Value) -> String {
        // The counter alone keeps keys unique unless a property name already
        // ends in digits ("a1" + 0 vs "a" + 10), hence the membership check.
        let unique = loop {
            let candidate = format!("{key}{}", self.counter);
            self.counter += 1;
            if !self.params.contains_key(&candidate) {
                break candidate;
            }
        };
        self.params.insert(unique.clone(), value);
        unique
    }

    fn render(&self) -> String {
        let mut out = String::new();
        let mut prev = ClauseKind::None;
        let mut where_open = false;

        for clause in &self.clauses {
            let kind = clause.kind();
            if kind != ClauseKind::Relation
                && prev != ClauseKind::None
                && prev != ClauseKind::Relation
            {
                out.push(' ');
            }

            match clause {
                Clause::Match { optional, node } => {
                    if *optional {
                        out.push_str("OPTIONAL ");
                    }
                    out.push_str("MATCH ");
                    render_node(&mut out, node);
                    where_open = false;
                }
                Clause::Create(node) => {
                    out.push_str("CREATE ");
                    render_node(&mut out, node);
                    where_open = false;
                }
                Clause::Merge { left, rel, right } => {
                    out.push_str("MERGE ");
                    render_node(&mut out, left);
                    render_relation(&mut out, rel);
                    render_node(&mut out, right);
                    where_open = false;
                }
                Clause::Node(node) => render_node(&mut out, node),
                Clause::Relation(rel) => render_relation(&mut out, rel),
                Clause::Where {
                    var,
                    key,
                    param,
                    negate,
                } => {
                    out.push_str(if where_open { "AND" } else { "WHERE" });
                    if *negate {
                        out.push_str(" NOT");
                    }
                    out.push_str(&format!(" {var}.{key} = ${param}"));
                    where_open = true;
                }
                Clause::WhereNode(var) => {
                    out.push_str(if where_open { "AND" } else { "WHERE" });
                    out.push_str(&format!(" ({var})"));
                    where_open = true;
                }
                Clause::Set { var, key, param } => {
                    out.push_str(&format!("SET {var}.{key} = ${param}"));
                    where_open = false;
                }
                Clause::Delete { vars, detach } => {
                    if *detach {
                        out.push_str("DETACH ");
                    }
                    out.push_str("DELETE ");
                    out.push_str(&vars.join(", "));
                    where_open = false;
                }
            }
            prev = kind;
        }
        out
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|s| !s.is_empty()).map(str::to_string)
}

fn render_node(out: &mut String, node: &NodePattern) {
    out.push('(');
    if let Some(var) = &node.var {
        out.push_str(var);
    }
    if let Some(label) = &node.label {
        out.push(':');
        out.push_str(label);
    }
    if !node.props.is_empty() {
        let inner: Vec<String> = node
            .props
            .iter()
            .map(|(key, param)| format!("{key}: ${param}"))
            .collect();
        out.push_str(" {");
        out.push_str(&inner.join(", "));
        out.push('}');
    }
    out.push(')');
}

fn render_relation(out: &mut String, rel: &RelationPattern) {
    if rel.direction == Direction::From {
        out.push('<');
    }
    out.push_str("-[");
    if let Some(var) = &rel.var {
        out.push_str(var);
    }
    if let Some(rel_type) = &rel.rel_type {
        out.push(':');
        out.push_str(rel_type);
    }
    if let Some(hops) = &rel.hops {
        out.push_str(hops);
    }
    out.push_str("]-");
    if rel.direction == Direction::To {
        out.push('>');
    }
}
