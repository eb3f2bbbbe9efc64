//! schemagraph-graph: statement building and schema-bound CRUD for Neo4j.
//!
//! [`StatementBuilder`] assembles Cypher text with bound parameters.
//! [`EntityModel`] wraps one node label and its declared relations, turning
//! node and relation operations into statements executed through a shared
//! [`GraphProvider`] such as [`Neo4jClient`].

pub mod client;
pub mod model;
pub mod mutations;
pub mod queries;
pub mod records;
pub mod statement;

pub use client::{
    GraphConfig, GraphError, GraphProvider, Neo4jClient, Record, RecordSet, UpdateKind,
    UpdateStats,
};
pub use model::{
    EntityModel, GetNodes, ModelError, ModelResult, Node, RelationJoin, RelationSpec, SchemaError,
    StaticRelation, Unchecked,
};
pub use statement::{ClauseKind, Params, Statement, StatementBuilder};
