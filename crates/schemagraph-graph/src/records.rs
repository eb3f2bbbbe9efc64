//! Provider-neutral handling of record sets.

use serde_json::Value;

use crate::client::{Record, RecordSet, UpdateKind, UpdateStats};

/// Counter columns a statement may return itself, e.g.
/// `DETACH DELETE node RETURN count(*) AS nodes_deleted`.
pub const NODES_CREATED: &str = "nodes_created";
pub const NODES_DELETED: &str = "nodes_deleted";
pub const RELATIONSHIPS_CREATED: &str = "relationships_created";
pub const RELATIONSHIPS_DELETED: &str = "relationships_deleted";

/// Flatten every row into one property map, dropping the row structure.
///
/// Map-valued columns (nodes, relationships, map projections) are merged into
/// the output; scalar columns are kept under their column name.
pub fn format_records(set: &RecordSet) -> Vec<Record> {
    set.records.iter().map(flatten_row).collect()
}

fn flatten_row(row: &Record) -> Record {
    let mut flat = Record::new();
    for (column, value) in row {
        match value {
            Value::Object(props) => {
                for (k, v) in props {
                    flat.insert(k.clone(), v.clone());
                }
            }
            other => {
                flat.insert(column.clone(), other.clone());
            }
        }
    }
    flat
}

/// The write counters of `set`: the store's summary counters, raised by any
/// counter columns the statement returned.
pub fn update_stats(set: &RecordSet) -> UpdateStats {
    let column = |name: &str| -> u64 {
        set.records
            .iter()
            .filter_map(|record| record.get(name).and_then(Value::as_u64))
            .sum()
    };
    let summary = set.stats;
    UpdateStats {
        nodes_created: summary.nodes_created.max(column(NODES_CREATED)),
        nodes_deleted: summary.nodes_deleted.max(column(NODES_DELETED)),
        relationships_created: summary
            .relationships_created
            .max(column(RELATIONSHIPS_CREATED)),
        relationships_deleted: summary
            .relationships_deleted
            .max(column(RELATIONSHIPS_DELETED)),
    }
}

pub fn confirm_update(set: &RecordSet, kind: UpdateKind) -> bool {
    let stats = update_stats(set);
    match kind {
        UpdateKind::Node => stats.nodes_created > 0 || stats.nodes_deleted > 0,
        UpdateKind::Relation => stats.relationships_created > 0 || stats.relationships_deleted > 0,
    }
}
