//! Partition normalizer.
//!
//! Raw partition records expose their fields differently depending on the
//! source version; this module flattens them into the canonical
//! `PartitionInfo` shape. Missing `total_nodes` is derived by expanding the
//! range string; missing `total_cores` defaults to 0 and is backfilled by
//! the metrics engine from the per-node core estimate.

use serde_json::Value;

use rackview_core::{PartitionInfo, PartitionMap};

use crate::error::IngestResult;
use crate::fields::{field_str, field_u64, opt_u64};
use crate::{HostlistExpander, RawPartitionMap};

/// Pure transform from raw records to the canonical shape. No partition is
/// dropped for missing optional fields; a hostlist-expansion failure
/// propagates as an `IngestError`.
pub fn normalize_partitions(
    raw: &RawPartitionMap,
    expander: &dyn HostlistExpander,
) -> IngestResult<PartitionMap> {
    let mut normalized = PartitionMap::new();

    for (name, record) in raw {
        let nodes = node_range(record);

        let total_nodes = match total_nodes_field(record) {
            Some(n) => n,
            None if nodes.is_empty() => 0,
            None => expander.expand(&nodes)?.len() as u64,
        };

        let total_cores = total_cores_field(record).unwrap_or(0);

        normalized.insert(
            name.clone(),
            PartitionInfo {
                nodes,
                total_nodes: total_nodes as u32,
                total_cores: total_cores as u32,
            },
        );
    }

    Ok(normalized)
}

/// The compressed range string: a plain `"nodes"` string in older records,
/// `{"nodes": {"configured": ...}}` in newer ones.
fn node_range(record: &Value) -> String {
    if let Some(s) = field_str(record, "nodes") {
        return s;
    }
    record
        .get("nodes")
        .and_then(|v| v.get("configured"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn total_nodes_field(record: &Value) -> Option<u64> {
    field_u64(record, "total_nodes")
        .or_else(|| record.get("nodes").and_then(|v| v.get("total")).and_then(opt_u64))
}

fn total_cores_field(record: &Value) -> Option<u64> {
    field_u64(record, "total_cpus")
        .or_else(|| record.get("cpus").and_then(|v| v.get("total")).and_then(opt_u64))
}
