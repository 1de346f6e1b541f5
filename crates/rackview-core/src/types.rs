//! Domain types for one report cycle.
//!
//! These types are immutable snapshots of what the scheduler reported at
//! the instant the cycle started. Enrichment (status, corrected load,
//! current-job annotation) happens by producing new values downstream,
//! never by mutating these records in place.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique node hostname.
pub type NodeName = String;

/// Numeric scheduler job id.
pub type JobId = u32;

/// Numeric OS user id owning a job.
pub type UserId = u32;

/// Load value the scheduler reports for a node with no valid reading
/// (a uint32 "-2" that survived a widening conversion). Corrected to 0
/// before any computation uses the field.
pub const LOAD_OVERFLOW_SENTINEL: u64 = 4_294_967_294;

// ── Jobs ──────────────────────────────────────────────────────────

/// One job record from the scheduler snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobInfo {
    pub id: JobId,
    /// Scheduler state string ("RUNNING", "PENDING", ...).
    pub state: String,
    pub partition: Option<String>,
    pub user_id: Option<UserId>,
    /// Requested/allocated core count for the whole job.
    pub num_cpus: u32,
    /// Per-node core allocation (node name → cores on that node).
    pub cpus_allocated: BTreeMap<NodeName, u32>,
    /// Submit timestamp (epoch seconds), when the scheduler reported one.
    pub submit_time: Option<u64>,
    /// Reason a pending job has not started ("Priority", "Resources", ...).
    pub state_reason: Option<String>,
    /// Human-readable job name.
    pub name: String,
    /// Pre-formatted runtime string from the scheduler.
    pub run_time: String,
}

impl JobInfo {
    pub fn is_running(&self) -> bool {
        self.state == "RUNNING"
    }

    pub fn is_pending(&self) -> bool {
        self.state == "PENDING"
    }

    /// Whether the job belongs to one of the named partitions.
    pub fn in_partitions(&self, partitions: &[String]) -> bool {
        self.partition
            .as_deref()
            .is_some_and(|p| partitions.iter().any(|t| t == p))
    }
}

// ── Nodes ─────────────────────────────────────────────────────────

/// One node record from the scheduler snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeInfo {
    pub name: NodeName,
    /// Scheduler state string ("IDLE", "MIXED", "DOWN*+DRAIN", ...).
    pub state: String,
    /// Total logical cores.
    pub cpus: u32,
    /// Total sockets.
    pub sockets: u32,
    /// Instantaneous load counter; `None` or the overflow sentinel when
    /// the scheduler had no reading.
    pub cpu_load: Option<u64>,
}

/// Status bucket a node is classified into, exactly one per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Idle,
    Allocated,
    Down,
    /// State string matched none of the configured sets.
    Unclassified,
}

// ── Partitions ────────────────────────────────────────────────────

/// Canonical partition record produced by the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartitionInfo {
    /// Compressed node-range string, e.g. `"cn[001-120]"`.
    pub nodes: String,
    pub total_nodes: u32,
    pub total_cores: u32,
}

// ── Statistics ────────────────────────────────────────────────────

/// Controller statistics snapshot; `req_time` is "now" for the cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Epoch seconds at which the scheduler answered the query.
    pub req_time: u64,
}

/// Job snapshot keyed by job id. `BTreeMap` keeps iteration deterministic,
/// which downstream tie-breaks rely on.
pub type JobSnapshot = BTreeMap<JobId, JobInfo>;

/// Node snapshot keyed by hostname.
pub type NodeSnapshot = BTreeMap<NodeName, NodeInfo>;

/// Normalized partitions keyed by partition name.
pub type PartitionMap = BTreeMap<String, PartitionInfo>;

#[cfg(test)]
mod tests {
    use super::*;

    fn job(state: &str, partition: Option<&str>) -> JobInfo {
        JobInfo {
            id: 1,
            state: state.to_string(),
            partition: partition.map(str::to_string),
            user_id: Some(1000),
            num_cpus: 4,
            cpus_allocated: BTreeMap::new(),
            submit_time: None,
            state_reason: None,
            name: "job".to_string(),
            run_time: "0:00".to_string(),
        }
    }

    #[test]
    fn state_predicates() {
        assert!(job("RUNNING", None).is_running());
        assert!(job("PENDING", None).is_pending());
        assert!(!job("COMPLETED", None).is_running());
        assert!(!job("COMPLETED", None).is_pending());
    }

    #[test]
    fn partition_membership() {
        let targets = vec!["batch".to_string(), "gpu".to_string()];
        assert!(job("RUNNING", Some("batch")).in_partitions(&targets));
        assert!(!job("RUNNING", Some("debug")).in_partitions(&targets));
        assert!(!job("RUNNING", None).in_partitions(&targets));
    }
}
