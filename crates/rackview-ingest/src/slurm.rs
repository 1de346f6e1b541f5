//! Slurm CLI snapshot source.
//!
//! Queries the scheduler through its CLI tools with `--json` output:
//! `squeue` for jobs, `scontrol` for nodes and partitions, `sdiag` for
//! controller statistics. Field extraction is defensive (see `fields`);
//! beyond that, no attempt is made to track scheduler API versions.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::{debug, warn};

use rackview_core::{JobInfo, JobSnapshot, NodeInfo, NodeSnapshot, StatsSnapshot};

use crate::error::{IngestError, IngestResult};
use crate::exec::capture_json;
use crate::fields::{field_str, field_u64, state_string};
use crate::{ClusterSource, RawPartitionMap};

/// Snapshot source backed by the scheduler's CLI tools.
pub struct SlurmCliSource {
    squeue: String,
    scontrol: String,
    sdiag: String,
}

impl Default for SlurmCliSource {
    fn default() -> Self {
        Self {
            squeue: "squeue".to_string(),
            scontrol: "scontrol".to_string(),
            sdiag: "sdiag".to_string(),
        }
    }
}

impl SlurmCliSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClusterSource for SlurmCliSource {
    fn jobs(&self) -> IngestResult<JobSnapshot> {
        let payload = capture_json(&self.squeue, &["--json"])?;
        parse_jobs(&payload)
    }

    fn nodes(&self) -> IngestResult<NodeSnapshot> {
        let payload = capture_json(&self.scontrol, &["show", "nodes", "--json"])?;
        parse_nodes(&payload)
    }

    fn partitions(&self) -> IngestResult<RawPartitionMap> {
        let payload = capture_json(&self.scontrol, &["show", "partitions", "--json"])?;
        parse_partitions(&payload)
    }

    fn stats(&self) -> IngestResult<StatsSnapshot> {
        let req_time = match capture_json(&self.sdiag, &["--json"]) {
            Ok(payload) => payload
                .get("statistics")
                .and_then(|s| field_u64(s, "req_time")),
            Err(err) => {
                warn!(error = %err, "controller statistics unavailable, using wall clock");
                None
            }
        };
        Ok(StatsSnapshot {
            req_time: req_time.unwrap_or_else(wall_clock_secs),
        })
    }
}

fn wall_clock_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Parse a `squeue --json` payload into a job snapshot. Records without a
/// job id are skipped with a log line; everything else degrades field by
/// field.
pub fn parse_jobs(payload: &Value) -> IngestResult<JobSnapshot> {
    let records = array_field(payload, "jobs", "squeue --json")?;
    let mut snapshot = JobSnapshot::new();

    for record in records {
        let Some(id) = field_u64(record, "job_id") else {
            debug!("skipping job record without job_id");
            continue;
        };
        let id = id as u32;

        snapshot.insert(
            id,
            JobInfo {
                id,
                state: state_string(record.get("job_state")),
                partition: field_str(record, "partition"),
                user_id: field_u64(record, "user_id").map(|u| u as u32),
                num_cpus: field_u64(record, "cpus")
                    .or_else(|| field_u64(record, "num_cpus"))
                    .unwrap_or(0) as u32,
                cpus_allocated: allocated_cpus(record),
                submit_time: field_u64(record, "submit_time"),
                state_reason: field_str(record, "state_reason"),
                name: field_str(record, "name").unwrap_or_default(),
                run_time: run_time_string(record),
            },
        );
    }

    Ok(snapshot)
}

/// Parse a `scontrol show nodes --json` payload into a node snapshot.
pub fn parse_nodes(payload: &Value) -> IngestResult<NodeSnapshot> {
    let records = array_field(payload, "nodes", "scontrol show nodes --json")?;
    let mut snapshot = NodeSnapshot::new();

    for record in records {
        let Some(name) = field_str(record, "name") else {
            debug!("skipping node record without name");
            continue;
        };

        snapshot.insert(
            name.clone(),
            NodeInfo {
                name,
                state: state_string(record.get("state")),
                cpus: field_u64(record, "cpus").unwrap_or(0) as u32,
                sockets: field_u64(record, "sockets").unwrap_or(1) as u32,
                cpu_load: field_u64(record, "cpu_load"),
            },
        );
    }

    Ok(snapshot)
}

/// Key raw partition records by name; normalization happens later.
pub fn parse_partitions(payload: &Value) -> IngestResult<RawPartitionMap> {
    let records = array_field(payload, "partitions", "scontrol show partitions --json")?;
    let mut raw = RawPartitionMap::new();

    for record in records {
        let Some(name) = field_str(record, "name") else {
            debug!("skipping partition record without name");
            continue;
        };
        raw.insert(name, record.clone());
    }

    Ok(raw)
}

fn array_field<'a>(payload: &'a Value, key: &str, command: &str) -> IngestResult<&'a Vec<Value>> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| IngestError::Malformed {
            command: command.to_string(),
            detail: format!("missing `{key}` array"),
        })
}

/// Per-node core allocation. Two shapes observed:
/// `job_resources.allocated_nodes[] = {nodename, cpus_used|cpus}` and
/// `job_resources.nodes.allocation[] = {name, cpus: {count}}`.
fn allocated_cpus(record: &Value) -> BTreeMap<String, u32> {
    let mut allocated = BTreeMap::new();
    let Some(resources) = record.get("job_resources") else {
        return allocated;
    };

    if let Some(entries) = resources.get("allocated_nodes").and_then(Value::as_array) {
        for entry in entries {
            if let Some(name) = field_str(entry, "nodename") {
                let cores = field_u64(entry, "cpus_used")
                    .or_else(|| field_u64(entry, "cpus"))
                    .unwrap_or(0);
                allocated.insert(name, cores as u32);
            }
        }
    } else if let Some(entries) = resources
        .get("nodes")
        .and_then(|n| n.get("allocation"))
        .and_then(Value::as_array)
    {
        for entry in entries {
            if let Some(name) = field_str(entry, "name") {
                let cores = entry
                    .get("cpus")
                    .and_then(|c| field_u64(c, "count"))
                    .unwrap_or(0);
                allocated.insert(name, cores as u32);
            }
        }
    }

    allocated
}

/// The scheduler's pre-formatted runtime when present, otherwise derived
/// from elapsed seconds in the scheduler's own `D-HH:MM:SS` notation.
fn run_time_string(record: &Value) -> String {
    if let Some(s) = field_str(record, "run_time_str") {
        return s;
    }
    match field_u64(record, "run_time") {
        Some(secs) => format_elapsed(secs),
        None => String::new(),
    }
}

fn format_elapsed(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;
    if days > 0 {
        format!("{days}-{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours}:{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn jobs_from_modern_payload() {
        let payload = json!({"jobs": [{
            "job_id": 101,
            "job_state": ["RUNNING"],
            "partition": "batch",
            "user_id": {"set": true, "number": 1200},
            "cpus": {"set": true, "number": 48},
            "submit_time": {"set": true, "number": 1700000000u64},
            "name": "solver",
            "job_resources": {"nodes": {"allocation": [
                {"name": "n-1", "cpus": {"count": 24}},
                {"name": "n-2", "cpus": {"count": 24}},
            ]}},
            "run_time": 3725,
        }]});

        let jobs = parse_jobs(&payload).unwrap();
        let job = &jobs[&101];
        assert_eq!(job.state, "RUNNING");
        assert_eq!(job.num_cpus, 48);
        assert_eq!(job.user_id, Some(1200));
        assert_eq!(job.cpus_allocated["n-1"], 24);
        assert_eq!(job.run_time, "1:02:05");
    }

    #[test]
    fn jobs_from_legacy_payload() {
        let payload = json!({"jobs": [{
            "job_id": 7,
            "job_state": "PENDING",
            "partition": "batch",
            "user_id": 1000,
            "num_cpus": 4,
            "state_reason": "Priority",
            "name": "qjob",
            "run_time_str": "0:00",
        }]});

        let jobs = parse_jobs(&payload).unwrap();
        let job = &jobs[&7];
        assert!(job.is_pending());
        assert_eq!(job.state_reason.as_deref(), Some("Priority"));
        assert_eq!(job.num_cpus, 4);
        assert!(job.cpus_allocated.is_empty());
        assert_eq!(job.run_time, "0:00");
    }

    #[test]
    fn job_without_id_is_skipped() {
        let payload = json!({"jobs": [{"name": "ghost"}, {"job_id": 2, "name": "real"}]});
        let jobs = parse_jobs(&payload).unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(jobs.contains_key(&2));
    }

    #[test]
    fn nodes_with_flag_states_and_sentinel_load() {
        let payload = json!({"nodes": [
            {"name": "n-1", "state": ["IDLE", "DRAIN"], "cpus": 48, "sockets": 2,
             "cpu_load": {"set": true, "number": 4294967294u64}},
            {"name": "n-2", "state": "MIXED", "cpus": 48, "sockets": 2},
        ]});

        let nodes = parse_nodes(&payload).unwrap();
        assert_eq!(nodes["n-1"].state, "IDLE+DRAIN");
        // The sentinel passes through raw; the classifier corrects it.
        assert_eq!(nodes["n-1"].cpu_load, Some(4294967294));
        assert_eq!(nodes["n-2"].cpu_load, None);
    }

    #[test]
    fn partitions_keyed_by_name() {
        let payload = json!({"partitions": [
            {"name": "batch", "total_nodes": 12},
            {"nodeless": true},
        ]});
        let raw = parse_partitions(&payload).unwrap();
        assert_eq!(raw.len(), 1);
        assert!(raw.contains_key("batch"));
    }

    #[test]
    fn missing_top_level_array_is_malformed() {
        assert!(parse_jobs(&json!({})).is_err());
        assert!(parse_nodes(&json!({"nodes": 3})).is_err());
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(0), "0:00:00");
        assert_eq!(format_elapsed(59), "0:00:59");
        assert_eq!(format_elapsed(3725), "1:02:05");
        assert_eq!(format_elapsed(2 * 86_400 + 3_600 + 61), "2-01:01:01");
    }
}
