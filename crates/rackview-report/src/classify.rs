//! Node classifier.
//!
//! Consumes the immutable node snapshot and produces new `ClassifiedNode`
//! values: status bucket, corrected load, per-node load percentage, and
//! the current-job annotation. Status is computed once through an explicit
//! ordered precedence (idle, then down, then allocated); the first match
//! wins and the node is never re-examined.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use rackview_core::{
    JobInfo, LOAD_OVERFLOW_SENTINEL, NodeName, NodeSnapshot, NodeStatus, ReportConfig, UserId,
};
use rackview_ingest::UserDirectory;

/// Annotation for the job a node is currently hosting. A node is expected
/// to host at most one attributable job in this view; the first running
/// job encountered wins.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentJob {
    /// Owner display name, or the uid as text when identity lookup misses.
    pub owner: String,
    pub job_name: String,
    pub run_time: String,
}

/// One in-partition node after classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedNode {
    pub name: NodeName,
    pub state: String,
    pub cpus: u32,
    pub sockets: u32,
    /// Load counter with the overflow sentinel corrected to 0.
    pub load: u64,
    /// `load / (cpus / hyperthread divisor)`, as a percentage.
    pub load_pct: f64,
    pub status: NodeStatus,
    pub current_job: Option<CurrentJob>,
}

/// Classifier output for one cycle.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedNodes {
    /// In-partition nodes, in expanded-range order, deduplicated.
    pub main: Vec<ClassifiedNode>,
    /// Snapshot nodes outside the target partitions (counted only).
    pub misc: Vec<NodeName>,
    /// Names in the partition range that the node snapshot never reported.
    pub missing: Vec<NodeName>,
}

impl ClassifiedNodes {
    pub fn count(&self, status: NodeStatus) -> usize {
        self.main.iter().filter(|n| n.status == status).count()
    }

    pub fn get(&self, name: &str) -> Option<&ClassifiedNode> {
        self.main.iter().find(|n| n.name == name)
    }
}

/// Ordered status precedence: idle, down, allocated, first match wins.
/// Unrecognized states land in `Unclassified` and are surfaced by the
/// metrics engine's accounting warning.
pub fn status_for(state: &str, config: &ReportConfig) -> NodeStatus {
    if config.idle_states.iter().any(|s| s == state) {
        NodeStatus::Idle
    } else if config.down_states.iter().any(|s| s == state) {
        NodeStatus::Down
    } else if config.alloc_states.iter().any(|s| s == state) {
        NodeStatus::Allocated
    } else {
        NodeStatus::Unclassified
    }
}

/// Correct the uint32 overflow sentinel to 0; an absent reading is 0.
pub fn normalize_load(cpu_load: Option<u64>) -> u64 {
    match cpu_load {
        Some(LOAD_OVERFLOW_SENTINEL) | None => 0,
        Some(load) => load,
    }
}

/// Classify every node in `target_names` (the expanded partition ranges,
/// in order) against the snapshot, and attach current-job annotations from
/// the running jobs.
pub fn classify_nodes(
    target_names: &[NodeName],
    nodes: &NodeSnapshot,
    running_jobs: &[&JobInfo],
    users: &dyn UserDirectory,
    config: &ReportConfig,
) -> ClassifiedNodes {
    let target_set: BTreeSet<&str> = target_names.iter().map(String::as_str).collect();

    // Job annotations first: jobs iterate in ascending-id order, each
    // job's allocation in node-name order, so the "first job wins" rule
    // is deterministic. Identity lookups are cached per uid.
    let mut annotations: BTreeMap<&str, CurrentJob> = BTreeMap::new();
    let mut display_cache: BTreeMap<UserId, String> = BTreeMap::new();
    for job in running_jobs {
        let Some(uid) = job.user_id else {
            debug!(job = job.id, "running job has no user id, skipping annotation");
            continue;
        };
        for node_name in job.cpus_allocated.keys() {
            if !target_set.contains(node_name.as_str()) {
                continue;
            }
            if !nodes.contains_key(node_name) {
                debug!(node = %node_name, job = job.id, "allocation references unknown node");
                continue;
            }
            if annotations.contains_key(node_name.as_str()) {
                continue;
            }
            let owner = display_cache
                .entry(uid)
                .or_insert_with(|| users.display_name(uid).unwrap_or_else(|| uid.to_string()))
                .clone();
            annotations.insert(
                node_name.as_str(),
                CurrentJob {
                    owner,
                    job_name: job.name.clone(),
                    run_time: job.run_time.clone(),
                },
            );
        }
    }

    let divisor = config.hyperthread_divisor.max(1);
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut main = Vec::new();
    let mut missing = Vec::new();

    for name in target_names {
        if !seen.insert(name.as_str()) {
            continue;
        }
        let Some(info) = nodes.get(name) else {
            warn!(node = %name, "node in partition range but absent from snapshot");
            missing.push(name.clone());
            continue;
        };

        let load = normalize_load(info.cpu_load);
        let effective_cores = info.cpus as f64 / divisor as f64;
        let load_pct = if effective_cores > 0.0 {
            load as f64 / effective_cores
        } else {
            0.0
        };

        main.push(ClassifiedNode {
            name: info.name.clone(),
            state: info.state.clone(),
            cpus: info.cpus,
            sockets: info.sockets,
            load,
            load_pct,
            status: status_for(&info.state, config),
            current_job: annotations.remove(name.as_str()),
        });
    }

    let misc = nodes
        .keys()
        .filter(|name| !target_set.contains(name.as_str()))
        .cloned()
        .collect();

    ClassifiedNodes {
        main,
        misc,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rackview_core::NodeInfo;
    use rackview_core::UserId;

    struct NoUsers;

    impl UserDirectory for NoUsers {
        fn login_name(&self, _uid: UserId) -> Option<String> {
            None
        }
        fn display_name(&self, _uid: UserId) -> Option<String> {
            None
        }
    }

    struct OneUser;

    impl UserDirectory for OneUser {
        fn login_name(&self, _uid: UserId) -> Option<String> {
            Some("jdoe".to_string())
        }
        fn display_name(&self, _uid: UserId) -> Option<String> {
            Some("Jane Doe".to_string())
        }
    }

    fn make_node(name: &str, state: &str, load: Option<u64>) -> NodeInfo {
        NodeInfo {
            name: name.to_string(),
            state: state.to_string(),
            cpus: 48,
            sockets: 2,
            cpu_load: load,
        }
    }

    fn make_job(id: u32, uid: Option<u32>, nodes: &[&str]) -> JobInfo {
        JobInfo {
            id,
            state: "RUNNING".to_string(),
            partition: Some("batch".to_string()),
            user_id: uid,
            num_cpus: 48,
            cpus_allocated: nodes.iter().map(|n| (n.to_string(), 48)).collect(),
            submit_time: None,
            state_reason: None,
            name: format!("job-{id}"),
            run_time: "1:00:00".to_string(),
        }
    }

    fn snapshot(nodes: Vec<NodeInfo>) -> NodeSnapshot {
        nodes.into_iter().map(|n| (n.name.clone(), n)).collect()
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn buckets_are_disjoint_and_exhaustive() {
        let config = ReportConfig::default();
        let nodes = snapshot(vec![
            make_node("n-1", "IDLE", Some(0)),
            make_node("n-2", "MIXED", Some(10)),
            make_node("n-3", "DOWN*+DRAIN", None),
            make_node("n-4", "WEIRD_STATE", None),
            make_node("login-1", "IDLE", None),
        ]);
        let target = names(&["n-1", "n-2", "n-3", "n-4", "n-5"]);

        let classified = classify_nodes(&target, &nodes, &[], &NoUsers, &config);

        assert_eq!(classified.main.len(), 4);
        assert_eq!(classified.count(NodeStatus::Idle), 1);
        assert_eq!(classified.count(NodeStatus::Allocated), 1);
        assert_eq!(classified.count(NodeStatus::Down), 1);
        assert_eq!(classified.count(NodeStatus::Unclassified), 1);
        assert_eq!(classified.misc, vec!["login-1"]);
        assert_eq!(classified.missing, vec!["n-5"]);

        // Union of buckets covers main exactly once.
        let bucketed: usize = [
            NodeStatus::Idle,
            NodeStatus::Allocated,
            NodeStatus::Down,
            NodeStatus::Unclassified,
        ]
        .iter()
        .map(|s| classified.count(*s))
        .sum();
        assert_eq!(bucketed, classified.main.len());
    }

    #[test]
    fn precedence_is_idle_then_down_then_allocated() {
        let mut config = ReportConfig::default();
        // Overlapping sets: the idle list wins over both others.
        config.down_states.push("IDLE".to_string());
        config.alloc_states.push("IDLE".to_string());
        assert_eq!(status_for("IDLE", &config), NodeStatus::Idle);

        // Down wins over allocated.
        config.alloc_states.push("FAILING".to_string());
        assert_eq!(status_for("FAILING", &config), NodeStatus::Down);
    }

    #[test]
    fn overflow_sentinel_becomes_zero() {
        assert_eq!(normalize_load(Some(LOAD_OVERFLOW_SENTINEL)), 0);
        assert_eq!(normalize_load(None), 0);
        assert_eq!(normalize_load(Some(4200)), 4200);

        let config = ReportConfig::default();
        let nodes = snapshot(vec![make_node("n-1", "MIXED", Some(LOAD_OVERFLOW_SENTINEL))]);
        let classified = classify_nodes(&names(&["n-1"]), &nodes, &[], &NoUsers, &config);
        assert_eq!(classified.main[0].load, 0);
        assert_eq!(classified.main[0].load_pct, 0.0);
    }

    #[test]
    fn load_pct_uses_effective_cores() {
        let config = ReportConfig::default();
        let nodes = snapshot(vec![make_node("n-1", "MIXED", Some(2400))]);
        let classified = classify_nodes(&names(&["n-1"]), &nodes, &[], &NoUsers, &config);
        // 2400 / (48 / 1) = 50%.
        assert_eq!(classified.main[0].load_pct, 50.0);
    }

    #[test]
    fn first_job_wins_annotation() {
        let config = ReportConfig::default();
        let nodes = snapshot(vec![make_node("n-1", "ALLOCATED", Some(0))]);
        let first = make_job(10, Some(1000), &["n-1"]);
        let second = make_job(20, Some(2000), &["n-1"]);

        let classified = classify_nodes(
            &names(&["n-1"]),
            &nodes,
            &[&first, &second],
            &OneUser,
            &config,
        );

        let current = classified.main[0].current_job.as_ref().unwrap();
        assert_eq!(current.job_name, "job-10");
        assert_eq!(current.owner, "Jane Doe");
        assert_eq!(current.run_time, "1:00:00");
    }

    #[test]
    fn unresolved_uid_falls_back_to_numeric_text() {
        let config = ReportConfig::default();
        let nodes = snapshot(vec![make_node("n-1", "ALLOCATED", Some(0))]);
        let job = make_job(10, Some(4242), &["n-1"]);

        let classified = classify_nodes(&names(&["n-1"]), &nodes, &[&job], &NoUsers, &config);
        assert_eq!(
            classified.main[0].current_job.as_ref().unwrap().owner,
            "4242"
        );
    }

    #[test]
    fn allocation_outside_target_is_ignored() {
        let config = ReportConfig::default();
        let nodes = snapshot(vec![
            make_node("n-1", "ALLOCATED", Some(0)),
            make_node("gpu-1", "ALLOCATED", Some(0)),
        ]);
        let job = make_job(10, Some(1000), &["gpu-1", "n-9"]);

        let classified = classify_nodes(&names(&["n-1"]), &nodes, &[&job], &OneUser, &config);
        assert!(classified.main[0].current_job.is_none());
    }

    #[test]
    fn duplicate_target_names_classify_once() {
        let config = ReportConfig::default();
        let nodes = snapshot(vec![make_node("n-1", "IDLE", None)]);
        let classified =
            classify_nodes(&names(&["n-1", "n-1"]), &nodes, &[], &NoUsers, &config);
        assert_eq!(classified.main.len(), 1);
    }
}
