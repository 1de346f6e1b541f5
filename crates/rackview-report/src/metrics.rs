//! Metrics engine.
//!
//! A pure fold of (jobs, classified nodes, partitions) into the
//! `ClusterMetrics` summary. Every ratio carries an explicit guard:
//! `cluster_load_pct` is 0 when there are no cores, queue pressure is the
//! infinity sentinel when nothing runs, and the p90 wait is `None` when no
//! pending job has a submit time. Accounting mismatches are logged, never
//! fatal.

use tracing::warn;

use rackview_core::{JobInfo, NodeStatus, PartitionMap, ReportConfig};
use rackview_ingest::UserDirectory;

use crate::classify::ClassifiedNodes;

/// Why pending jobs have not started, counted by scheduler reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingReasons {
    pub priority: usize,
    pub dependency: usize,
    pub resources: usize,
    pub user_held: usize,
}

/// Cluster-wide summary for one cycle. Derived, immutable, recomputed
/// from scratch every run.
#[derive(Debug, Clone)]
pub struct ClusterMetrics {
    pub nodes_total: usize,
    pub nodes_idle: usize,
    pub nodes_alloc: usize,
    pub nodes_down: usize,
    pub nodes_misc: usize,
    pub nodes_missing: usize,

    pub cores_total: u64,
    pub cores_alloc: f64,
    /// Remainder of `cores_total - cores_alloc`; negative only when the
    /// source is inconsistent (warned, not clamped).
    pub cores_idle: f64,

    pub cluster_load_pct: f64,
    /// Mean per-node load percentage over allocated nodes.
    pub mean_load_alloc_pct: f64,
    /// Mean per-node load percentage over all in-partition nodes.
    pub mean_load_all_pct: f64,

    pub jobs_running: usize,
    pub jobs_pending: usize,
    pub pending: PendingReasons,

    /// pending / running; `f64::INFINITY` when nothing runs.
    pub queue_pressure: f64,
    /// Nearest-rank 90th percentile of pending wait, in seconds.
    pub p90_wait_secs: Option<u64>,

    pub top_user: String,
    pub top_user_cores: f64,

    /// Median cores per in-partition node (config fallback when empty).
    pub cores_per_node: u32,
    /// Median sockets per in-partition node, floored at 1.
    pub sockets_per_node: u32,
}

/// Compute the cycle's metrics. `now` is the controller's `req_time`.
pub fn compute_metrics(
    running: &[&JobInfo],
    pending: &[&JobInfo],
    classified: &ClassifiedNodes,
    partitions: &PartitionMap,
    target_partitions: &[String],
    users: &dyn UserDirectory,
    config: &ReportConfig,
    now: u64,
) -> ClusterMetrics {
    let divisor = config.hyperthread_divisor.max(1) as f64;

    // Per-node estimates resist outlier configs by using the median.
    let cores_per_node = median(classified.main.iter().map(|n| n.cpus).collect())
        .unwrap_or(config.cores_per_node);
    let sockets_per_node = median(classified.main.iter().map(|n| n.sockets).collect())
        .unwrap_or(config.sockets_per_node)
        .max(1);

    let nodes_total = classified.main.len();
    let nodes_idle = classified.count(NodeStatus::Idle);
    let nodes_alloc = classified.count(NodeStatus::Allocated);
    let nodes_down = classified.count(NodeStatus::Down);

    let targets: Vec<&rackview_core::PartitionInfo> = target_partitions
        .iter()
        .filter_map(|name| partitions.get(name))
        .collect();

    let reported_nodes: u64 = targets.iter().map(|p| u64::from(p.total_nodes)).sum();
    if reported_nodes != nodes_total as u64 {
        warn!(
            reported = reported_nodes,
            seen = nodes_total,
            "partition node count mismatch"
        );
    }
    if nodes_total != nodes_idle + nodes_alloc + nodes_down {
        warn!(
            total = nodes_total,
            idle = nodes_idle,
            alloc = nodes_alloc,
            down = nodes_down,
            "nodes not all accounted for"
        );
    }

    let mut cores_total: u64 = targets.iter().map(|p| u64::from(p.total_cores)).sum();
    if cores_total == 0 {
        cores_total = targets
            .iter()
            .map(|p| u64::from(p.total_nodes) * u64::from(cores_per_node))
            .sum();
    }

    let cores_alloc: f64 =
        running.iter().map(|j| f64::from(j.num_cpus)).sum::<f64>() / divisor;
    let cores_idle = cores_total as f64 - cores_alloc;
    if cores_idle < 0.0 {
        warn!(
            cores_total,
            cores_alloc, "allocated cores exceed partition total"
        );
    }

    let cluster_load_pct = if cores_total > 0 {
        cores_alloc / cores_total as f64 * 100.0
    } else {
        0.0
    };

    let mean_load_alloc_pct = mean(
        classified
            .main
            .iter()
            .filter(|n| n.status == NodeStatus::Allocated)
            .map(|n| n.load_pct),
    );
    let mean_load_all_pct = mean(classified.main.iter().map(|n| n.load_pct));

    let mut reasons = PendingReasons::default();
    for job in pending {
        match job.state_reason.as_deref() {
            Some("Priority") => reasons.priority += 1,
            Some("Dependency") => reasons.dependency += 1,
            Some("Resources") => reasons.resources += 1,
            Some("JobHeldUser") => reasons.user_held += 1,
            _ => {}
        }
    }

    let queue_pressure = if running.is_empty() {
        f64::INFINITY
    } else {
        pending.len() as f64 / running.len() as f64
    };

    let waits: Vec<u64> = pending
        .iter()
        .filter_map(|j| j.submit_time)
        .map(|submit| now.saturating_sub(submit))
        .collect();
    let p90_wait_secs = percentile_nearest_rank(&waits, 90.0);

    let (top_user, top_user_cores) = top_user(running, users, divisor);

    ClusterMetrics {
        nodes_total,
        nodes_idle,
        nodes_alloc,
        nodes_down,
        nodes_misc: classified.misc.len(),
        nodes_missing: classified.missing.len(),
        cores_total,
        cores_alloc,
        cores_idle,
        cluster_load_pct,
        mean_load_alloc_pct,
        mean_load_all_pct,
        jobs_running: running.len(),
        jobs_pending: pending.len(),
        pending: reasons,
        queue_pressure,
        p90_wait_secs,
        top_user,
        top_user_cores,
        cores_per_node,
        sockets_per_node,
    }
}

/// Per-user allocated cores, first-encountered order preserved so ties
/// resolve to the earliest user seen; strict `>` keeps the first maximum.
fn top_user(
    running: &[&JobInfo],
    users: &dyn UserDirectory,
    divisor: f64,
) -> (String, f64) {
    let mut user_cores: Vec<(String, f64)> = Vec::new();
    for job in running {
        let Some(uid) = job.user_id else {
            continue;
        };
        let name = users.login_name(uid).unwrap_or_else(|| uid.to_string());
        let cores = f64::from(job.num_cpus) / divisor;
        match user_cores.iter_mut().find(|(n, _)| *n == name) {
            Some((_, total)) => *total += cores,
            None => user_cores.push((name, cores)),
        }
    }

    let mut best: Option<(&str, f64)> = None;
    for (name, cores) in &user_cores {
        if best.is_none_or(|(_, b)| *cores > b) {
            best = Some((name.as_str(), *cores));
        }
    }
    match best {
        Some((name, cores)) => (name.to_string(), cores),
        None => ("n/a".to_string(), 0.0),
    }
}

/// Nearest-rank percentile: the `ceil(pct/100 * n)`-th smallest sample.
pub fn percentile_nearest_rank(samples: &[u64], pct: f64) -> Option<u64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    Some(sorted[rank.clamp(1, sorted.len()) - 1])
}

fn median(mut values: Vec<u32>) -> Option<u32> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 { 0.0 } else { sum / count as f64 }
}
