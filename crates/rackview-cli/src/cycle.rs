//! One report cycle, start to image.
//!
//! Strictly forward: snapshots → normalizer → classifier → metrics →
//! layout → composer → bitmap. Every step is blocking; a fatal error stops
//! the cycle at the point of occurrence and nothing is written. There is
//! no retry anywhere — the scheduler that invokes us owns the cadence.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{info, warn};

use rackview_core::{JobInfo, ReportConfig};
use rackview_ingest::{
    ClusterSource, HostlistExpander, IngestError, UserDirectory, normalize_partitions,
};
use rackview_layout::build_groups;
use rackview_render::{BitmapCanvas, DrawPlan, RenderError, compose};
use rackview_report::{classify_nodes, compute_metrics};

/// Fatal conditions for one cycle. Anything else is logged and absorbed.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Run a full cycle: build the plan and write the image.
pub fn run(
    config: &ReportConfig,
    source: &dyn ClusterSource,
    hostlist: &dyn HostlistExpander,
    users: &dyn UserDirectory,
) -> Result<(), CycleError> {
    let plan = build_plan(config, source, hostlist, users)?;
    BitmapCanvas::new(&config.output_image).render(&plan)?;
    info!(path = %config.output_image.display(), "dashboard written");
    Ok(())
}

/// Everything except rasterization: snapshot, aggregate, compose.
pub fn build_plan(
    config: &ReportConfig,
    source: &dyn ClusterSource,
    hostlist: &dyn HostlistExpander,
    users: &dyn UserDirectory,
) -> Result<DrawPlan, CycleError> {
    let jobs = source.jobs()?;
    let stats = source.stats()?;
    let nodes = source.nodes()?;
    let raw_partitions = source.partitions()?;
    let partitions = normalize_partitions(&raw_partitions, hostlist)?;
    info!(req_time = stats.req_time, jobs = jobs.len(), nodes = nodes.len(), "snapshots loaded");

    let absent: Vec<&String> = config
        .partitions
        .iter()
        .filter(|name| !partitions.contains_key(*name))
        .collect();
    if !absent.is_empty() {
        warn!(?absent, "configured partitions missing from snapshot");
    }
    let targets: Vec<String> = config
        .partitions
        .iter()
        .filter(|name| partitions.contains_key(*name))
        .cloned()
        .collect();
    if targets.is_empty() {
        let available: Vec<&String> = partitions.keys().take(10).collect();
        return Err(CycleError::Configuration(format!(
            "none of the configured partitions were found; available partitions include: {available:?}"
        )));
    }

    // In-partition node names, expansion order, deduplicated.
    let mut target_names = Vec::new();
    for name in &targets {
        target_names.extend(hostlist.expand(&partitions[name].nodes)?);
    }
    let mut seen = BTreeSet::new();
    target_names.retain(|name| seen.insert(name.clone()));

    let running: Vec<&JobInfo> = jobs
        .values()
        .filter(|j| j.is_running() && j.in_partitions(&targets))
        .collect();
    let pending: Vec<&JobInfo> = jobs
        .values()
        .filter(|j| j.is_pending() && j.in_partitions(&targets))
        .collect();

    let classified = classify_nodes(&target_names, &nodes, &running, users, config);
    info!(
        total = classified.main.len(),
        idle = classified.count(rackview_core::NodeStatus::Idle),
        allocated = classified.count(rackview_core::NodeStatus::Allocated),
        down = classified.count(rackview_core::NodeStatus::Down),
        misc = classified.misc.len(),
        "nodes classified"
    );

    let metrics = compute_metrics(
        &running,
        &pending,
        &classified,
        &partitions,
        &targets,
        users,
        config,
        stats.req_time,
    );
    info!(
        cores_total = metrics.cores_total,
        cores_alloc = metrics.cores_alloc,
        cluster_load_pct = metrics.cluster_load_pct,
        running = metrics.jobs_running,
        pending = metrics.jobs_pending,
        "metrics computed"
    );

    let groups = build_groups(&target_names, config.groups);
    for group in &groups {
        info!(group = %group.label, nodes = group.nodes.len(), "rack group");
    }

    Ok(compose(&classified, &metrics, &groups, config, stats.req_time))
}
