//! rackview report — the aggregation core.
//!
//! Two pure stages over one cycle's snapshots:
//!
//! - **`classify`** — assigns every in-partition node to exactly one status
//!   bucket, corrects the load sentinel, and attaches current-job
//!   annotations (by value, nothing shared is mutated)
//! - **`metrics`** — folds jobs, classified nodes, and partitions into the
//!   `ClusterMetrics` summary the dashboard panels print
//!
//! Accounting inconsistencies are logged as warnings and never block the
//! cycle.

pub mod classify;
pub mod metrics;

pub use classify::{ClassifiedNode, ClassifiedNodes, CurrentJob, classify_nodes, status_for};
pub use metrics::{ClusterMetrics, PendingReasons, compute_metrics, percentile_nearest_rank};
