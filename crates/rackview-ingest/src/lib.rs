//! rackview ingest — where snapshots come from.
//!
//! The aggregation core consumes four snapshots (jobs, nodes, partitions,
//! controller statistics) plus two lookup services (hostlist expansion,
//! user identity). This crate defines those seams as traits and provides
//! the subprocess-backed implementations used in production:
//!
//! - **`slurm`** — `SlurmCliSource`, snapshots via `squeue`/`scontrol`/`sdiag`
//!   with `--json` output
//! - **`hostlist`** — `ScontrolHostlist`, range expansion via
//!   `scontrol show hostnames`
//! - **`identity`** — `GetentDirectory`, uid resolution via `getent passwd`
//! - **`normalize`** — the partition normalizer (§ canonical partition shape)
//!
//! Any collaborator failure here is fatal for the cycle (`IngestError`),
//! except identity lookups, which miss softly by returning `None`.

use std::collections::BTreeMap;

use rackview_core::{JobSnapshot, NodeName, NodeSnapshot, StatsSnapshot, UserId};

pub mod error;
mod exec;
mod fields;
pub mod hostlist;
pub mod identity;
pub mod normalize;
pub mod slurm;

pub use error::{IngestError, IngestResult};
pub use hostlist::ScontrolHostlist;
pub use identity::GetentDirectory;
pub use normalize::normalize_partitions;
pub use slurm::SlurmCliSource;

/// Raw partition records as delivered by the source, keyed by name.
/// Field shapes vary across scheduler versions; only the normalizer
/// looks inside.
pub type RawPartitionMap = BTreeMap<String, serde_json::Value>;

/// The scheduler query layer. One call per snapshot kind per cycle; all
/// calls are blocking and a failure aborts the cycle.
pub trait ClusterSource {
    fn jobs(&self) -> IngestResult<JobSnapshot>;
    fn nodes(&self) -> IngestResult<NodeSnapshot>;
    fn partitions(&self) -> IngestResult<RawPartitionMap>;
    fn stats(&self) -> IngestResult<StatsSnapshot>;
}

/// Expands a compressed node-range string into an explicit ordered list
/// of hostnames. An empty range yields an empty list.
pub trait HostlistExpander {
    fn expand(&self, compressed: &str) -> IngestResult<Vec<NodeName>>;
}

/// Resolves numeric user ids to names. Misses are soft: callers substitute
/// a fallback (the uid as text) and continue.
pub trait UserDirectory {
    /// The account's login name.
    fn login_name(&self, uid: UserId) -> Option<String>;
    /// The account's human display name (first GECOS token).
    fn display_name(&self, uid: UserId) -> Option<String>;
}
