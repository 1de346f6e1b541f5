//! rackview.toml configuration parser.
//!
//! The whole cycle runs off one immutable `ReportConfig` value passed into
//! every component; there are no module-level tunables. Every field has a
//! default, so an empty file (or no file at all) yields a working config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Partitions the report covers; nodes outside them are "misc".
    pub partitions: Vec<String>,
    /// Dashboard header title.
    pub title: String,
    /// Hostname prefix stripped from node labels in the rack columns.
    pub strip_prefix: String,
    /// Output image path, overwritten each cycle.
    pub output_image: PathBuf,
    /// Output raster size in pixels, independent of input size.
    pub image_width: u32,
    pub image_height: u32,
    /// Maximum display columns for the rack layout.
    pub groups: usize,
    /// Fallback cores per node when the node snapshot is empty.
    pub cores_per_node: u32,
    /// Fallback sockets per node when the node snapshot is empty.
    pub sockets_per_node: u32,
    /// Set to 2 to fold hyperthreads into physical-core equivalents.
    pub hyperthread_divisor: u32,
    /// Node state strings counted as idle.
    pub idle_states: Vec<String>,
    /// Node state strings counted as allocated.
    pub alloc_states: Vec<String>,
    /// Node state strings counted as down.
    pub down_states: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            partitions: vec!["batch".to_string()],
            title: "Cluster Status".to_string(),
            strip_prefix: String::new(),
            output_image: PathBuf::from("cluster_status.png"),
            image_width: 1890,
            image_height: 1120,
            groups: 6,
            cores_per_node: 48,
            sockets_per_node: 2,
            hyperthread_divisor: 1,
            idle_states: vec!["IDLE".to_string()],
            alloc_states: vec!["ALLOCATED".to_string(), "MIXED".to_string()],
            down_states: [
                "DOWN",
                "DRAINED",
                "ERROR",
                "FAIL",
                "FAILING",
                "POWER_DOWN",
                "IDLE+DRAIN",
                "DOWN*+DRAIN",
                "UNKNOWN",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ReportConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ReportConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}
