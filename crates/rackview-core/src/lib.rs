//! rackview core — domain types and configuration.
//!
//! Everything downstream (ingest, classification, metrics, layout,
//! rendering) shares the snapshot types and the immutable `ReportConfig`
//! defined here. This crate has no knowledge of where snapshots come from
//! or how the dashboard is drawn.

pub mod config;
pub mod types;

pub use config::ReportConfig;
pub use types::*;
