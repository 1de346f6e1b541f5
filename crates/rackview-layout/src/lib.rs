//! rackview layout — the rack layout planner.
//!
//! Turns the ordered in-partition node list into display geometry:
//!
//! - **`grouping`** — splits nodes into fixed display columns with a
//!   cabinet-aware sort (name prefix + numeric suffix)
//! - **`geometry`** — per-node core-cell grid (which cells are filled at a
//!   given load, and where)
//!
//! Everything here is pure and deterministic; running the planner twice on
//! the same input yields identical output. The grouping is purely visual
//! and has no relation to physical topology.

pub mod geometry;
pub mod grouping;

pub use geometry::{CoreCell, core_grid, filled_cells, socket_band};
pub use grouping::{NodeGroup, build_groups, sort_key};
