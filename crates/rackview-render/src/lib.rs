//! rackview render — from computed state to pixels.
//!
//! Split along the collaborator seam the rest of the pipeline relies on:
//!
//! - **`plan`** — the `DrawPlan` data model (shapes, colors, text blocks in
//!   normalized figure coordinates)
//! - **`compose`** — the dashboard composer: assembles classifier, metrics,
//!   and layout output into a `DrawPlan`; pure data assembly, no
//!   classification or metric computation
//! - **`bitmap`** — the raster backend that turns a plan into one PNG
//!
//! Nothing upstream of `bitmap` knows how drawing primitives work.

pub mod bitmap;
pub mod compose;
pub mod error;
pub mod plan;

pub use bitmap::BitmapCanvas;
pub use compose::{compose, format_pressure, format_wait, status_color};
pub use error::{RenderError, RenderResult};
pub use plan::{Color, DrawItem, DrawPlan, HAlign, TextBlock, VAlign};
