//! Render error types.

use thiserror::Error;

/// Errors from the raster backend. A failed save is fatal for the cycle:
/// either the whole image is written or nothing is.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("canvas backend error: {0}")]
    Backend(String),
}

pub type RenderResult<T> = Result<T, RenderError>;
