//! Ingest error types.

use thiserror::Error;

/// Errors raised while querying collaborators. All of these abort the
/// current cycle; there is no retry logic anywhere in the core.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("failed to parse `{command}` output: {source}")]
    Parse {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed `{command}` output: {detail}")]
    Malformed { command: String, detail: String },
}

pub type IngestResult<T> = Result<T, IngestError>;
