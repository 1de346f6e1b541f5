//! Subprocess plumbing shared by the CLI-backed collaborators.

use std::process::Command;

use crate::error::{IngestError, IngestResult};

/// Run a command and return its stdout as UTF-8 text. Non-zero exit is an
/// `IngestError::CommandFailed` carrying the first stderr line.
pub(crate) fn capture_stdout(program: &str, args: &[&str]) -> IngestResult<String> {
    let rendered = render(program, args);
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| IngestError::Spawn {
            command: rendered.clone(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(IngestError::CommandFailed {
            command: rendered,
            status: output.status.to_string(),
            stderr: stderr.lines().next().unwrap_or_default().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a command and parse its stdout as JSON.
pub(crate) fn capture_json(program: &str, args: &[&str]) -> IngestResult<serde_json::Value> {
    let stdout = capture_stdout(program, args)?;
    serde_json::from_str(&stdout).map_err(|source| IngestError::Parse {
        command: render(program, args),
        source,
    })
}

pub(crate) fn render(program: &str, args: &[&str]) -> String {
    let mut rendered = program.to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg);
    }
    rendered
}
