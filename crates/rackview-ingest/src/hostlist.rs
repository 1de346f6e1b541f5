//! Hostlist expansion via `scontrol show hostnames`.

use rackview_core::NodeName;

use crate::error::IngestResult;
use crate::exec::capture_stdout;
use crate::HostlistExpander;

/// Expands compressed node-range strings by delegating to the scheduler's
/// own parser, one hostname per output line.
pub struct ScontrolHostlist {
    scontrol: String,
}

impl Default for ScontrolHostlist {
    fn default() -> Self {
        Self {
            scontrol: "scontrol".to_string(),
        }
    }
}

impl ScontrolHostlist {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostlistExpander for ScontrolHostlist {
    fn expand(&self, compressed: &str) -> IngestResult<Vec<NodeName>> {
        if compressed.trim().is_empty() {
            return Ok(Vec::new());
        }
        let stdout = capture_stdout(&self.scontrol, &["show", "hostnames", compressed])?;
        Ok(parse_hostnames(&stdout))
    }
}

fn parse_hostnames(stdout: &str) -> Vec<NodeName> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_trimmed_and_blanks_dropped() {
        let names = parse_hostnames("n-1\n  n-2 \n\nn-3\n");
        assert_eq!(names, vec!["n-1", "n-2", "n-3"]);
    }

    #[test]
    fn empty_range_never_spawns() {
        // An empty range must not shell out; a bogus binary proves it.
        let expander = ScontrolHostlist {
            scontrol: "rackview-test-no-such-binary".to_string(),
        };
        assert_eq!(expander.expand("   ").unwrap(), Vec::<String>::new());
    }
}
