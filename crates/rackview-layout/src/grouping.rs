//! Rack grouping.
//!
//! Nodes sort by cabinet key (name prefix, numeric suffix) and split into
//! at most `max_groups` contiguous chunks of `ceil(n / g)` nodes. Each
//! chunk is emitted in reverse order so the lowest-numbered node of a
//! column renders at the top when rows are drawn bottom-up.

use std::sync::OnceLock;

use regex::Regex;

/// One display column: a label and its nodes in draw order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeGroup {
    pub label: String,
    pub nodes: Vec<String>,
}

fn suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?)-(\d+)$").expect("literal pattern"))
}

/// Cabinet sort key: `"cn-12"` → `("cn", 12)`. Names without a numeric
/// suffix use the full name with suffix 0.
pub fn sort_key(name: &str) -> (String, u64) {
    if let Some(caps) = suffix_regex().captures(name) {
        if let Ok(suffix) = caps[2].parse::<u64>() {
            return (caps[1].to_string(), suffix);
        }
    }
    (name.to_string(), 0)
}

/// Split `names` into at most `max_groups` groups. Empty trailing chunks
/// are dropped rather than emitted as empty groups.
pub fn build_groups(names: &[String], max_groups: usize) -> Vec<NodeGroup> {
    let mut sorted = names.to_vec();
    sorted.sort_by_cached_key(|name| sort_key(name));
    if sorted.is_empty() {
        return Vec::new();
    }

    let n_groups = max_groups.min(sorted.len()).max(1);
    let chunk_size = sorted.len().div_ceil(n_groups);

    let mut groups = Vec::new();
    for (index, chunk) in sorted.chunks(chunk_size).enumerate() {
        groups.push(NodeGroup {
            label: format!("group {}", index + 1),
            nodes: chunk.iter().rev().cloned().collect(),
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sort_key_splits_prefix_and_numeric_suffix() {
        assert_eq!(sort_key("cn-12"), ("cn".to_string(), 12));
        assert_eq!(sort_key("rack2-node-7"), ("rack2-node".to_string(), 7));
        assert_eq!(sort_key("login"), ("login".to_string(), 0));
    }

    #[test]
    fn numeric_suffixes_sort_numerically() {
        let mut list = names(&["n-10", "n-9", "n-2"]);
        list.sort_by_cached_key(|n| sort_key(n));
        assert_eq!(list, names(&["n-2", "n-9", "n-10"]));
    }

    #[test]
    fn twelve_nodes_in_six_groups_of_two() {
        let input: Vec<String> = (1..=12).map(|i| format!("n-{i}")).collect();
        let groups = build_groups(&input, 6);

        assert_eq!(groups.len(), 6);
        for group in &groups {
            assert_eq!(group.nodes.len(), 2);
        }
        // Chunk [n-1, n-2] reversed.
        assert_eq!(groups[0].label, "group 1");
        assert_eq!(groups[0].nodes, names(&["n-2", "n-1"]));
        assert_eq!(groups[5].nodes, names(&["n-12", "n-11"]));
    }

    #[test]
    fn grouping_is_deterministic() {
        let input = names(&["n-3", "n-1", "n-2", "n-10", "n-7", "n-4", "n-5"]);
        let first = build_groups(&input, 3);
        let second = build_groups(&input, 3);
        assert_eq!(first, second);
    }

    #[test]
    fn group_sizes_differ_by_at_most_one_and_total_is_preserved() {
        let input: Vec<String> = (1..=13).map(|i| format!("n-{i}")).collect();
        let groups = build_groups(&input, 6);

        let total: usize = groups.iter().map(|g| g.nodes.len()).sum();
        assert_eq!(total, 13);

        let chunk = groups[0].nodes.len();
        for group in &groups[..groups.len() - 1] {
            assert_eq!(group.nodes.len(), chunk);
        }
        assert!(groups.last().unwrap().nodes.len() <= chunk);
    }

    #[test]
    fn empty_trailing_chunks_are_dropped() {
        // 13 nodes / 6 groups → chunks of 3 → only 5 non-empty groups.
        let input: Vec<String> = (1..=13).map(|i| format!("n-{i}")).collect();
        let groups = build_groups(&input, 6);
        assert_eq!(groups.len(), 5);
        assert!(groups.iter().all(|g| !g.nodes.is_empty()));
    }

    #[test]
    fn group_count_clamps_to_input_length() {
        let input = names(&["n-1", "n-2"]);
        let groups = build_groups(&input, 6);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(build_groups(&[], 6).is_empty());
    }

    #[test]
    fn every_node_lands_in_exactly_one_group() {
        let input: Vec<String> = (1..=50).map(|i| format!("cn-{i}")).collect();
        let groups = build_groups(&input, 6);

        let mut seen: Vec<&String> = groups.iter().flat_map(|g| g.nodes.iter()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 50);
    }
}
