//! Integrity check over a whole graph.
//!
//! One sequential pass decodes every list and cross-checks what it finds
//! against the metadata: the arc count in the properties, the offset index
//! (when loaded), and, on a sample of nodes, the random-access decoder.

use bvgraph_common::types::NodeId;
use serde::Serialize;

use crate::view::GraphView;

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Stable identifier, e.g. `DECODE` or `ARC_COUNT`.
    pub code: String,
    /// What went wrong.
    pub message: String,
    /// Where, if it is tied to a node.
    pub context: Option<String>,
}

/// Outcome of [`verify`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    /// Problems that make the graph unusable or inconsistent.
    pub errors: Vec<Issue>,
    /// Oddities that do not affect decoding.
    pub warnings: Vec<Issue>,
    /// Lists decoded successfully.
    pub nodes_checked: u64,
    /// Sum of the decoded outdegrees.
    pub arcs_seen: u64,
}

impl VerifyReport {
    /// Returns true if no errors were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, code: &str, message: String, node: Option<NodeId>) {
        self.errors.push(Issue {
            code: code.to_string(),
            message,
            context: node.map(|n| format!("node {n}")),
        });
    }

    fn warning(&mut self, code: &str, message: String) {
        self.warnings.push(Issue {
            code: code.to_string(),
            message,
            context: None,
        });
    }
}

/// Tuning for [`verify`].
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Compare every `sample_stride`-th list against a random-access decode;
    /// 0 disables the comparison.
    pub sample_stride: u64,
    /// Stop recording (and checking) after this many errors.
    pub max_errors: usize,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            sample_stride: 1024,
            max_errors: 64,
        }
    }
}

/// Checks `graph` end to end. `progress` receives the number of lists
/// decoded so far after each one.
///
/// Never fails: problems, including ones that stop the pass, end up in the
/// report.
pub fn verify(
    graph: &GraphView,
    options: &VerifyOptions,
    mut progress: impl FnMut(u64),
) -> VerifyReport {
    let mut report = VerifyReport::default();
    let nodes = graph.vertex_count();

    let mut cursor = match graph.open_sequential_cursor() {
        Ok(cursor) => cursor,
        Err(e) => {
            report.error("OPEN", e.to_string(), None);
            return report;
        }
    };
    let offsets = graph.offsets();
    let mut random = match offsets {
        Some(_) if options.sample_stride > 0 => graph.open_random_cursor().ok(),
        _ => None,
    };

    let mut complete = false;
    while report.errors.len() < options.max_errors {
        let node = cursor.next_node();
        let position = cursor.bit_position();
        if let Some(index) = offsets {
            if node < nodes && index.get(node) != position {
                report.error(
                    "OFFSET_MISMATCH",
                    format!(
                        "index says bit {}, list starts at bit {position}",
                        index.get(node)
                    ),
                    Some(node),
                );
            }
        }

        let list = match cursor.advance() {
            Ok(Some(list)) => list,
            Ok(None) => {
                complete = true;
                break;
            }
            Err(e) => {
                report.error("DECODE", e.to_string(), Some(node));
                break;
            }
        };
        report.nodes_checked += 1;
        report.arcs_seen += list.degree();

        if let Some(random) = random.as_mut() {
            if node % options.sample_stride == 0 {
                match random.successors(node) {
                    Ok(other) if *other == *list.successors() => {}
                    Ok(other) => report.error(
                        "RANDOM_MISMATCH",
                        format!(
                            "random access gives {} successors, sequential {}",
                            other.len(),
                            list.degree()
                        ),
                        Some(node),
                    ),
                    Err(e) => report.error("RANDOM_DECODE", e.to_string(), Some(node)),
                }
            }
        }
        progress(report.nodes_checked);
    }

    if !complete {
        return report;
    }

    let end = cursor.bit_position();
    if report.arcs_seen != graph.edge_count() {
        report.error(
            "ARC_COUNT",
            format!(
                "properties declare {} arcs, lists hold {}",
                graph.edge_count(),
                report.arcs_seen
            ),
            None,
        );
    }
    if let Some(index) = offsets {
        if index.get(nodes) != end {
            report.error(
                "END_OFFSET",
                format!(
                    "index ends at bit {}, last list ends at bit {end}",
                    index.get(nodes)
                ),
                None,
            );
        }
    }
    let slack = graph.stream_bits().saturating_sub(end);
    if slack >= 8 {
        report.warning(
            "TRAILING_DATA",
            format!("{slack} bits follow the last list"),
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvgraph_common::types::AccessMode;
    use bvgraph_core::graph::{OffsetIndex, OffsetLayout, PropertyStore};
    use bvgraph_core::testing::{GraphEncoder, example_lists, web_like_lists};

    fn codes(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|i| i.code.as_str()).collect()
    }

    #[test]
    fn test_valid_graph() {
        let encoded = GraphEncoder::new().encode(&web_like_lists(300, 14));
        let graph =
            GraphView::from_bytes(encoded.properties, encoded.graph, AccessMode::RandomAccess)
                .unwrap();

        let mut calls = 0;
        let options = VerifyOptions {
            sample_stride: 1,
            ..VerifyOptions::default()
        };
        let report = verify(&graph, &options, |_| calls += 1);
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
        assert_eq!(report.nodes_checked, 300);
        assert_eq!(report.arcs_seen, graph.edge_count());
        assert_eq!(calls, 300);
    }

    #[test]
    fn test_arc_count_mismatch() {
        let encoded = GraphEncoder::new().encode(&example_lists());
        let wrong = PropertyStore::parse(&encoded.properties.render().replace("arcs=4", "arcs=7"))
            .unwrap();
        let graph = GraphView::from_bytes(wrong, encoded.graph, AccessMode::SequentialStream).unwrap();

        let report = verify(&graph, &VerifyOptions::default(), |_| {});
        assert_eq!(codes(&report.errors), vec!["ARC_COUNT"]);
    }

    #[test]
    fn test_truncated_stream() {
        let encoded = GraphEncoder::new().encode(&web_like_lists(120, 2));
        let short = encoded.graph[..encoded.graph.len() / 2].to_vec();
        let graph = GraphView::from_bytes(encoded.properties, short, AccessMode::SequentialStream)
            .unwrap();

        let report = verify(&graph, &VerifyOptions::default(), |_| {});
        assert_eq!(codes(&report.errors), vec!["DECODE"]);
        assert!(report.nodes_checked < 120);
        assert!(report.errors[0].context.is_some());
    }

    #[test]
    fn test_offset_mismatch() {
        let encoded = GraphEncoder::new().encode(&example_lists());
        let mut offsets = encoded.offsets.clone();
        offsets[2] -= 1;
        let index = OffsetIndex::from_offsets(offsets, 5, OffsetLayout::Plain).unwrap();
        let graph = GraphView::from_parts(encoded.properties, encoded.graph, index).unwrap();

        let report = verify(&graph, &VerifyOptions::default(), |_| {});
        assert!(codes(&report.errors).contains(&"OFFSET_MISMATCH"));
        assert_eq!(report.errors[0].context.as_deref(), Some("node 2"));
    }

    #[test]
    fn test_trailing_data_warning() {
        let encoded = GraphEncoder::new().encode(&example_lists());
        let mut padded = encoded.graph.clone();
        padded.extend_from_slice(&[0; 4]);
        let graph =
            GraphView::from_bytes(encoded.properties, padded, AccessMode::SequentialStream).unwrap();

        let report = verify(&graph, &VerifyOptions::default(), |_| {});
        assert!(report.is_valid());
        assert_eq!(codes(&report.warnings), vec!["TRAILING_DATA"]);
    }
}
