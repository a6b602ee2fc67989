//! Outdegree statistics command.

use std::path::Path;

use anyhow::{Context, Result};
use bvgraph_engine::{GraphView, LoadConfig, SequentialCursor};
use rayon::prelude::*;
use serde::Serialize;

use crate::OutputFormat;
use crate::output::{self, Format};

/// Degree statistics of one range of nodes; ranges merge associatively.
#[derive(Debug, Default, Clone, Copy)]
struct DegreeStats {
    nodes: u64,
    arcs: u64,
    max_outdegree: u64,
    max_outdegree_node: u64,
    zero_outdegree: u64,
    self_loops: u64,
}

impl DegreeStats {
    fn scan(cursor: SequentialCursor<'_>) -> bvgraph_common::Result<Self> {
        let mut stats = Self::default();
        for list in cursor {
            let list = list?;
            let degree = list.degree();
            stats.nodes += 1;
            stats.arcs += degree;
            if degree == 0 {
                stats.zero_outdegree += 1;
            }
            if degree > stats.max_outdegree {
                stats.max_outdegree = degree;
                stats.max_outdegree_node = list.node();
            }
            if list.successors().binary_search(&list.node()).is_ok() {
                stats.self_loops += 1;
            }
        }
        Ok(stats)
    }

    fn merge(self, other: Self) -> Self {
        let (max_outdegree, max_outdegree_node) = if other.max_outdegree > self.max_outdegree {
            (other.max_outdegree, other.max_outdegree_node)
        } else {
            (self.max_outdegree, self.max_outdegree_node)
        };
        Self {
            nodes: self.nodes + other.nodes,
            arcs: self.arcs + other.arcs,
            max_outdegree,
            max_outdegree_node,
            zero_outdegree: self.zero_outdegree + other.zero_outdegree,
            self_loops: self.self_loops + other.self_loops,
        }
    }
}

/// Statistics output.
#[derive(Serialize)]
struct StatsOutput {
    nodes: u64,
    arcs: u64,
    average_outdegree: f64,
    max_outdegree: u64,
    max_outdegree_node: u64,
    zero_outdegree: u64,
    self_loops: u64,
    bits_per_link: f64,
    parts: usize,
}

/// Run the stats command.
pub fn run(path: &Path, threads: Option<usize>, format: OutputFormat, quiet: bool) -> Result<()> {
    let graph = GraphView::open(path, &LoadConfig::sequential())?;

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder.build().context("failed to start worker threads")?;

    let (stats, parts) = pool.install(|| -> Result<(DegreeStats, usize)> {
        let cursors = graph.split_cursors(rayon::current_num_threads(), 1, 1)?;
        let parts = cursors.len();
        let stats = cursors
            .into_par_iter()
            .map(DegreeStats::scan)
            .try_reduce(DegreeStats::default, |a, b| Ok(a.merge(b)))?;
        Ok((stats, parts))
    })?;

    let output = StatsOutput {
        nodes: stats.nodes,
        arcs: stats.arcs,
        average_outdegree: if stats.nodes == 0 {
            0.0
        } else {
            stats.arcs as f64 / stats.nodes as f64
        },
        max_outdegree: stats.max_outdegree,
        max_outdegree_node: stats.max_outdegree_node,
        zero_outdegree: stats.zero_outdegree,
        self_loops: stats.self_loops,
        bits_per_link: if stats.arcs == 0 {
            0.0
        } else {
            graph.stream_bits() as f64 / stats.arcs as f64
        },
        parts,
    };

    let fmt: Format = format.into();
    match fmt {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            let items = vec![
                ("Nodes", output.nodes.to_string()),
                ("Arcs", output.arcs.to_string()),
                ("Average Outdegree", format!("{:.3}", output.average_outdegree)),
                (
                    "Max Outdegree",
                    format!("{} (node {})", output.max_outdegree, output.max_outdegree_node),
                ),
                ("Zero Outdegree", output.zero_outdegree.to_string()),
                ("Self Loops", output.self_loops.to_string()),
                ("Bits per Link", format!("{:.3}", output.bits_per_link)),
                ("Scan Parts", output.parts.to_string()),
            ];
            output::print_key_value_table(&items, quiet);
        }
    }

    if stats.arcs != graph.edge_count() {
        tracing::warn!(
            declared = graph.edge_count(),
            decoded = stats.arcs,
            "arc count differs from the properties file"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_first_maximum() {
        let a = DegreeStats {
            nodes: 2,
            arcs: 5,
            max_outdegree: 4,
            max_outdegree_node: 1,
            zero_outdegree: 0,
            self_loops: 1,
        };
        let b = DegreeStats {
            max_outdegree_node: 9,
            ..a
        };
        let merged = a.merge(b);
        assert_eq!(merged.nodes, 4);
        assert_eq!(merged.arcs, 10);
        assert_eq!(merged.max_outdegree_node, 1);
        assert_eq!(merged.self_loops, 2);
    }
}
