//! Successor lookup command.

use std::path::Path;

use anyhow::Result;
use bvgraph_engine::{GraphView, LoadConfig};
use comfy_table::{Cell, Color};
use serde::Serialize;

use crate::OutputFormat;
use crate::output::{self, Format};

/// Successors of one node.
#[derive(Serialize)]
struct SuccessorsOutput {
    node: u64,
    outdegree: u64,
    successors: Vec<u64>,
}

/// Run the successors command.
pub fn run(path: &Path, nodes: &[u64], format: OutputFormat, quiet: bool) -> Result<()> {
    let graph = GraphView::open(path, &LoadConfig::random_access())?;
    let mut cursor = graph.open_random_cursor()?;

    let mut output = Vec::with_capacity(nodes.len());
    for &node in nodes {
        let list = cursor.get(node)?;
        output.push(SuccessorsOutput {
            node,
            outdegree: list.degree(),
            successors: list.successors().to_vec(),
        });
    }

    let fmt: Format = format.into();
    match fmt {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            if !quiet {
                let mut table = output::table_with_header(&["Node", "Outdegree", "Successors"]);
                for entry in &output {
                    let list = entry
                        .successors
                        .iter()
                        .map(u64::to_string)
                        .collect::<Vec<_>>()
                        .join(" ");
                    table.add_row(vec![
                        Cell::new(entry.node).fg(Color::Green),
                        Cell::new(entry.outdegree),
                        Cell::new(list),
                    ]);
                }
                println!("{table}");
            }
        }
    }

    Ok(())
}
