//! Arc listing command.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::Result;
use bvgraph_engine::{GraphView, LoadConfig};
use serde::Serialize;

use crate::output::Format;
use crate::{OutputFormat, StreamMode};

/// One list in JSON Lines output.
#[derive(Serialize)]
struct ListOutput<'a> {
    node: u64,
    successors: &'a [u64],
}

/// Run the print command.
///
/// Table format writes one `source -> target` line per arc; JSON writes one
/// object per node (JSON Lines), so output can be streamed.
pub fn run(path: &Path, mode: StreamMode, format: OutputFormat) -> Result<()> {
    let config = match mode {
        StreamMode::Memory => LoadConfig::sequential(),
        StreamMode::Mapped => LoadConfig::sequential().with_memory_map(true),
        StreamMode::Disk => LoadConfig::disk_stream(),
    };
    let graph = GraphView::open(path, &config)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let fmt: Format = format.into();
    for list in graph.open_sequential_cursor()? {
        let list = list?;
        match fmt {
            Format::Json => {
                serde_json::to_writer(
                    &mut out,
                    &ListOutput {
                        node: list.node(),
                        successors: list.successors(),
                    },
                )?;
                writeln!(out)?;
            }
            Format::Table => {
                for &target in list.successors() {
                    writeln!(out, "{} -> {target}", list.node())?;
                }
            }
        }
    }
    out.flush()?;
    Ok(())
}
