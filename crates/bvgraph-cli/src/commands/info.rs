//! Graph info command.

use std::fs;
use std::path::Path;

use anyhow::Result;
use bvgraph_core::graph::{OffsetLayout, PropertyStore};
use bvgraph_engine::view::with_suffix;
use bvgraph_engine::{LoadConfig, MemoryEstimate};
use serde::Serialize;

use crate::OutputFormat;
use crate::output::{self, Format};

/// Metadata about a graph, read without decoding it.
#[derive(Serialize)]
struct GraphInfoOutput {
    nodes: u64,
    arcs: u64,
    window_size: u64,
    max_ref_count: Option<u64>,
    min_interval_length: u64,
    zeta_k: u32,
    compression_flags: String,
    bits_per_link: Option<f64>,
    graph_bytes: u64,
    offsets_bytes: Option<u64>,
    memory_random_access: usize,
    memory_random_access_elias_fano: usize,
    memory_sequential: usize,
}

/// Run the info command.
pub fn run(path: &Path, format: OutputFormat, quiet: bool) -> Result<()> {
    let properties = PropertyStore::from_file(with_suffix(path, ".properties"))?;
    let graph_bytes = fs::metadata(with_suffix(path, ".graph"))?.len();
    let offsets_bytes = fs::metadata(with_suffix(path, ".offsets")).ok().map(|m| m.len());

    let estimate = |config: LoadConfig| MemoryEstimate::for_config(&properties, graph_bytes, &config).total();

    let output = GraphInfoOutput {
        nodes: properties.nodes(),
        arcs: properties.arcs(),
        window_size: properties.window_size(),
        max_ref_count: properties.max_ref_count(),
        min_interval_length: properties.min_interval_length(),
        zeta_k: properties.zeta_k(),
        compression_flags: properties.flags().render(properties.zeta_k()),
        bits_per_link: properties.bits_per_link(),
        graph_bytes,
        offsets_bytes,
        memory_random_access: estimate(LoadConfig::random_access()),
        memory_random_access_elias_fano: estimate(
            LoadConfig::random_access().with_offset_layout(OffsetLayout::EliasFano),
        ),
        memory_sequential: estimate(LoadConfig::sequential()),
    };

    let fmt: Format = format.into();
    match fmt {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            let flags = if output.compression_flags.is_empty() {
                "(defaults)".to_string()
            } else {
                output.compression_flags.clone()
            };
            let items = vec![
                ("Nodes", output.nodes.to_string()),
                ("Arcs", output.arcs.to_string()),
                ("Window Size", output.window_size.to_string()),
                (
                    "Max Ref Count",
                    output
                        .max_ref_count
                        .map_or_else(|| "unbounded".to_string(), |m| m.to_string()),
                ),
                ("Min Interval Length", output.min_interval_length.to_string()),
                ("Zeta k", output.zeta_k.to_string()),
                ("Compression Flags", flags),
                (
                    "Bits per Link",
                    output
                        .bits_per_link
                        .map_or_else(|| "N/A".to_string(), |b| format!("{b:.3}")),
                ),
                ("Graph File", output::format_bytes(output.graph_bytes as usize)),
                (
                    "Offsets File",
                    output
                        .offsets_bytes
                        .map_or_else(|| "missing".to_string(), |b| output::format_bytes(b as usize)),
                ),
                (
                    "Memory (random access)",
                    output::format_bytes(output.memory_random_access),
                ),
                (
                    "Memory (random access, Elias-Fano)",
                    output::format_bytes(output.memory_random_access_elias_fano),
                ),
                ("Memory (sequential)", output::format_bytes(output.memory_sequential)),
            ];
            output::print_key_value_table(&items, quiet);
        }
    }

    Ok(())
}
