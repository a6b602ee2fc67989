//! Memory needed to load a graph.

use bvgraph_common::types::AccessMode;
use bvgraph_core::graph::{OffsetIndex, PropertyStore};
use serde::Serialize;

use crate::config::LoadConfig;

/// Bytes a graph will occupy once loaded with a given configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryEstimate {
    /// The bitstream; zero when it stays on disk.
    pub graph_bytes: usize,
    /// The offset index; zero outside random-access mode.
    pub offsets_bytes: usize,
}

impl MemoryEstimate {
    /// Estimates the footprint of loading a graph whose `.graph` file is
    /// `graph_file_bytes` long.
    ///
    /// Elias-Fano sizes are bounded by the largest possible offset: the
    /// graph's bit length when known, otherwise `arcs * bitsperlink`.
    #[must_use]
    pub fn for_config(properties: &PropertyStore, graph_file_bytes: u64, config: &LoadConfig) -> Self {
        let graph_bytes = match config.mode {
            AccessMode::DiskStream => 0,
            _ => graph_file_bytes as usize,
        };

        let offsets_bytes = if config.mode.supports_random_access() {
            let max_offset = if graph_file_bytes > 0 {
                graph_file_bytes * 8
            } else {
                properties
                    .bits_per_link()
                    .map_or(0, |bpl| (bpl * properties.arcs() as f64).ceil() as u64)
            };
            OffsetIndex::estimate_bytes(properties.nodes(), max_offset, config.offsets)
        } else {
            0
        };

        Self {
            graph_bytes,
            offsets_bytes,
        }
    }

    /// Total bytes.
    #[must_use]
    pub fn total(&self) -> usize {
        self.graph_bytes + self.offsets_bytes
    }
}
