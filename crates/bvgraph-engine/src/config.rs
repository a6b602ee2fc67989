//! Load configuration for graph views.

use bvgraph_common::types::AccessMode;
use bvgraph_core::graph::OffsetLayout;
use serde::{Deserialize, Serialize};

/// Default buffer for disk streaming (64 KiB).
pub const DEFAULT_DISK_BUFFER_SIZE: usize = 64 * 1024;

/// Where the offset index of a random-access view comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OffsetSource {
    /// Read `<basename>.offsets`; fail if it is missing or malformed.
    File,
    /// Rebuild the index with one sequential pass over the graph.
    Scan,
    /// Read the offsets file, falling back to a scan.
    #[default]
    FileOrScan,
}

/// How a graph is opened.
///
/// # Examples
///
/// ```
/// use bvgraph_engine::{LoadConfig, OffsetSource};
/// use bvgraph_core::graph::OffsetLayout;
///
/// let config = LoadConfig::random_access()
///     .with_memory_map(true)
///     .with_offset_layout(OffsetLayout::EliasFano)
///     .with_offsets_source(OffsetSource::File);
/// assert!(config.memory_map);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Access mode of the resulting view.
    pub mode: AccessMode,
    /// In-memory layout of the offset index.
    pub offsets: OffsetLayout,
    /// Source of the offset index (random access only).
    pub offsets_source: OffsetSource,
    /// Map the graph file instead of reading it onto the heap.
    pub memory_map: bool,
    /// Read buffer size for disk streaming.
    pub disk_buffer_size: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self::random_access()
    }
}

impl LoadConfig {
    /// Resident graph with an offset index.
    #[must_use]
    pub fn random_access() -> Self {
        Self {
            mode: AccessMode::RandomAccess,
            offsets: OffsetLayout::Plain,
            offsets_source: OffsetSource::FileOrScan,
            memory_map: false,
            disk_buffer_size: DEFAULT_DISK_BUFFER_SIZE,
        }
    }

    /// Resident graph, sequential access only.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            mode: AccessMode::SequentialStream,
            ..Self::random_access()
        }
    }

    /// Nothing resident; every pass streams the file.
    #[must_use]
    pub fn disk_stream() -> Self {
        Self {
            mode: AccessMode::DiskStream,
            ..Self::random_access()
        }
    }

    /// Sets the access mode.
    pub fn with_mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the offset index layout.
    pub fn with_offset_layout(mut self, layout: OffsetLayout) -> Self {
        self.offsets = layout;
        self
    }

    /// Sets where offsets are loaded from.
    pub fn with_offsets_source(mut self, source: OffsetSource) -> Self {
        self.offsets_source = source;
        self
    }

    /// Enables or disables memory mapping.
    pub fn with_memory_map(mut self, memory_map: bool) -> Self {
        self.memory_map = memory_map;
        self
    }

    /// Sets the disk streaming buffer size (at least one byte).
    pub fn with_disk_buffer_size(mut self, size: usize) -> Self {
        self.disk_buffer_size = size.max(1);
        self
    }
}
