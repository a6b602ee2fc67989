//! The graph handle.

use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use bvgraph_common::types::{AccessMode, NodeId};
use bvgraph_common::utils::error::{Error, Result};
use bvgraph_core::codec::BitReader;
use bvgraph_core::graph::{
    OffsetIndex, OffsetLayout, PropertyStore, SuccessorDecoder, check_capacity,
};
use bytes::Bytes;
use memmap2::Mmap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{LoadConfig, OffsetSource};
use crate::cursor::{self, RandomCursor, SequentialCursor};

/// Appends `suffix` to a basename without touching its extension.
pub fn with_suffix(basename: &Path, suffix: &str) -> PathBuf {
    let mut path = basename.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

/// Where the bitstream lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Backing {
    /// Read onto the heap.
    Heap,
    /// Memory-mapped from the graph file.
    Mapped,
    /// Left on disk, streamed per pass.
    Disk,
}

impl Backing {
    /// Returns a human-readable name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Heap => "heap",
            Self::Mapped => "mapped",
            Self::Disk => "disk",
        }
    }
}

impl fmt::Display for Backing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
pub(crate) enum Stream {
    Memory(Bytes),
    Disk {
        path: PathBuf,
        len_bytes: u64,
        buffer_size: usize,
    },
}

#[allow(unsafe_code)]
fn map_file(path: &Path) -> Result<Bytes> {
    let file = File::open(path)?;
    // SAFETY: graph files are read-only inputs; the mapping is never written
    // and the file must not be truncated while the view is alive.
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(Bytes::from_owner(mmap))
}

/// A loaded BVGraph.
///
/// Owns the properties, the bitstream (or its location on disk) and, in
/// random-access mode, the offset index. All methods take `&self`; a view
/// can be shared across threads, each thread opening its own cursors.
pub struct GraphView {
    properties: PropertyStore,
    decoder: SuccessorDecoder,
    stream: Stream,
    backing: Backing,
    offsets: Option<OffsetIndex>,
    mode: AccessMode,
}

impl fmt::Debug for GraphView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphView")
            .field("nodes", &self.vertex_count())
            .field("arcs", &self.edge_count())
            .field("mode", &self.mode)
            .field("backing", &self.backing)
            .field("stream_bits", &self.stream_bits())
            .finish_non_exhaustive()
    }
}

impl GraphView {
    /// Opens `<basename>.properties`, `<basename>.graph` and, in
    /// random-access mode, `<basename>.offsets`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a required file cannot be read,
    /// [`Error::Format`] for malformed metadata, and
    /// [`Error::CorruptStream`] if the offsets have to be rebuilt and the
    /// graph does not decode.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bvgraph_engine::{GraphView, LoadConfig};
    ///
    /// let graph = GraphView::open("cnr-2000", &LoadConfig::random_access())?;
    /// let successors = graph.successors(42)?;
    /// # Ok::<(), bvgraph_common::Error>(())
    /// ```
    pub fn open(basename: impl AsRef<Path>, config: &LoadConfig) -> Result<Self> {
        let basename = basename.as_ref();
        let properties = PropertyStore::from_file(with_suffix(basename, ".properties"))?;
        let graph_path = with_suffix(basename, ".graph");

        let (stream, backing) = match config.mode {
            AccessMode::DiskStream => {
                let len_bytes = fs::metadata(&graph_path)?.len();
                let stream = Stream::Disk {
                    path: graph_path,
                    len_bytes,
                    buffer_size: config.disk_buffer_size,
                };
                (stream, Backing::Disk)
            }
            _ if config.memory_map => (Stream::Memory(map_file(&graph_path)?), Backing::Mapped),
            _ => (Stream::Memory(Bytes::from(fs::read(&graph_path)?)), Backing::Heap),
        };

        let mut view = Self::assemble(properties, stream, backing, config.mode)?;
        if config.mode.supports_random_access() {
            view.offsets = Some(view.load_offsets(basename, config)?);
        }

        info!(
            basename = %basename.display(),
            nodes = view.vertex_count(),
            arcs = view.edge_count(),
            mode = %view.mode,
            backing = %view.backing,
            "loaded graph"
        );
        Ok(view)
    }

    /// Builds a view over an in-memory bitstream. In random-access mode the
    /// offset index is rebuilt with one pass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedMode`] for [`AccessMode::DiskStream`],
    /// which needs a file, [`Error::Format`] if the properties cannot
    /// describe `bytes`, and [`Error::CorruptStream`] if the index scan
    /// fails.
    pub fn from_bytes(
        properties: PropertyStore,
        bytes: impl Into<Bytes>,
        mode: AccessMode,
    ) -> Result<Self> {
        if !mode.is_resident() {
            return Err(Error::UnsupportedMode {
                operation: "from_bytes",
                mode,
            });
        }
        let mut view =
            Self::assemble(properties, Stream::Memory(bytes.into()), Backing::Heap, mode)?;
        if mode.supports_random_access() {
            view.offsets = Some(view.scan_offsets(OffsetLayout::Plain)?);
        }
        Ok(view)
    }

    /// Builds a random-access view from a bitstream and a prepared index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if the index does not match the graph.
    pub fn from_parts(
        properties: PropertyStore,
        bytes: impl Into<Bytes>,
        offsets: OffsetIndex,
    ) -> Result<Self> {
        let mut view = Self::assemble(
            properties,
            Stream::Memory(bytes.into()),
            Backing::Heap,
            AccessMode::RandomAccess,
        )?;
        if offsets.nodes() != view.vertex_count() {
            return Err(Error::format(format!(
                "offset index covers {} nodes, graph has {}",
                offsets.nodes(),
                view.vertex_count()
            )));
        }
        let end = offsets.get(offsets.nodes());
        if end > view.stream_bits() {
            return Err(Error::format(format!(
                "offset index ends at bit {end}, past the {}-bit graph",
                view.stream_bits()
            )));
        }
        view.offsets = Some(offsets);
        Ok(view)
    }

    fn assemble(
        properties: PropertyStore,
        stream: Stream,
        backing: Backing,
        mode: AccessMode,
    ) -> Result<Self> {
        properties.check_limits()?;
        let view = Self {
            decoder: SuccessorDecoder::new(&properties),
            properties,
            stream,
            backing,
            offsets: None,
            mode,
        };
        check_capacity(view.vertex_count(), view.stream_bits())?;
        Ok(view)
    }

    fn load_offsets(&self, basename: &Path, config: &LoadConfig) -> Result<OffsetIndex> {
        let path = with_suffix(basename, ".offsets");
        let index = match config.offsets_source {
            OffsetSource::File => self.read_offsets_file(&path, config.offsets)?,
            OffsetSource::Scan => self.scan_offsets(config.offsets)?,
            OffsetSource::FileOrScan => match self.read_offsets_file(&path, config.offsets) {
                Ok(index) => index,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "offsets file unusable, rebuilding the index with a scan"
                    );
                    self.scan_offsets(config.offsets)?
                }
            },
        };
        debug!(
            layout = ?index.layout(),
            bytes = index.memory_bytes(),
            "offset index ready"
        );
        Ok(index)
    }

    fn read_offsets_file(&self, path: &Path, layout: OffsetLayout) -> Result<OffsetIndex> {
        let data = fs::read(path)?;
        let mut reader = BitReader::from_slice(&data);
        OffsetIndex::read(
            &mut reader,
            self.vertex_count(),
            self.properties.flags().offsets,
            self.stream_bits(),
            layout,
        )
    }

    /// Records the start of every list with one sequential pass.
    fn scan_offsets(&self, layout: OffsetLayout) -> Result<OffsetIndex> {
        debug!(nodes = self.vertex_count(), "scanning graph for offsets");
        let mut cursor = self.open_sequential_cursor()?;
        let mut offsets = Vec::with_capacity(self.vertex_count() as usize + 1);
        offsets.push(cursor.bit_position());
        while cursor.advance()?.is_some() {
            offsets.push(cursor.bit_position());
        }
        OffsetIndex::from_offsets(offsets, self.vertex_count(), layout)
    }

    /// Number of nodes.
    #[must_use]
    pub fn vertex_count(&self) -> u64 {
        self.properties.nodes()
    }

    /// Number of arcs.
    #[must_use]
    pub fn edge_count(&self) -> u64 {
        self.properties.arcs()
    }

    /// Graph parameters.
    #[must_use]
    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    /// Offset index, present in random-access mode.
    #[must_use]
    pub fn offsets(&self) -> Option<&OffsetIndex> {
        self.offsets.as_ref()
    }

    /// Access mode.
    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Where the bitstream is held.
    #[must_use]
    pub fn backing(&self) -> Backing {
        self.backing
    }

    /// Length of the bitstream in bits (including final padding).
    #[must_use]
    pub fn stream_bits(&self) -> u64 {
        match &self.stream {
            Stream::Memory(bytes) => bytes.len() as u64 * 8,
            Stream::Disk { len_bytes, .. } => len_bytes * 8,
        }
    }

    /// Bytes held in memory by the bitstream and the index.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        let stream = match (&self.stream, self.backing) {
            (Stream::Memory(bytes), Backing::Heap) => bytes.len(),
            _ => 0,
        };
        stream + self.offsets.as_ref().map_or(0, OffsetIndex::memory_bytes)
    }

    /// Whether `id` names a node of this graph.
    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        u64::try_from(id).is_ok_and(|id| id < self.vertex_count())
    }

    /// Successor list of `node`.
    ///
    /// Opens a throwaway [`RandomCursor`]; loops over many nodes should open
    /// one cursor and reuse it.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedMode`] outside random-access mode,
    /// [`Error::OutOfRange`] for bad ids, [`Error::CorruptStream`] if the
    /// list does not decode.
    pub fn successors(&self, node: NodeId) -> Result<Vec<NodeId>> {
        self.require_offsets("successors")?;
        Ok(self.open_random_cursor()?.successors(node)?.to_vec())
    }

    /// Outdegree of `node`.
    pub fn outdegree(&self, node: NodeId) -> Result<u64> {
        self.require_offsets("outdegree")?;
        self.open_random_cursor()?.outdegree(node)
    }

    /// Cursor over all lists in order. In disk mode this re-opens the file.
    pub fn open_sequential_cursor(&self) -> Result<SequentialCursor<'_>> {
        SequentialCursor::new(self)
    }

    /// Cursor for lookups by node id.
    pub fn open_random_cursor(&self) -> Result<RandomCursor<'_>> {
        RandomCursor::new(self)
    }

    /// Up to `parts` cursors over consecutive ranges of `0..N` with similar
    /// `node_weight * nodes + edge_weight * arcs` cost. Together they visit
    /// every node exactly once.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedMode`] in disk mode.
    pub fn split_cursors(
        &self,
        parts: usize,
        node_weight: u64,
        edge_weight: u64,
    ) -> Result<Vec<SequentialCursor<'_>>> {
        cursor::split(self, parts, node_weight, edge_weight)
    }

    pub(crate) fn decoder(&self) -> &SuccessorDecoder {
        &self.decoder
    }

    pub(crate) fn stream(&self) -> &Stream {
        &self.stream
    }

    pub(crate) fn resident_bytes(&self) -> Option<&[u8]> {
        match &self.stream {
            Stream::Memory(bytes) => Some(bytes.as_ref()),
            Stream::Disk { .. } => None,
        }
    }

    pub(crate) fn require_offsets(&self, operation: &'static str) -> Result<&OffsetIndex> {
        self.offsets.as_ref().ok_or(Error::UnsupportedMode {
            operation,
            mode: self.mode,
        })
    }

    pub(crate) fn check_node(&self, node: NodeId) -> Result<()> {
        if node >= self.vertex_count() {
            return Err(Error::OutOfRange {
                node,
                nodes: self.vertex_count(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvgraph_core::codec::Code;
    use bvgraph_core::graph::CompressionFlags;
    use bvgraph_core::testing::{EncodedGraph, GraphEncoder, example_lists, web_like_lists};
    use tempfile::TempDir;

    fn on_disk(encoded: &EncodedGraph, with_offsets: bool) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let base = encoded.write_files(dir.path(), "fixture", with_offsets).unwrap();
        (dir, base)
    }

    fn all_lists(graph: &GraphView) -> Vec<Vec<NodeId>> {
        graph
            .open_sequential_cursor()
            .unwrap()
            .map(|s| s.unwrap().successors().to_vec())
            .collect()
    }

    #[test]
    fn test_example_graph() {
        let encoded = GraphEncoder::new().encode(&example_lists());
        let graph =
            GraphView::from_bytes(encoded.properties, encoded.graph, AccessMode::RandomAccess)
                .unwrap();

        assert_eq!(graph.vertex_count(), 5);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.successors(0).unwrap(), vec![1, 2]);
        assert_eq!(graph.successors(1).unwrap(), vec![2]);
        assert!(graph.successors(2).unwrap().is_empty());
        assert_eq!(graph.successors(3).unwrap(), vec![4]);
        assert_eq!(graph.outdegree(0).unwrap(), 2);
        assert!(matches!(
            graph.successors(5),
            Err(Error::OutOfRange { node: 5, nodes: 5 })
        ));
    }

    #[test]
    fn test_contains() {
        let encoded = GraphEncoder::new().encode(&example_lists());
        let graph =
            GraphView::from_bytes(encoded.properties, encoded.graph, AccessMode::SequentialStream)
                .unwrap();
        assert!(graph.contains(0));
        assert!(graph.contains(4));
        assert!(!graph.contains(5));
        assert!(!graph.contains(-1));
        assert!(!graph.contains(i64::MIN));
    }

    #[test]
    fn test_sequential_mode_rejects_random_access() {
        let encoded = GraphEncoder::new().encode(&example_lists());
        let graph =
            GraphView::from_bytes(encoded.properties, encoded.graph, AccessMode::SequentialStream)
                .unwrap();
        assert!(graph.offsets().is_none());
        assert!(matches!(
            graph.successors(0),
            Err(Error::UnsupportedMode {
                operation: "successors",
                mode: AccessMode::SequentialStream
            })
        ));
        assert!(matches!(graph.outdegree(0), Err(Error::UnsupportedMode { .. })));
    }

    #[test]
    fn test_from_bytes_rejects_disk_mode() {
        let encoded = GraphEncoder::new().encode(&example_lists());
        assert!(matches!(
            GraphView::from_bytes(encoded.properties, encoded.graph, AccessMode::DiskStream),
            Err(Error::UnsupportedMode { .. })
        ));
    }

    #[test]
    fn test_truncated_stream_is_corrupt() {
        let encoded = GraphEncoder::new().encode(&web_like_lists(100, 4));
        let short = encoded.graph[..encoded.graph.len() / 3].to_vec();
        assert!(matches!(
            GraphView::from_bytes(encoded.properties, short, AccessMode::RandomAccess),
            Err(Error::CorruptStream(_))
        ));
    }

    #[test]
    fn test_implausible_properties_fail_to_load() {
        let encoded = GraphEncoder::new().encode(&example_lists());
        let text = encoded.properties.render();

        let huge_nodes =
            PropertyStore::parse(&text.replace("nodes=5\n", "nodes=9223372036854775807\n"))
                .unwrap();
        assert!(matches!(
            GraphView::from_bytes(huge_nodes, encoded.graph.clone(), AccessMode::RandomAccess),
            Err(Error::Format(_))
        ));

        let huge_window = encoded.properties.clone().with_window_size(u64::MAX);
        assert!(matches!(
            GraphView::from_bytes(huge_window, encoded.graph.clone(), AccessMode::SequentialStream),
            Err(Error::Format(_))
        ));

        let (_dir, base) = on_disk(&encoded, true);
        fs::write(
            with_suffix(&base, ".properties"),
            text.replace("windowsize=7\n", "windowsize=18446744073709551615\n"),
        )
        .unwrap();
        assert!(matches!(
            GraphView::open(&base, &LoadConfig::sequential()),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_scanned_offsets_match_encoder() {
        let encoded = GraphEncoder::new().encode(&web_like_lists(250, 8));
        let graph = GraphView::from_bytes(
            encoded.properties.clone(),
            encoded.graph.clone(),
            AccessMode::RandomAccess,
        )
        .unwrap();
        let index = graph.offsets().unwrap();
        for (node, &offset) in encoded.offsets.iter().enumerate() {
            assert_eq!(index.get(node as u64), offset);
        }
    }

    #[test]
    fn test_from_parts_validates_index() {
        let encoded = GraphEncoder::new().encode(&example_lists());
        let good = OffsetIndex::from_offsets(encoded.offsets.clone(), 5, OffsetLayout::Plain).unwrap();
        let graph =
            GraphView::from_parts(encoded.properties.clone(), encoded.graph.clone(), good).unwrap();
        assert_eq!(graph.successors(3).unwrap(), vec![4]);

        let short = OffsetIndex::from_offsets(vec![0, 1, 2], 2, OffsetLayout::Plain).unwrap();
        assert!(matches!(
            GraphView::from_parts(encoded.properties, encoded.graph, short),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_open_with_offsets_file() {
        let lists = web_like_lists(300, 12);
        let encoded = GraphEncoder::new().encode(&lists);
        let (_dir, base) = on_disk(&encoded, true);

        let config = LoadConfig::random_access().with_offsets_source(OffsetSource::File);
        let graph = GraphView::open(&base, &config).unwrap();
        assert_eq!(graph.backing(), Backing::Heap);
        assert_eq!(graph.offsets().unwrap().get(300), encoded.offsets[300]);
        for node in [0, 17, 150, 299] {
            assert_eq!(graph.successors(node).unwrap(), lists[node as usize]);
        }
    }

    #[test]
    fn test_delta_coded_offsets_file() {
        let flags = CompressionFlags::parse("OFFSETS_DELTA|RESIDUALS_DELTA", 3).unwrap();
        let lists = web_like_lists(120, 6);
        let encoded = GraphEncoder::new().with_flags(flags).encode(&lists);
        let (_dir, base) = on_disk(&encoded, true);

        let config = LoadConfig::random_access().with_offsets_source(OffsetSource::File);
        let graph = GraphView::open(&base, &config).unwrap();
        assert_eq!(graph.properties().flags().offsets, Code::Delta);
        for node in 0..=120 {
            assert_eq!(graph.offsets().unwrap().get(node), encoded.offsets[node as usize]);
        }
        assert_eq!(all_lists(&graph), lists);
    }

    #[test]
    fn test_offsets_file_without_final_entry() {
        let lists = web_like_lists(50, 2);
        let encoded = GraphEncoder::new().encode(&lists);
        let (dir, base) = on_disk(&encoded, false);
        fs::write(with_suffix(&base, ".offsets"), encoded.offsets_file(false)).unwrap();

        let config = LoadConfig::random_access().with_offsets_source(OffsetSource::File);
        let graph = GraphView::open(&base, &config).unwrap();
        assert_eq!(graph.offsets().unwrap().get(50), graph.stream_bits());
        assert_eq!(graph.successors(49).unwrap(), lists[49]);
        drop(dir);
    }

    #[test]
    fn test_missing_offsets_file() {
        let lists = web_like_lists(80, 6);
        let encoded = GraphEncoder::new().encode(&lists);
        let (_dir, base) = on_disk(&encoded, false);

        let strict = LoadConfig::random_access().with_offsets_source(OffsetSource::File);
        assert!(matches!(GraphView::open(&base, &strict), Err(Error::Io(_))));

        let graph = GraphView::open(&base, &LoadConfig::random_access()).unwrap();
        assert_eq!(graph.offsets().unwrap().get(80), encoded.offsets[80]);
        assert_eq!(graph.successors(40).unwrap(), lists[40]);
    }

    #[test]
    fn test_memory_mapped() {
        let lists = web_like_lists(200, 31);
        let encoded = GraphEncoder::new().encode(&lists);
        let (_dir, base) = on_disk(&encoded, true);

        let config = LoadConfig::random_access()
            .with_memory_map(true)
            .with_offset_layout(OffsetLayout::EliasFano);
        let graph = GraphView::open(&base, &config).unwrap();
        assert_eq!(graph.backing(), Backing::Mapped);
        assert_eq!(graph.offsets().unwrap().layout(), OffsetLayout::EliasFano);
        assert_eq!(all_lists(&graph), lists);
        assert_eq!(graph.successors(123).unwrap(), lists[123]);
    }

    #[test]
    fn test_disk_stream() {
        let lists = web_like_lists(300, 17);
        let encoded = GraphEncoder::new().encode(&lists);
        let (_dir, base) = on_disk(&encoded, false);

        let config = LoadConfig::disk_stream().with_disk_buffer_size(64);
        let graph = GraphView::open(&base, &config).unwrap();
        assert_eq!(graph.backing(), Backing::Disk);
        assert_eq!(graph.memory_bytes(), 0);

        // Every pass re-reads the file
        assert_eq!(all_lists(&graph), lists);
        assert_eq!(all_lists(&graph), lists);

        assert!(matches!(graph.successors(0), Err(Error::UnsupportedMode { .. })));
        assert!(matches!(
            graph.split_cursors(2, 1, 1),
            Err(Error::UnsupportedMode { .. })
        ));
    }

    #[test]
    fn test_missing_graph_file() {
        let encoded = GraphEncoder::new().encode(&example_lists());
        let (_dir, base) = on_disk(&encoded, true);
        fs::remove_file(with_suffix(&base, ".graph")).unwrap();
        assert!(matches!(
            GraphView::open(&base, &LoadConfig::sequential()),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_with_suffix_keeps_dots() {
        assert_eq!(
            with_suffix(Path::new("/data/eu-2005.hc"), ".graph"),
            PathBuf::from("/data/eu-2005.hc.graph")
        );
    }

    #[test]
    fn test_view_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        fn assert_send<T: Send>() {}
        assert_send_sync::<GraphView>();
        assert_send::<SequentialCursor<'static>>();
        assert_send::<RandomCursor<'static>>();
    }
}
