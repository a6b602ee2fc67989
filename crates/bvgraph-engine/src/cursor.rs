//! Cursors over successor lists.
//!
//! | Cursor | Modes | Order | Reference lists from |
//! |--------|-------|-------|----------------------|
//! | [`SequentialCursor`] | all | ascending ids | ring of the last `W + 1` lists |
//! | [`RandomCursor`] | random access | any | iterative chain walk plus a small cache |
//!
//! Cursors borrow the [`GraphView`] and own all of their decode state, so any
//! number of them can run at once, on any threads. None of them is `Sync`;
//! hand each thread its own.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use bvgraph_common::types::{AccessMode, NodeId};
use bvgraph_common::utils::error::{Error, Result};
use bvgraph_core::codec::{BitReader, ByteSource, ReadSource, SeekableSource, SliceSource};
use bvgraph_core::graph::{DecodeScratch, ListHeader, OffsetIndex, SuccessorDecoder};
use smallvec::SmallVec;

use crate::view::{GraphView, Stream};

/// One decoded list, detached from the cursor that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Successors {
    node: NodeId,
    list: Arc<[NodeId]>,
}

impl Successors {
    /// The node whose list this is.
    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Outdegree of the node.
    #[inline]
    #[must_use]
    pub fn degree(&self) -> u64 {
        self.list.len() as u64
    }

    /// Successors in strictly increasing order.
    #[inline]
    #[must_use]
    pub fn successors(&self) -> &[NodeId] {
        &self.list
    }

    /// Splits into `(node, degree, successors)`.
    #[must_use]
    pub fn into_parts(self) -> (NodeId, u64, Arc<[NodeId]>) {
        let degree = self.degree();
        (self.node, degree, self.list)
    }
}

/// Fixed-size table of recently decoded lists, slot `node % len`.
#[derive(Debug, Clone)]
struct ReferenceWindow {
    slots: Vec<Option<(NodeId, Arc<[NodeId]>)>>,
}

impl ReferenceWindow {
    fn new(window_size: u64) -> Self {
        Self {
            slots: vec![None; window_size as usize + 1],
        }
    }

    fn get(&self, node: NodeId) -> Option<&Arc<[NodeId]>> {
        match &self.slots[(node % self.slots.len() as u64) as usize] {
            Some((n, list)) if *n == node => Some(list),
            _ => None,
        }
    }

    fn insert(&mut self, node: NodeId, list: Arc<[NodeId]>) {
        let slot = (node % self.slots.len() as u64) as usize;
        self.slots[slot] = Some((node, list));
    }
}

/// Bytes behind a sequential cursor.
#[derive(Debug)]
enum CursorSource<'g> {
    Memory(SliceSource<'g>),
    Disk {
        reader: ReadSource<BufReader<File>>,
        len_bytes: u64,
    },
}

impl ByteSource for CursorSource<'_> {
    #[inline]
    fn next_byte(&mut self) -> Result<Option<u8>> {
        match self {
            Self::Memory(s) => s.next_byte(),
            Self::Disk { reader, .. } => reader.next_byte(),
        }
    }

    #[inline]
    fn next_u32(&mut self) -> Result<Option<u32>> {
        match self {
            Self::Memory(s) => s.next_u32(),
            Self::Disk { reader, .. } => reader.next_u32(),
        }
    }
}

impl SeekableSource for CursorSource<'_> {
    fn seek_byte(&mut self, byte: u64) -> Result<()> {
        match self {
            Self::Memory(s) => s.seek_byte(byte),
            Self::Disk { .. } => Err(Error::UnsupportedMode {
                operation: "seek",
                mode: AccessMode::DiskStream,
            }),
        }
    }

    fn len_bytes(&self) -> u64 {
        match self {
            Self::Memory(s) => s.len_bytes(),
            Self::Disk { len_bytes, .. } => *len_bytes,
        }
    }
}

/// Forward cursor yielding every list of a node range in order.
///
/// Works in every access mode. After the range is exhausted, or after a
/// decode error, the cursor yields nothing more.
///
/// # Examples
///
/// ```no_run
/// use bvgraph_engine::{GraphView, LoadConfig};
///
/// let graph = GraphView::open("web-2001", &LoadConfig::sequential())?;
/// for list in graph.open_sequential_cursor()? {
///     let list = list?;
///     println!("{} has {} successors", list.node(), list.degree());
/// }
/// # Ok::<(), bvgraph_common::Error>(())
/// ```
#[derive(Debug)]
pub struct SequentialCursor<'g> {
    graph: &'g GraphView,
    reader: BitReader<CursorSource<'g>>,
    decoder: SuccessorDecoder,
    scratch: DecodeScratch,
    window: ReferenceWindow,
    next: NodeId,
    end: NodeId,
    done: bool,
}

impl<'g> SequentialCursor<'g> {
    pub(crate) fn new(graph: &'g GraphView) -> Result<Self> {
        let source = match graph.stream() {
            Stream::Memory(bytes) => CursorSource::Memory(SliceSource::new(bytes)),
            Stream::Disk {
                path,
                len_bytes,
                buffer_size,
            } => {
                let file = File::open(path)?;
                CursorSource::Disk {
                    reader: ReadSource::new(BufReader::with_capacity(*buffer_size, file)),
                    len_bytes: *len_bytes,
                }
            }
        };
        Ok(Self {
            graph,
            reader: BitReader::new(source),
            decoder: *graph.decoder(),
            scratch: DecodeScratch::new(),
            window: ReferenceWindow::new(graph.properties().window_size()),
            next: 0,
            end: graph.vertex_count(),
            done: false,
        })
    }

    /// Next node this cursor will decode.
    #[must_use]
    pub fn next_node(&self) -> NodeId {
        self.next
    }

    /// End (exclusive) of the range this cursor covers.
    #[must_use]
    pub fn end_node(&self) -> NodeId {
        self.end
    }

    /// Bit offset of the next list in the stream.
    #[must_use]
    pub fn bit_position(&self) -> u64 {
        self.reader.position()
    }

    /// Decodes the next list, or returns `None` once the range is done.
    pub fn advance(&mut self) -> Result<Option<Successors>> {
        if self.done || self.next >= self.end {
            self.done = true;
            return Ok(None);
        }
        let node = self.next;
        match self.decode(node) {
            Ok(list) => {
                self.next += 1;
                Ok(Some(Successors { node, list }))
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    fn decode(&mut self, node: NodeId) -> Result<Arc<[NodeId]>> {
        let header = self.decoder.read_header(node, &mut self.reader)?;
        let reference = match header.reference_node() {
            Some(r) => Some(Arc::clone(self.window.get(r).ok_or_else(|| {
                Error::corrupt(format!(
                    "node {node} references node {r}, which is not in the window"
                ))
            })?)),
            None => None,
        };
        let list: Arc<[NodeId]> = Arc::from(self.decoder.read_body(
            &header,
            reference.as_deref(),
            &mut self.reader,
            &mut self.scratch,
        )?);
        self.window.insert(node, Arc::clone(&list));
        Ok(list)
    }

    /// Copies this cursor's position and window into an independent cursor.
    /// Only resident streams can be forked.
    fn fork(&self) -> Result<Self> {
        let bytes = self.graph.resident_bytes().ok_or(Error::UnsupportedMode {
            operation: "split_cursors",
            mode: self.graph.mode(),
        })?;
        let mut reader = BitReader::new(CursorSource::Memory(SliceSource::new(bytes)));
        reader.seek(self.reader.position())?;
        Ok(Self {
            graph: self.graph,
            reader,
            decoder: self.decoder,
            scratch: DecodeScratch::new(),
            window: self.window.clone(),
            next: self.next,
            end: self.end,
            done: self.done,
        })
    }
}

impl Iterator for SequentialCursor<'_> {
    type Item = Result<Successors>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().transpose()
    }
}

/// Splits `0..N` into at most `parts` consecutive ranges of similar cost,
/// where a node costs `node_weight + edge_weight * degree`.
///
/// One cursor walks the graph and is forked at every boundary, so each
/// returned cursor starts with a warm reference window. The walk stops as
/// soon as the last boundary is placed.
pub(crate) fn split<'g>(
    graph: &'g GraphView,
    parts: usize,
    node_weight: u64,
    edge_weight: u64,
) -> Result<Vec<SequentialCursor<'g>>> {
    if !graph.mode().is_resident() {
        return Err(Error::UnsupportedMode {
            operation: "split_cursors",
            mode: graph.mode(),
        });
    }
    let parts = parts.max(1);
    let nodes = graph.vertex_count();
    let total = node_weight
        .saturating_mul(nodes)
        .saturating_add(edge_weight.saturating_mul(graph.edge_count()));
    let target = total.div_ceil(parts as u64).max(1);

    let mut walker = graph.open_sequential_cursor()?;
    let mut cursors = Vec::with_capacity(parts);
    cursors.push(walker.fork()?);

    let mut load = 0u64;
    while cursors.len() < parts {
        let Some(list) = walker.advance()? else {
            break;
        };
        load = load
            .saturating_add(node_weight)
            .saturating_add(edge_weight.saturating_mul(list.degree()));
        if load >= target && walker.next < nodes {
            cursors.push(walker.fork()?);
            load = 0;
        }
    }

    let starts: SmallVec<[NodeId; 16]> = cursors.iter().map(|c| c.next).collect();
    for (i, cursor) in cursors.iter_mut().enumerate() {
        cursor.end = starts.get(i + 1).copied().unwrap_or(nodes);
    }
    Ok(cursors)
}

/// Cursor answering queries for arbitrary nodes (random-access mode only).
///
/// Lists copied from a reference are resolved by walking the reference chain
/// back to a list with no reference (or one already cached), then decoding
/// forward. The chain may be at most `max_ref_count` hops long.
#[derive(Debug)]
pub struct RandomCursor<'g> {
    graph: &'g GraphView,
    offsets: &'g OffsetIndex,
    reader: BitReader<SliceSource<'g>>,
    decoder: SuccessorDecoder,
    scratch: DecodeScratch,
    cache: ReferenceWindow,
    max_chain: Option<u64>,
}

impl<'g> RandomCursor<'g> {
    pub(crate) fn new(graph: &'g GraphView) -> Result<Self> {
        let offsets = graph.require_offsets("open_random_cursor")?;
        let bytes = graph.resident_bytes().ok_or(Error::UnsupportedMode {
            operation: "open_random_cursor",
            mode: graph.mode(),
        })?;
        Ok(Self {
            graph,
            offsets,
            reader: BitReader::from_slice(bytes),
            decoder: *graph.decoder(),
            scratch: DecodeScratch::new(),
            cache: ReferenceWindow::new(graph.properties().window_size()),
            max_chain: graph.properties().max_ref_count(),
        })
    }

    /// Outdegree of `node`, reading nothing past the degree.
    pub fn outdegree(&mut self, node: NodeId) -> Result<u64> {
        self.graph.check_node(node)?;
        self.reader.seek(self.offsets.get(node))?;
        self.decoder.read_degree(node, &mut self.reader)
    }

    /// Successor list of `node`.
    pub fn successors(&mut self, node: NodeId) -> Result<Arc<[NodeId]>> {
        self.graph.check_node(node)?;
        if let Some(hit) = self.cache.get(node) {
            return Ok(Arc::clone(hit));
        }

        let mut chain: SmallVec<[(ListHeader, u64); 8]> = SmallVec::new();
        let mut current = node;
        let mut reference = loop {
            self.reader.seek(self.offsets.get(current))?;
            let header = self.decoder.read_header(current, &mut self.reader)?;
            chain.push((header, self.reader.position()));

            let Some(r) = header.reference_node() else {
                break None;
            };
            if let Some(hit) = self.cache.get(r) {
                break Some(Arc::clone(hit));
            }
            if let Some(max) = self.max_chain {
                if chain.len() as u64 > max {
                    return Err(Error::corrupt(format!(
                        "reference chain from node {node} is longer than {max}"
                    )));
                }
            }
            current = r;
        };

        while let Some((header, body)) = chain.pop() {
            self.reader.seek(body)?;
            let list: Arc<[NodeId]> = Arc::from(self.decoder.read_body(
                &header,
                reference.as_deref(),
                &mut self.reader,
                &mut self.scratch,
            )?);
            self.cache.insert(header.node, Arc::clone(&list));
            reference = Some(list);
        }
        reference.ok_or_else(|| Error::corrupt(format!("node {node} decoded to nothing")))
    }

    /// [`successors`](Self::successors) as a [`Successors`] snapshot.
    pub fn get(&mut self, node: NodeId) -> Result<Successors> {
        let list = self.successors(node)?;
        Ok(Successors { node, list })
    }
}
