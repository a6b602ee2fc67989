//! Successor-list decoding.
//!
//! Every list is stored as:
//!
//! ```text
//! outdegree d
//! [ reference r ]                      when W > 0 and d > 0
//! [ block count, blocks... ]           when r > 0
//! [ interval count, (left, len)... ]   when intervals are enabled and entries remain
//! residual gaps...                     for whatever is still missing
//! ```
//!
//! Decoding is split into [`SuccessorDecoder::read_header`] and
//! [`SuccessorDecoder::read_body`] so that callers can fetch the reference
//! list (from a sliding window, a cache, or a recursive decode) in between.
//!
//! Copy blocks alternate copy/skip over the reference list, starting with a
//! copy block. Every block after the first is stored minus one. With an even
//! number of explicit blocks, the remainder of the reference list is copied
//! as an implicit final block; with an odd number it is skipped.
//!
//! The first interval and the first residual are coded as a signed
//! (`nat2int`) gap from the node's own id; later ones as gaps from the end of
//! the previous element, minus one.

use bvgraph_common::types::NodeId;
use bvgraph_common::utils::error::{Error, Result};
use smallvec::SmallVec;

use super::properties::{CompressionFlags, PropertyStore};
use crate::codec::{BitReader, ByteSource};

/// Maps the natural-number encoding of a signed gap back to an integer.
///
/// `0, 1, 2, 3, 4, ...` becomes `0, -1, 1, -2, 2, ...`.
#[inline]
#[must_use]
pub fn nat2int(x: u64) -> i64 {
    if x & 1 == 0 {
        (x >> 1) as i64
    } else {
        -(((x >> 1) + 1) as i64)
    }
}

/// Inverse of [`nat2int`].
#[inline]
#[must_use]
pub fn int2nat(x: i64) -> u64 {
    if x >= 0 {
        (x as u64) << 1
    } else {
        ((x.unsigned_abs() - 1) << 1) | 1
    }
}

/// The fixed-position part of a list: its degree and reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeader {
    /// Node the list belongs to.
    pub node: NodeId,
    /// Number of successors.
    pub degree: u64,
    /// Distance back to the reference list; 0 for none.
    pub reference: u64,
}

impl ListHeader {
    /// Node whose list is copied from, if any.
    #[must_use]
    pub fn reference_node(&self) -> Option<NodeId> {
        (self.reference > 0).then(|| self.node - self.reference)
    }
}

/// Reusable buffers for [`SuccessorDecoder::read_body`].
#[derive(Debug, Default, Clone)]
pub struct DecodeScratch {
    blocks: SmallVec<[u64; 16]>,
    copied: Vec<u64>,
    intervals: Vec<u64>,
    residuals: Vec<u64>,
    merged: Vec<u64>,
}

impl DecodeScratch {
    /// Creates empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Stateless decoder parameterized by the graph properties.
#[derive(Debug, Clone, Copy)]
pub struct SuccessorDecoder {
    nodes: u64,
    window_size: u64,
    min_interval_length: u64,
    flags: CompressionFlags,
}

impl SuccessorDecoder {
    /// Creates a decoder for a graph with these properties.
    #[must_use]
    pub fn new(properties: &PropertyStore) -> Self {
        Self {
            nodes: properties.nodes(),
            window_size: properties.window_size(),
            min_interval_length: properties.min_interval_length(),
            flags: *properties.flags(),
        }
    }

    /// Reads only the outdegree of `node`.
    pub fn read_degree<S: ByteSource>(&self, node: NodeId, reader: &mut BitReader<S>) -> Result<u64> {
        let degree = self.flags.outdegrees.read(reader)?;
        if degree > self.nodes {
            return Err(Error::corrupt(format!(
                "node {node} claims {degree} successors in a {}-node graph",
                self.nodes
            )));
        }
        Ok(degree)
    }

    /// Reads the outdegree and, when present, the reference of `node`.
    pub fn read_header<S: ByteSource>(&self, node: NodeId, reader: &mut BitReader<S>) -> Result<ListHeader> {
        let degree = self.read_degree(node, reader)?;
        let mut reference = 0;
        if degree > 0 && self.window_size > 0 {
            reference = self.flags.references.read(reader)?;
            if reference > self.window_size || reference > node {
                return Err(Error::corrupt(format!(
                    "node {node} references {reference} lists back (window {})",
                    self.window_size
                )));
            }
        }
        Ok(ListHeader {
            node,
            degree,
            reference,
        })
    }

    /// Decodes the rest of a list whose header has already been read.
    ///
    /// `reference` must be the successor list of
    /// [`ListHeader::reference_node`] when the header has one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptStream`] when the stream ends early, a block
    /// or interval runs past what the degree allows, an id falls outside the
    /// graph, or the merged list is not strictly increasing.
    pub fn read_body<'s, S: ByteSource>(
        &self,
        header: &ListHeader,
        reference: Option<&[u64]>,
        reader: &mut BitReader<S>,
        scratch: &'s mut DecodeScratch,
    ) -> Result<&'s [u64]> {
        let node = header.node;
        let degree = header.degree;
        scratch.copied.clear();
        scratch.intervals.clear();
        scratch.residuals.clear();
        scratch.merged.clear();
        if degree == 0 {
            return Ok(&scratch.merged);
        }

        if header.reference > 0 {
            let reference = reference.ok_or_else(|| {
                Error::corrupt(format!(
                    "node {node} references node {} but no list was supplied",
                    node - header.reference
                ))
            })?;
            self.read_copy_blocks(header, reference, reader, scratch)?;
        }

        let mut extra = degree - scratch.copied.len() as u64;

        if extra > 0 && self.min_interval_length > 0 {
            extra = self.read_intervals(node, extra, reader, &mut scratch.intervals)?;
        }

        if extra > 0 {
            self.read_residuals(node, extra, reader, &mut scratch.residuals)?;
        }

        merge_into(&scratch.intervals, &scratch.residuals, &scratch.copied, &mut scratch.merged)
            .map_err(|dup| Error::corrupt(format!("node {node} repeats or misorders successor {dup}")))?;

        if scratch.merged.len() as u64 != degree {
            return Err(Error::corrupt(format!(
                "node {node} decoded {} successors, expected {degree}",
                scratch.merged.len()
            )));
        }
        Ok(&scratch.merged)
    }

    fn read_copy_blocks<S: ByteSource>(
        &self,
        header: &ListHeader,
        reference: &[u64],
        reader: &mut BitReader<S>,
        scratch: &mut DecodeScratch,
    ) -> Result<()> {
        let node = header.node;
        let count = self.flags.block_count.read(reader)?;
        if count > reference.len() as u64 + 1 {
            return Err(Error::corrupt(format!(
                "node {node} has {count} copy blocks over a {}-element reference",
                reference.len()
            )));
        }

        scratch.blocks.clear();
        let mut total = 0u64;
        for i in 0..count {
            let len = self.flags.blocks.read(reader)?.saturating_add(u64::from(i > 0));
            total = total.saturating_add(len);
            if total > reference.len() as u64 {
                return Err(Error::corrupt(format!(
                    "node {node} copy blocks span {total} entries of a {}-element reference",
                    reference.len()
                )));
            }
            scratch.blocks.push(len);
        }

        let mut pos = 0usize;
        for (i, &len) in scratch.blocks.iter().enumerate() {
            let end = pos + len as usize;
            if i % 2 == 0 {
                scratch.copied.extend_from_slice(&reference[pos..end]);
            }
            pos = end;
        }
        if count % 2 == 0 {
            scratch.copied.extend_from_slice(&reference[pos..]);
        }

        if scratch.copied.len() as u64 > header.degree {
            return Err(Error::corrupt(format!(
                "node {node} copies {} entries but has degree {}",
                scratch.copied.len(),
                header.degree
            )));
        }
        Ok(())
    }

    /// Reads the interval section; returns how many entries remain for
    /// residuals.
    fn read_intervals<S: ByteSource>(
        &self,
        node: NodeId,
        mut extra: u64,
        reader: &mut BitReader<S>,
        out: &mut Vec<u64>,
    ) -> Result<u64> {
        let count = reader.read_gamma()?;
        if count.saturating_mul(self.min_interval_length) > extra {
            return Err(Error::corrupt(format!(
                "node {node} has {count} intervals but only {extra} entries left"
            )));
        }

        let mut prev_end = 0u64;
        for i in 0..count {
            let left = if i == 0 {
                node.checked_add_signed(nat2int(reader.read_gamma()?))
            } else {
                reader
                    .read_gamma()?
                    .checked_add(prev_end)
                    .and_then(|v| v.checked_add(1))
            }
            .ok_or_else(|| Error::corrupt(format!("node {node} interval {i} starts outside the graph")))?;

            let len = reader.read_gamma()?.saturating_add(self.min_interval_length);
            extra = extra.checked_sub(len).ok_or_else(|| {
                Error::corrupt(format!("node {node} interval {i} of length {len} exceeds the degree"))
            })?;
            let end = left
                .checked_add(len)
                .filter(|&end| end <= self.nodes)
                .ok_or_else(|| Error::corrupt(format!("node {node} interval {i} runs past the last node")))?;

            out.extend(left..end);
            prev_end = end;
        }
        Ok(extra)
    }

    fn read_residuals<S: ByteSource>(
        &self,
        node: NodeId,
        extra: u64,
        reader: &mut BitReader<S>,
        out: &mut Vec<u64>,
    ) -> Result<()> {
        let code = self.flags.residuals;
        let mut prev = 0u64;
        for i in 0..extra {
            let value = if i == 0 {
                node.checked_add_signed(nat2int(code.read(reader)?))
            } else {
                code.read(reader)?
                    .checked_add(prev)
                    .and_then(|v| v.checked_add(1))
            }
            .filter(|&v| v < self.nodes)
            .ok_or_else(|| Error::corrupt(format!("node {node} residual {i} lies outside the graph")))?;

            out.push(value);
            prev = value;
        }
        Ok(())
    }
}

/// Merges three ascending runs into `out`, rejecting any repeated value.
///
/// `first` and `second` are strictly increasing by construction; `copied`
/// comes from the reference list and is checked along the way.
fn merge_into(
    first: &[u64],
    second: &[u64],
    copied: &[u64],
    out: &mut Vec<u64>,
) -> std::result::Result<(), u64> {
    out.reserve(first.len() + second.len() + copied.len());

    let (mut i, mut j) = (0, 0);
    let mut extras: SmallVec<[u64; 64]> = SmallVec::new();
    while i < first.len() || j < second.len() {
        let take_first = j >= second.len() || (i < first.len() && first[i] < second[j]);
        if take_first {
            extras.push(first[i]);
            i += 1;
        } else {
            extras.push(second[j]);
            j += 1;
        }
    }

    let (mut a, mut b) = (0, 0);
    while a < extras.len() || b < copied.len() {
        let next = if b >= copied.len() || (a < extras.len() && extras[a] < copied[b]) {
            a += 1;
            extras[a - 1]
        } else {
            b += 1;
            copied[b - 1]
        };
        if let Some(&last) = out.last() {
            if next <= last {
                return Err(next);
            }
        }
        out.push(next);
    }
    Ok(())
}
