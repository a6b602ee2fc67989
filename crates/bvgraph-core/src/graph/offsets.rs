//! Per-node bit offsets into the graph bitstream.
//!
//! `offset[i]` is the bit where node `i`'s successor list starts, and
//! `offset[N]` is where the last list ends, so `offset[i + 1] - offset[i]` is
//! the exact encoded size of list `i`. The index is either read from the
//! `<basename>.offsets` file (offset-coded gaps, gamma by default) or
//! recorded during one forward decode pass.
//!
//! # Layouts
//!
//! | Layout | Bytes per node | Lookup |
//! |--------|----------------|--------|
//! | `Plain` | 8 | one load |
//! | `EliasFano` | ~`(2 + log2(bits per node)) / 8` | `select` over the high bits |
//! | `Auto` | whichever fits the budget | |

use bvgraph_common::utils::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sucds::Serializable;
use sucds::mii_sequences::{EliasFano, EliasFanoBuilder};

use crate::codec::{BitReader, ByteSource, Code};

/// How an [`OffsetIndex`] stores its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OffsetLayout {
    /// One `u64` per entry.
    #[default]
    Plain,
    /// Elias-Fano compressed (`sucds`).
    EliasFano,
    /// Plain if it fits in `budget_bytes`, Elias-Fano otherwise.
    Auto {
        /// Memory allowed for a plain table.
        budget_bytes: usize,
    },
}

impl OffsetLayout {
    /// Resolves `Auto` for an index of `entries` offsets.
    #[must_use]
    pub fn resolve(self, entries: usize) -> Self {
        match self {
            Self::Auto { budget_bytes } if entries.saturating_mul(8) <= budget_bytes => Self::Plain,
            Self::Auto { .. } => Self::EliasFano,
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
enum Storage {
    Plain(Vec<u64>),
    EliasFano(EliasFano),
}

/// Immutable table of `N + 1` non-decreasing bit offsets.
#[derive(Debug, Clone)]
pub struct OffsetIndex {
    storage: Storage,
    nodes: u64,
}

impl OffsetIndex {
    /// Builds an index from `nodes + 1` offsets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if the length is wrong or the offsets
    /// decrease.
    pub fn from_offsets(offsets: Vec<u64>, nodes: u64, layout: OffsetLayout) -> Result<Self> {
        let expected = nodes
            .checked_add(1)
            .ok_or_else(|| Error::format(format!("{nodes} nodes cannot be indexed")))?;
        if offsets.len() as u64 != expected {
            return Err(Error::format(format!(
                "offset index has {} entries, expected {expected}",
                offsets.len()
            )));
        }
        if let Some(i) = offsets.windows(2).position(|w| w[0] > w[1]) {
            return Err(Error::format(format!(
                "offsets decrease at node {}: {} > {}",
                i + 1,
                offsets[i],
                offsets[i + 1]
            )));
        }

        let storage = match layout.resolve(offsets.len()) {
            OffsetLayout::EliasFano => Storage::EliasFano(build_elias_fano(&offsets)?),
            _ => Storage::Plain(offsets),
        };
        Ok(Self { storage, nodes })
    }

    /// Reads the gaps of an offsets file.
    ///
    /// The first `nodes` gaps are mandatory. A trailing gap locating the end
    /// of the last list is used when present; otherwise the end is taken to
    /// be `stream_bits`, the bit length of the graph file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if the file is truncated, if it points
    /// past the end of the graph, or if the graph is too short to hold
    /// `nodes` lists.
    pub fn read<S: ByteSource>(
        reader: &mut BitReader<S>,
        nodes: u64,
        code: Code,
        stream_bits: u64,
        layout: OffsetLayout,
    ) -> Result<Self> {
        check_capacity(nodes, stream_bits)?;
        let mut offsets = Vec::with_capacity(nodes as usize + 1);
        let mut current = 0u64;
        for node in 0..nodes {
            let gap = code.read(reader).map_err(|e| {
                Error::format(format!("offsets file ends before node {node}: {e}"))
            })?;
            current = current
                .checked_add(gap)
                .ok_or_else(|| Error::format(format!("offset of node {node} overflows")))?;
            offsets.push(current);
        }

        let end = match code.read(reader) {
            Ok(gap) => current.saturating_add(gap),
            Err(_) => stream_bits,
        };
        offsets.push(end);

        if let Some(&last) = offsets.last() {
            if last > stream_bits {
                return Err(Error::format(format!(
                    "offsets file points to bit {last}, past the {stream_bits}-bit graph"
                )));
            }
        }
        Self::from_offsets(offsets, nodes, layout)
    }

    /// Number of nodes covered; the index holds one more entry than this.
    #[must_use]
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Number of entries, `nodes + 1`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes as usize + 1
    }

    /// Always false: even an empty graph has its end offset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Starting bit of node `node`'s list; `get(nodes)` is the end of the
    /// last list.
    ///
    /// # Panics
    ///
    /// Panics if `node > nodes`.
    #[inline]
    #[must_use]
    pub fn get(&self, node: u64) -> u64 {
        match &self.storage {
            Storage::Plain(v) => v[node as usize],
            Storage::EliasFano(ef) => ef
                .select(node as usize)
                .unwrap_or_else(|| panic!("offset {node} out of bounds")) as u64,
        }
    }

    /// Bit range occupied by node `node`'s list.
    #[must_use]
    pub fn bit_range(&self, node: u64) -> std::ops::Range<u64> {
        self.get(node)..self.get(node + 1)
    }

    /// Layout actually in use (never `Auto`).
    #[must_use]
    pub fn layout(&self) -> OffsetLayout {
        match self.storage {
            Storage::Plain(_) => OffsetLayout::Plain,
            Storage::EliasFano(_) => OffsetLayout::EliasFano,
        }
    }

    /// Heap bytes held by the index.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        match &self.storage {
            Storage::Plain(v) => v.len() * 8,
            Storage::EliasFano(ef) => ef.size_in_bytes(),
        }
    }

    /// Estimated bytes for an index of `nodes` nodes over a stream of at most
    /// `stream_bits` bits.
    #[must_use]
    pub fn estimate_bytes(nodes: u64, stream_bits: u64, layout: OffsetLayout) -> usize {
        let entries = nodes as usize + 1;
        match layout.resolve(entries) {
            OffsetLayout::EliasFano => elias_fano_bytes(entries, stream_bits),
            _ => entries * 8,
        }
    }
}

/// Every list takes at least one bit, so a stream of `stream_bits` bits
/// holds at most that many lists.
///
/// # Errors
///
/// Returns [`Error::Format`] if `nodes` exceeds `stream_bits`.
pub fn check_capacity(nodes: u64, stream_bits: u64) -> Result<()> {
    if nodes > stream_bits {
        return Err(Error::format(format!(
            "{nodes} nodes cannot fit in a {stream_bits}-bit graph"
        )));
    }
    Ok(())
}

fn build_elias_fano(offsets: &[u64]) -> Result<EliasFano> {
    let to_usize = |v: u64| {
        usize::try_from(v).map_err(|_| Error::format(format!("offset {v} does not fit in memory")))
    };
    let last = offsets.last().copied().unwrap_or(0);
    let universe = to_usize(last)?
        .checked_add(1)
        .ok_or_else(|| Error::format(format!("offset {last} does not fit in memory")))?;

    let mut builder = EliasFanoBuilder::new(universe, offsets.len())
        .map_err(|e| Error::format(format!("cannot build Elias-Fano offsets: {e}")))?;
    for &offset in offsets {
        builder
            .push(to_usize(offset)?)
            .map_err(|e| Error::format(format!("cannot build Elias-Fano offsets: {e}")))?;
    }
    Ok(builder.build())
}

/// Approximate size of an Elias-Fano sequence of `len` values below
/// `universe`: low bits, high bits, and the select directory on top.
fn elias_fano_bytes(len: usize, universe: u64) -> usize {
    let len64 = len.max(1) as u64;
    let low_width = if universe <= len64 {
        0
    } else {
        63 - (universe / len64).leading_zeros() as usize
    };
    let low = len * low_width;
    let high = len + (universe >> low_width) as usize + 1;
    let select = high / 16;
    (low + high + select).div_ceil(8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BitWriter;

    fn offsets_file(gaps: &[u64]) -> Vec<u8> {
        let mut w = BitWriter::new();
        for &g in gaps {
            w.write_gamma(g);
        }
        w.into_bytes()
    }

    #[test]
    fn test_from_offsets_validation() {
        assert!(OffsetIndex::from_offsets(vec![0, 4, 9], 2, OffsetLayout::Plain).is_ok());
        assert!(matches!(
            OffsetIndex::from_offsets(vec![0, 4], 2, OffsetLayout::Plain),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            OffsetIndex::from_offsets(vec![0, 9, 4], 2, OffsetLayout::Plain),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_read_with_final_entry() {
        let bytes = offsets_file(&[0, 5, 3, 0, 7]);
        let mut r = BitReader::from_slice(&bytes);
        let index = OffsetIndex::read(&mut r, 4, Code::Gamma, 64, OffsetLayout::Plain).unwrap();

        assert_eq!(index.get(0), 0);
        assert_eq!(index.get(1), 5);
        assert_eq!(index.get(3), 8);
        assert_eq!(index.get(4), 15);
        assert_eq!(index.bit_range(1), 5..8);
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn test_read_without_final_entry() {
        let bytes = offsets_file(&[0, 5, 3]);
        let mut r = BitReader::from_slice(&bytes);
        let index = OffsetIndex::read(&mut r, 3, Code::Gamma, 20, OffsetLayout::Plain).unwrap();
        assert_eq!(index.get(3), 20);
    }

    #[test]
    fn test_read_truncated_and_overlong() {
        let bytes = offsets_file(&[0, 5]);
        let mut r = BitReader::from_slice(&bytes);
        assert!(matches!(
            OffsetIndex::read(&mut r, 5, Code::Gamma, 100, OffsetLayout::Plain),
            Err(Error::Format(_))
        ));

        let bytes = offsets_file(&[0, 50, 60]);
        let mut r = BitReader::from_slice(&bytes);
        assert!(matches!(
            OffsetIndex::read(&mut r, 2, Code::Gamma, 100, OffsetLayout::Plain),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_layouts_agree() {
        let offsets: Vec<u64> = (0..=2000u64).map(|i| i * 13 + i / 3).collect();
        let plain = OffsetIndex::from_offsets(offsets.clone(), 2000, OffsetLayout::Plain).unwrap();
        let ef = OffsetIndex::from_offsets(offsets, 2000, OffsetLayout::EliasFano).unwrap();

        assert_eq!(ef.layout(), OffsetLayout::EliasFano);
        assert!(ef.memory_bytes() < plain.memory_bytes());
        for node in 0..=2000 {
            assert_eq!(ef.get(node), plain.get(node));
        }
    }

    #[test]
    fn test_elias_fano_with_repeated_offsets() {
        // Empty lists share their start with the next node
        let offsets = vec![0, 0, 0, 7, 7, 19, 19];
        let ef = OffsetIndex::from_offsets(offsets.clone(), 6, OffsetLayout::EliasFano).unwrap();
        for (node, &expected) in offsets.iter().enumerate() {
            assert_eq!(ef.get(node as u64), expected);
        }
    }

    #[test]
    fn test_node_count_must_fit_stream() {
        assert!(check_capacity(64, 64).is_ok());
        assert!(matches!(check_capacity(65, 64), Err(Error::Format(_))));

        let bytes = offsets_file(&[0, 5, 3]);
        let mut r = BitReader::from_slice(&bytes);
        assert!(matches!(
            OffsetIndex::read(&mut r, u64::MAX, Code::Gamma, 20, OffsetLayout::Plain),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            OffsetIndex::from_offsets(vec![0], u64::MAX, OffsetLayout::Plain),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_auto_layout() {
        assert_eq!(
            OffsetLayout::Auto { budget_bytes: 80 }.resolve(10),
            OffsetLayout::Plain
        );
        assert_eq!(
            OffsetLayout::Auto { budget_bytes: 79 }.resolve(10),
            OffsetLayout::EliasFano
        );
        assert_eq!(OffsetIndex::estimate_bytes(9, 1000, OffsetLayout::Plain), 80);
    }
}
