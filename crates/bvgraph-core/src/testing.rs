//! Fixture encoder for tests and benches.
//!
//! Produces bit-exact BVGraph streams from plain adjacency lists, choosing
//! references, copy blocks and intervals the way the WebGraph compressor
//! does (cheapest reference within the window, Java `diffComp` block
//! layout, `intervalize` run detection). Only available with the `testing`
//! feature or under `cfg(test)`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::codec::BitWriter;
use crate::graph::decoder::int2nat;
use crate::graph::properties::{CompressionFlags, PropertyStore};

/// A compressed graph held in memory.
#[derive(Debug, Clone)]
pub struct EncodedGraph {
    /// Properties describing the stream.
    pub properties: PropertyStore,
    /// The `.graph` bitstream.
    pub graph: Vec<u8>,
    /// `N + 1` bit offsets.
    pub offsets: Vec<u64>,
}

impl EncodedGraph {
    /// Encodes the offsets as an `.offsets` file, optionally omitting the
    /// final entry the way older writers do.
    #[must_use]
    pub fn offsets_file(&self, with_final: bool) -> Vec<u8> {
        let code = self.properties.flags().offsets;
        let mut w = BitWriter::new();
        let take = if with_final {
            self.offsets.len()
        } else {
            self.offsets.len() - 1
        };
        let mut prev = 0;
        for &offset in &self.offsets[..take] {
            code.write(&mut w, offset - prev);
            prev = offset;
        }
        w.into_bytes()
    }

    /// Writes `<basename>.graph`, `.properties` and (optionally) `.offsets`
    /// into `dir`; returns the basename path.
    pub fn write_files(&self, dir: &Path, basename: &str, with_offsets: bool) -> io::Result<PathBuf> {
        let base = dir.join(basename);
        fs::write(with_suffix(&base, ".graph"), &self.graph)?;
        fs::write(with_suffix(&base, ".properties"), self.properties.render())?;
        if with_offsets {
            fs::write(with_suffix(&base, ".offsets"), self.offsets_file(true))?;
        }
        Ok(base)
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut s = base.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// Compression parameters for fixtures.
#[derive(Debug, Clone)]
pub struct GraphEncoder {
    window_size: u64,
    max_ref_count: Option<u64>,
    min_interval_length: u64,
    zeta_k: u32,
    flags: Option<CompressionFlags>,
}

impl Default for GraphEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphEncoder {
    /// WebGraph defaults: window 7, chains of 3, intervals of 3, zeta(3).
    #[must_use]
    pub fn new() -> Self {
        Self {
            window_size: 7,
            max_ref_count: Some(3),
            min_interval_length: 3,
            zeta_k: 3,
            flags: None,
        }
    }

    /// No references and no intervals: lists are pure residual gaps.
    #[must_use]
    pub fn gaps_only() -> Self {
        Self::new().with_window_size(0).with_min_interval_length(0)
    }

    /// Sets the reference window.
    pub fn with_window_size(mut self, window_size: u64) -> Self {
        self.window_size = window_size;
        self
    }

    /// Sets the maximum reference chain length.
    pub fn with_max_ref_count(mut self, max_ref_count: Option<u64>) -> Self {
        self.max_ref_count = max_ref_count;
        self
    }

    /// Sets the minimum interval length (0 disables intervals).
    pub fn with_min_interval_length(mut self, min_interval_length: u64) -> Self {
        self.min_interval_length = min_interval_length;
        self
    }

    /// Sets the zeta order.
    pub fn with_zeta_k(mut self, zeta_k: u32) -> Self {
        self.zeta_k = zeta_k;
        self
    }

    /// Overrides the component codes.
    pub fn with_flags(mut self, flags: CompressionFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Compresses `lists`, where `lists[x]` is the strictly increasing
    /// successor list of node `x`.
    ///
    /// # Panics
    ///
    /// Panics if a list is unsorted or names a node outside the graph.
    #[must_use]
    pub fn encode(&self, lists: &[Vec<u64>]) -> EncodedGraph {
        let nodes = lists.len() as u64;
        for (x, list) in lists.iter().enumerate() {
            assert!(
                list.windows(2).all(|w| w[0] < w[1]) && list.iter().all(|&s| s < nodes),
                "list of node {x} must be strictly increasing and within the graph"
            );
        }
        let arcs = lists.iter().map(|l| l.len() as u64).sum();

        let mut properties = PropertyStore::new(nodes, arcs)
            .with_window_size(self.window_size)
            .with_max_ref_count(self.max_ref_count)
            .with_min_interval_length(self.min_interval_length)
            .with_zeta_k(self.zeta_k);
        if let Some(flags) = self.flags {
            properties = properties.with_flags(flags);
        }
        let flags = *properties.flags();

        let mut w = BitWriter::new();
        let mut offsets = Vec::with_capacity(lists.len() + 1);
        let mut ref_counts = vec![0u64; lists.len()];

        for (x, list) in lists.iter().enumerate() {
            offsets.push(w.written_bits());

            let mut best = (0usize, u64::MAX);
            let max_r = (self.window_size as usize).min(x);
            for r in 0..=max_r {
                if r > 0 && self.max_ref_count.is_some_and(|m| ref_counts[x - r] >= m) {
                    continue;
                }
                let mut trial = BitWriter::new();
                self.write_list(&mut trial, &flags, x as u64, list, &lists[x - r], r as u64);
                if trial.written_bits() < best.1 {
                    best = (r, trial.written_bits());
                }
            }

            let r = best.0;
            self.write_list(&mut w, &flags, x as u64, list, &lists[x - r], r as u64);
            if r > 0 && !list.is_empty() {
                ref_counts[x] = ref_counts[x - r] + 1;
            }
        }
        offsets.push(w.written_bits());

        EncodedGraph {
            properties,
            graph: w.into_bytes(),
            offsets,
        }
    }

    fn write_list(
        &self,
        w: &mut BitWriter,
        flags: &CompressionFlags,
        x: u64,
        list: &[u64],
        reference: &[u64],
        r: u64,
    ) {
        flags.outdegrees.write(w, list.len() as u64);
        if list.is_empty() {
            return;
        }
        if self.window_size > 0 {
            flags.references.write(w, r);
        }

        let extras = if r > 0 {
            let (blocks, extras) = copy_blocks(list, reference);
            flags.block_count.write(w, blocks.len() as u64);
            for (i, &b) in blocks.iter().enumerate() {
                flags.blocks.write(w, if i == 0 { b } else { b - 1 });
            }
            extras
        } else {
            list.to_vec()
        };
        if extras.is_empty() {
            return;
        }

        let residuals = if self.min_interval_length > 0 {
            let (intervals, residuals) = intervalize(&extras, self.min_interval_length);
            w.write_gamma(intervals.len() as u64);
            let mut prev_end = 0;
            for (i, &(left, len)) in intervals.iter().enumerate() {
                if i == 0 {
                    w.write_gamma(int2nat(left as i64 - x as i64));
                } else {
                    w.write_gamma(left - prev_end - 1);
                }
                w.write_gamma(len - self.min_interval_length);
                prev_end = left + len;
            }
            residuals
        } else {
            extras
        };

        let mut prev = 0;
        for (i, &v) in residuals.iter().enumerate() {
            if i == 0 {
                flags.residuals.write(w, int2nat(v as i64 - x as i64));
            } else {
                flags.residuals.write(w, v - prev - 1);
            }
            prev = v;
        }
    }
}

/// Splits `list` into copy/skip blocks over `reference` plus the entries
/// that must be coded explicitly.
fn copy_blocks(list: &[u64], reference: &[u64]) -> (Vec<u64>, Vec<u64>) {
    let mut blocks = Vec::new();
    let mut extras = Vec::new();
    let (mut j, mut k) = (0, 0);
    let mut copying = true;
    let mut block_len = 0;

    while j < list.len() && k < reference.len() {
        if copying {
            if list[j] > reference[k] {
                blocks.push(block_len);
                copying = false;
                block_len = 0;
            } else if list[j] < reference[k] {
                extras.push(list[j]);
                j += 1;
            } else {
                j += 1;
                k += 1;
                block_len += 1;
            }
        } else if list[j] < reference[k] {
            extras.push(list[j]);
            j += 1;
        } else if list[j] > reference[k] {
            k += 1;
            block_len += 1;
        } else {
            blocks.push(block_len);
            copying = true;
            block_len = 0;
        }
    }
    // The last block is implicit unless a copy stopped short of the end
    if copying && k < reference.len() {
        blocks.push(block_len);
    }
    extras.extend_from_slice(&list[j..]);
    (blocks, extras)
}

/// Extracts maximal runs of at least `min_len` consecutive ids.
fn intervalize(values: &[u64], min_len: u64) -> (Vec<(u64, u64)>, Vec<u64>) {
    let mut intervals = Vec::new();
    let mut residuals = Vec::new();
    let mut i = 0;
    while i < values.len() {
        let mut run = 1;
        while i + run < values.len() && values[i + run - 1] + 1 == values[i + run] {
            run += 1;
        }
        if run as u64 >= min_len {
            intervals.push((values[i], run as u64));
            i += run;
        } else {
            residuals.push(values[i]);
            i += 1;
        }
    }
    (intervals, residuals)
}

/// The five-node graph `0 -> {1, 2}, 1 -> {2}, 3 -> {4}`.
#[must_use]
pub fn example_lists() -> Vec<Vec<u64>> {
    vec![vec![1, 2], vec![2], vec![], vec![4], vec![]]
}

/// A deterministic web-like graph: neighbouring nodes share successors,
/// successors cluster in consecutive runs, and a few links jump far away.
#[must_use]
pub fn web_like_lists(nodes: u64, seed: u64) -> Vec<Vec<u64>> {
    let mut state = seed | 1;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    let mut lists: Vec<Vec<u64>> = Vec::with_capacity(nodes as usize);
    for x in 0..nodes {
        let mut list = Vec::new();
        if x > 0 && next() % 3 != 0 {
            // Inherit most of a recent list
            let back = 1 + next() % 3.min(x);
            for &s in &lists[(x - back) as usize] {
                if next() % 5 != 0 {
                    list.push(s);
                }
            }
        }
        if next() % 2 == 0 {
            let start = (x + next() % 8).saturating_sub(4);
            let len = 2 + next() % 6;
            list.extend((start..start + len).filter(|&s| s < nodes));
        }
        for _ in 0..next() % 4 {
            list.push(next() % nodes);
        }
        if next() % 11 == 0 {
            list.clear();
        }
        list.sort_unstable();
        list.dedup();
        lists.push(list);
    }
    lists
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_blocks_layout() {
        // reference [1, 4, 6, 8, 9], list [1, 7, 8, 9]: copy 1, skip 2, copy rest implicitly
        let (blocks, extras) = copy_blocks(&[1, 7, 8, 9], &[1, 4, 6, 8, 9]);
        assert_eq!(blocks, vec![1, 2]);
        assert_eq!(extras, vec![7]);

        // list [4, 6]: copy 0, skip 1, copy 2, rest skipped
        let (blocks, extras) = copy_blocks(&[4, 6], &[1, 4, 6, 8, 9]);
        assert_eq!(blocks, vec![0, 1, 2]);
        assert!(extras.is_empty());
    }

    #[test]
    fn test_intervalize() {
        let (intervals, residuals) = intervalize(&[1, 2, 3, 5, 7, 8, 9, 10, 12, 13], 3);
        assert_eq!(intervals, vec![(1, 3), (7, 4)]);
        assert_eq!(residuals, vec![5, 12, 13]);
    }

    #[test]
    fn test_encoder_offsets() {
        let encoded = GraphEncoder::gaps_only().encode(&example_lists());
        assert_eq!(encoded.offsets.len(), 6);
        assert_eq!(encoded.offsets[0], 0);
        assert_eq!(encoded.properties.arcs(), 4);
        assert!(encoded.offsets.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(
            encoded.graph.len() as u64,
            encoded.offsets[5].div_ceil(8)
        );
    }

    #[test]
    fn test_web_like_lists_are_valid() {
        let lists = web_like_lists(200, 7);
        assert_eq!(lists.len(), 200);
        for list in &lists {
            assert!(list.windows(2).all(|w| w[0] < w[1]));
            assert!(list.iter().all(|&s| s < 200));
        }
    }
}
