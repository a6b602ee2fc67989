//! # bvgraph-core
//!
//! Core layer for bvgraph: the instantaneous codes BVGraph is written in,
//! the graph's metadata and offset index, and the decoder for a single
//! successor list.
//!
//! This crate knows nothing about files or access modes beyond byte
//! sources; `bvgraph-engine` builds graph views and cursors on top of it.
//!
//! ## Modules
//!
//! - [`codec`] - Bit readers/writers and the unary, gamma, delta, zeta and nibble codes
//! - [`graph`] - Properties, offsets and successor-list decoding

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod codec;
pub mod graph;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use codec::{BitReader, BitWriter, Code};
pub use graph::{
    CompressionFlags, DecodeScratch, ListHeader, OffsetIndex, OffsetLayout, PropertyStore,
    SuccessorDecoder,
};
