//! Core type definitions shared across bvgraph.
//!
//! - [`NodeId`] - dense, zero-based vertex identifier
//! - [`AccessMode`] - which operations a loaded graph supports

mod mode;

pub use mode::AccessMode;

/// Identifier of a vertex.
///
/// Ids are dense and zero-based: a graph with `N` vertices uses exactly the
/// ids `0..N`, with no gaps.
pub type NodeId = u64;
