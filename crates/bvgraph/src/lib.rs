//! # bvgraph
//!
//! A pure-Rust reader for graphs compressed in the BVGraph format of
//! WebGraph.
//!
//! Start with [`GraphView`]: open a graph by basename (the path without the
//! `.graph` / `.properties` / `.offsets` suffix), then read it through
//! cursors.
//!
//! ## Access Modes
//!
//! | Mode | Preset | Sequential | By node id | Memory |
//! | ---- | ------ | ---------- | ---------- | ------ |
//! | [`AccessMode::RandomAccess`] | [`LoadConfig::random_access`] | yes | yes | graph + offsets |
//! | [`AccessMode::SequentialStream`] | [`LoadConfig::sequential`] | yes | no | graph |
//! | [`AccessMode::DiskStream`] | [`LoadConfig::disk_stream`] | yes | no | a read buffer |
//!
//! ## Quick Start
//!
//! ```no_run
//! use bvgraph::{GraphView, LoadConfig};
//!
//! // Load with an offset index for random access
//! let graph = GraphView::open("uk-2007-05", &LoadConfig::random_access())?;
//! println!("{} nodes, {} arcs", graph.vertex_count(), graph.edge_count());
//!
//! // Look up one node
//! let successors = graph.successors(42)?;
//!
//! // Or walk them all
//! for list in graph.open_sequential_cursor()? {
//!     let list = list?;
//!     let _ = (list.node(), list.degree(), list.successors());
//! }
//! # Ok::<(), bvgraph::Error>(())
//! ```

// Re-export the main graph API
pub use bvgraph_engine::{
    Backing, GraphView, Issue, LoadConfig, MemoryEstimate, OffsetSource, RandomCursor,
    SequentialCursor, Successors, VerifyOptions, VerifyReport, verify,
};

// Re-export metadata types for callers that inspect or prepare indexes
pub use bvgraph_core::graph::{CompressionFlags, OffsetIndex, OffsetLayout, PropertyStore};

// Re-export core types
pub use bvgraph_common::types::{AccessMode, NodeId};
pub use bvgraph_common::utils::error::{Error, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use bvgraph_core::testing::{GraphEncoder, example_lists};

    #[test]
    fn test_facade_end_to_end() {
        let encoded = GraphEncoder::new().encode(&example_lists());
        let dir = tempfile::tempdir().unwrap();
        let base = encoded.write_files(dir.path(), "example", true).unwrap();

        let graph = GraphView::open(&base, &LoadConfig::random_access()).unwrap();
        assert_eq!(graph.successors(0).unwrap(), vec![1, 2]);
        assert!(verify(&graph, &VerifyOptions::default(), |_| {}).is_valid());
    }
}
