//! Error types for bvgraph.
//!
//! Every fallible operation in the workspace returns [`Result`]. The variants
//! map one-to-one onto the ways a compressed graph can go wrong:
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | [`Error::Format`] | The properties or offsets file is malformed |
//! | [`Error::CorruptStream`] | The bitstream decodes to something inconsistent |
//! | [`Error::UnsupportedMode`] | The operation is illegal for the graph's access mode |
//! | [`Error::OutOfRange`] | A node id falls outside `0..N` |
//! | [`Error::Io`] | The operating system failed a read |

use std::io;

use thiserror::Error;

use crate::types::{AccessMode, NodeId};

/// Result type alias for bvgraph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading or decoding a graph.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing metadata (properties, offsets file).
    #[error("format error: {0}")]
    Format(String),

    /// The bitstream produced an inconsistent or out-of-range result.
    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    /// The operation is not legal for the graph's access mode.
    #[error("{operation} is not supported in {mode} mode")]
    UnsupportedMode {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Mode the graph was loaded in.
        mode: AccessMode,
    },

    /// A node id outside `0..nodes`.
    #[error("node {node} is out of range for a graph with {nodes} nodes")]
    OutOfRange {
        /// The offending id.
        node: NodeId,
        /// Vertex count of the graph.
        nodes: u64,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Shorthand for [`Error::Format`].
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Shorthand for [`Error::CorruptStream`].
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptStream(msg.into())
    }

    /// Returns whether this error came from the bitstream contents.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptStream(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::UnsupportedMode {
            operation: "successors",
            mode: AccessMode::SequentialStream,
        };
        assert_eq!(
            err.to_string(),
            "successors is not supported in sequential-stream mode"
        );

        let err = Error::OutOfRange { node: 9, nodes: 5 };
        assert_eq!(
            err.to_string(),
            "node 9 is out of range for a graph with 5 nodes"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_corruption());
        assert!(Error::corrupt("bad").is_corruption());
    }
}
