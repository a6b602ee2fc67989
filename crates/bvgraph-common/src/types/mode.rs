//! Graph access modes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a graph is held and which operations it supports.
///
/// | Mode | Sequential | Random access | Offset index |
/// |------|------------|---------------|--------------|
/// | `RandomAccess` | yes | yes | built at load |
/// | `SequentialStream` | yes | no | none |
/// | `DiskStream` | yes (re-reads the file per pass) | no | none |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccessMode {
    /// Bitstream in memory plus an offset index; every operation is legal.
    #[default]
    RandomAccess,
    /// Bitstream in memory without an index; forward iteration only.
    SequentialStream,
    /// Bitstream left on disk and streamed through a buffer on every pass.
    DiskStream,
}

impl AccessMode {
    /// Returns a human-readable name for the mode.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RandomAccess => "random-access",
            Self::SequentialStream => "sequential-stream",
            Self::DiskStream => "disk-stream",
        }
    }

    /// Returns whether lists can be fetched by node id.
    #[must_use]
    pub fn supports_random_access(&self) -> bool {
        matches!(self, Self::RandomAccess)
    }

    /// Returns whether the bitstream is held in memory (heap or mapped).
    #[must_use]
    pub fn is_resident(&self) -> bool {
        !matches!(self, Self::DiskStream)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_capabilities() {
        assert!(AccessMode::RandomAccess.supports_random_access());
        assert!(!AccessMode::SequentialStream.supports_random_access());
        assert!(!AccessMode::DiskStream.supports_random_access());

        assert!(AccessMode::SequentialStream.is_resident());
        assert!(!AccessMode::DiskStream.is_resident());
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(AccessMode::DiskStream.to_string(), "disk-stream");
        assert_eq!(AccessMode::default(), AccessMode::RandomAccess);
    }
}
