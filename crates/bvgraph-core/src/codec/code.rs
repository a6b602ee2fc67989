//! Integer code selection.
//!
//! Each component of a successor list (outdegree, reference, block count,
//! blocks, residuals) and the offsets file is written with one of these
//! codes, chosen at compression time and recorded in the graph properties.

use std::fmt;

use bvgraph_common::utils::error::Result;
use serde::{Deserialize, Serialize};

use super::reader::BitReader;
use super::source::ByteSource;
use super::writer::BitWriter;

/// An instantaneous code for non-negative integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Code {
    /// `n` zeros then a one.
    Unary,
    /// Elias gamma.
    Gamma,
    /// Elias delta.
    Delta,
    /// Boldi-Vigna zeta code.
    Zeta {
        /// Shrinking factor; zeta(1) is gamma.
        k: u32,
    },
    /// Stop bit plus 3-bit groups.
    Nibble,
}

impl Code {
    /// Returns the flag suffix used in `compressionflags` (`GAMMA`, `ZETA`, ...).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unary => "UNARY",
            Self::Gamma => "GAMMA",
            Self::Delta => "DELTA",
            Self::Zeta { .. } => "ZETA",
            Self::Nibble => "NIBBLE",
        }
    }

    /// Parses a flag suffix. `zeta_k` parameterizes `ZETA`.
    #[must_use]
    pub fn from_name(name: &str, zeta_k: u32) -> Option<Self> {
        match name {
            "UNARY" => Some(Self::Unary),
            "GAMMA" => Some(Self::Gamma),
            "DELTA" => Some(Self::Delta),
            "ZETA" => Some(Self::Zeta { k: zeta_k }),
            "NIBBLE" => Some(Self::Nibble),
            _ => None,
        }
    }

    /// Decodes one value.
    #[inline]
    pub fn read<S: ByteSource>(&self, reader: &mut BitReader<S>) -> Result<u64> {
        match *self {
            Self::Unary => reader.read_unary(),
            Self::Gamma => reader.read_gamma(),
            Self::Delta => reader.read_delta(),
            Self::Zeta { k } => reader.read_zeta(k),
            Self::Nibble => reader.read_nibble(),
        }
    }

    /// Encodes one value.
    pub fn write(&self, writer: &mut BitWriter, value: u64) {
        match *self {
            Self::Unary => writer.write_unary(value),
            Self::Gamma => writer.write_gamma(value),
            Self::Delta => writer.write_delta(value),
            Self::Zeta { k } => writer.write_zeta(value, k),
            Self::Nibble => writer.write_nibble(value),
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zeta { k } => write!(f, "zeta({k})"),
            other => f.write_str(&other.name().to_ascii_lowercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for code in [
            Code::Unary,
            Code::Gamma,
            Code::Delta,
            Code::Zeta { k: 5 },
            Code::Nibble,
        ] {
            assert_eq!(Code::from_name(code.name(), 5), Some(code));
        }
        assert_eq!(Code::from_name("GOLOMB", 3), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Code::Zeta { k: 3 }.to_string(), "zeta(3)");
        assert_eq!(Code::Gamma.to_string(), "gamma");
    }

    #[test]
    fn test_dispatch_matches_reader() {
        let mut w = BitWriter::new();
        Code::Unary.write(&mut w, 4);
        Code::Zeta { k: 2 }.write(&mut w, 17);
        let bytes = w.into_bytes();

        let mut r = BitReader::from_slice(&bytes);
        assert_eq!(Code::Unary.read(&mut r).unwrap(), 4);
        assert_eq!(Code::Zeta { k: 2 }.read(&mut r).unwrap(), 17);
    }
}
