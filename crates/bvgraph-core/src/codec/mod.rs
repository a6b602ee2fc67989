//! Bit-level codecs.
//!
//! - [`source`] - byte sources (slices and buffered readers)
//! - [`reader`] - [`BitReader`], decoding instantaneous codes
//! - [`writer`] - [`BitWriter`], the inverse
//! - [`code`] - [`Code`], the per-component code selector
//!
//! # Supported Codes
//!
//! | Code | Layout | Typical use |
//! |------|--------|-------------|
//! | Unary | `n` zeros, one | References |
//! | Gamma | unary length, mantissa | Outdegrees, blocks, intervals, offsets |
//! | Delta | gamma length, mantissa | Large outdegrees, offsets |
//! | Zeta(k) | unary bucket, minimal binary | Residual gaps |
//! | Nibble | stop bit per 3-bit group | Residual gaps |

pub mod code;
pub mod reader;
pub mod source;
pub mod writer;

pub use code::Code;
pub use reader::BitReader;
pub use source::{ByteSource, ReadSource, SeekableSource, SliceSource};
pub use writer::BitWriter;
