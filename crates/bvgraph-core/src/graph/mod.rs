//! Graph metadata and successor-list decoding.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`properties`] | The `.properties` file: counts, window, codes |
//! | [`offsets`] | Per-node bit offsets, plain or Elias-Fano |
//! | [`decoder`] | Reading one list: copy blocks, intervals, residuals |

pub mod decoder;
pub mod offsets;
pub mod properties;

pub use decoder::{DecodeScratch, ListHeader, SuccessorDecoder};
pub use offsets::{OffsetIndex, OffsetLayout, check_capacity};
pub use properties::{CompressionFlags, PropertyStore};
