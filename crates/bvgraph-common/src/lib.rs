//! # bvgraph-common
//!
//! Foundation layer for bvgraph: the error taxonomy and the handful of types
//! every other crate in the workspace agrees on.
//!
//! This crate has no internal dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Node ids and access modes
//! - [`utils`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use types::{AccessMode, NodeId};
pub use utils::error::{Error, Result};
