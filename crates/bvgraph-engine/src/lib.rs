//! # bvgraph-engine
//!
//! Loading and reading BVGraph compressed graphs.
//!
//! A [`GraphView`] owns everything decoded at load time: the properties, the
//! bitstream (heap, mapped or left on disk) and, in random-access mode, the
//! offset index. Reading happens through cursors that borrow the view.
//!
//! ## Modules
//!
//! - [`config`] - Load options ([`LoadConfig`])
//! - [`view`] - The graph handle ([`GraphView`])
//! - [`cursor`] - Sequential, random and split cursors
//! - [`verify`] - Whole-graph integrity check
//! - [`memory`] - Footprint estimates

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod cursor;
pub mod memory;
pub mod verify;
pub mod view;

pub use config::{LoadConfig, OffsetSource};
pub use cursor::{RandomCursor, SequentialCursor, Successors};
pub use memory::MemoryEstimate;
pub use verify::{Issue, VerifyOptions, VerifyReport, verify};
pub use view::{Backing, GraphView};
