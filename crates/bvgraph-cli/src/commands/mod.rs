//! CLI command implementations.

pub mod info;
pub mod print;
pub mod stats;
pub mod successors;
pub mod validate;
