//! Configuration parsing, validation, and script resolution
//!
//! This module handles parsing of rask.yml configuration files, loading of
//! archetype packages from node_modules, and resolving task names to
//! concrete command strings.

pub mod parse;
pub mod resolve;
pub mod schema;
pub mod types;

// Re-export main types
pub use parse::*;
pub use resolve::*;
pub use schema::*;
pub use types::*;
