//! Rask - a fast, archetype-aware task runner
//!
//! Rask runs shell-command tasks declared in a `rask.yml` file, with support
//! for shared task definitions provided by archetype packages installed under
//! `node_modules/`, automatic pre/post hooks, retries, a long-lived setup
//! process, bounded-parallel batches, and environment-variable matrices.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod runner;

// Re-export commonly used types
pub use error::{RaskError, Result};

/// Current version of Rask
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
