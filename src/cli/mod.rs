//! CLI interface and argument parsing
//!
//! This module handles command-line interface parsing, help generation,
//! and dispatch into the execution engine.

pub mod app;

// Re-export main types
pub use app::*;
