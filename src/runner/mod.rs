//! Task execution engine
//!
//! This module contains the execution core: command mutation, process
//! spawning and tracking, retries, setup coordination, and the engine
//! that drives the three execution modes.

pub mod context;
pub mod engine;
pub mod envset;
pub mod mutate;
pub mod plan;
pub mod retry;
pub mod setup;
pub mod spawn;
pub mod tracker;

// Re-export main types
pub use context::*;
pub use engine::*;
pub use envset::*;
pub use mutate::*;
pub use plan::*;
pub use setup::*;
pub use tracker::*;
