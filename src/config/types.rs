//! Core configuration types
//!
//! This module defines the data structures that represent a rask.yml
//! configuration file, for both the invoking project and its archetypes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Application name (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Global interpreter to use for commands (e.g., ["sh", "-c"])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Vec<String>>,

    /// Archetype packages to pull shared scripts from, in priority order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub archetypes: Vec<String>,

    /// Scripts defined in the configuration: task name to shell command
    #[serde(default)]
    pub scripts: HashMap<String, String>,
}

/// An archetype package loaded from node_modules
#[derive(Debug, Clone)]
pub struct Archetype {
    /// Package name as declared in the project config
    pub name: String,

    /// Absolute path of the package directory under node_modules
    pub path: PathBuf,

    /// The archetype's own parsed configuration
    pub config: Config,
}

/// A project configuration together with its loaded archetypes
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The project's own configuration
    pub config: Config,

    /// Directory containing the resolved rask.yml
    pub root: PathBuf,

    /// Archetypes in the project's declared priority order
    pub archetypes: Vec<Archetype>,
}
