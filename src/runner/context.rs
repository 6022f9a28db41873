//! Shell context for task execution
//!
//! The context carries everything a spawned command inherits: working
//! directory, interpreter, environment additions, and the I/O mode.

use std::collections::HashMap;
use std::path::PathBuf;

/// How a spawned command's stdio is wired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    /// Pass the parent's stdio straight through
    Inherit,
    /// Accumulate output in memory, flush after the process closes
    Capture,
}

/// Execution context applied to every spawned command
#[derive(Debug, Clone)]
pub struct ShellContext {
    /// Working directory commands run in (the project root)
    pub working_dir: PathBuf,

    /// Shell interpreter (e.g., ["sh", "-c"])
    pub interpreter: Vec<String>,

    /// Environment additions layered over the parent environment.
    /// Cross-invocation coordination state (the flag carrier and the
    /// expansion marker) lives here too, so nested rask processes
    /// inherit it.
    pub env: HashMap<String, String>,

    /// I/O mode
    pub io: IoMode,

    /// Merged custom flags: inherited carrier flags plus this invocation's
    pub custom_flags: Vec<String>,

    /// Whether archetype path expansion is active
    pub expand_archetype: bool,
}

impl ShellContext {
    /// Create a new context with default settings
    pub fn new() -> Self {
        ShellContext {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            interpreter: default_interpreter(),
            env: HashMap::new(),
            io: IoMode::Inherit,
            custom_flags: Vec::new(),
            expand_archetype: false,
        }
    }

    /// Create a context with a specific working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Set the I/O mode
    pub fn with_io(mut self, io: IoMode) -> Self {
        self.io = io;
        self
    }

    /// Set a single environment addition
    pub fn set_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    /// Get an environment addition
    pub fn get_env(&self, key: &str) -> Option<&String> {
        self.env.get(key)
    }
}

impl Default for ShellContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(windows))]
fn default_interpreter() -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string()]
}

#[cfg(windows)]
fn default_interpreter() -> Vec<String> {
    vec!["cmd".to_string(), "/C".to_string()]
}
