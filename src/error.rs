//! Error types for Rask

use std::io;
use thiserror::Error;

/// Result type alias for Rask operations
pub type Result<T> = std::result::Result<T, RaskError>;

/// Main error type for Rask
#[derive(Error, Debug)]
pub enum RaskError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RaskError {
    /// Exit status for the whole invocation: mirror the failing process's
    /// exit code when one is available, otherwise 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            RaskError::Execution(e) => e.exit_code(),
            _ => 1,
        }
    }
}

/// Configuration parsing and resolution errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Task '{0}' is not defined")]
    TaskNotFound(String),

    #[error("Failed to load archetype '{name}': {error}")]
    Archetype { name: String, error: String },
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The OS failed to launch the process at all.
    #[error("Failed to start '{task}': {source}")]
    Spawn {
        task: String,
        #[source]
        source: io::Error,
    },

    /// The process closed with a nonzero exit code or a termination signal.
    #[error("Task '{task}' failed with {}", exit_reason(code, signal))]
    Exit {
        task: String,
        code: Option<i32>,
        signal: Option<i32>,
    },

    /// The shared setup process exited before the main work finished.
    #[error("Setup task '{task}' exited prematurely with {}", exit_reason(code, &None))]
    SetupExited { task: String, code: Option<i32> },

    /// Malformed environment-set input for the matrix mode.
    #[error("Invalid environment sets: {0}")]
    EnvParse(String),

    /// A caller broke an internal contract.
    #[error("Internal error: {0}")]
    Internal(&'static str),
}

impl ExecutionError {
    /// Exit status this failure maps to. A setup process that exited
    /// cleanly is still a failure, so code 0 falls back to 1 there.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecutionError::Exit { code: Some(c), .. } => *c,
            ExecutionError::SetupExited { code: Some(c), .. } if *c != 0 => *c,
            _ => 1,
        }
    }
}

fn exit_reason(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (code, signal) {
        (Some(c), _) => format!("exit code {}", c),
        (None, Some(s)) => format!("signal {}", s),
        (None, None) => "an unknown exit state".to_string(),
    }
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
