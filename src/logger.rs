//! Leveled logging to stderr
//!
//! Log records produced before the command line has been parsed (config
//! discovery runs first, so verbosity is not known yet) are held in an
//! owned buffer and flushed once `configure` resolves the level.

use colored::Colorize;
use std::sync::{Arc, Mutex};

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

/// Log levels, each with the minimum verbosity that lets it through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn threshold(self) -> Verbosity {
        match self {
            Level::Debug => Verbosity::Verbose,
            Level::Info | Level::Warn => Verbosity::Normal,
            Level::Error => Verbosity::Quiet,
        }
    }

    fn label(self) -> String {
        match self {
            Level::Debug => "[DEBUG]".dimmed().to_string(),
            Level::Info => "[INFO]".blue().to_string(),
            Level::Warn => "[WARN]".yellow().to_string(),
            Level::Error => "[ERROR]".red().to_string(),
        }
    }
}

enum State {
    /// Verbosity not resolved yet; records are buffered in order.
    Buffering(Vec<(Level, String)>),
    /// Verbosity resolved; records are emitted directly.
    Ready(Verbosity),
}

/// Shared logger handle. Cheap to clone; safe to use from concurrent
/// task branches.
#[derive(Clone)]
pub struct Logger {
    state: Arc<Mutex<State>>,
}

impl Logger {
    /// Create a logger that buffers until `configure` is called.
    pub fn deferred() -> Self {
        Logger {
            state: Arc::new(Mutex::new(State::Buffering(Vec::new()))),
        }
    }

    /// Create a logger with a known verbosity (used by tests).
    pub fn with_verbosity(verbosity: Verbosity) -> Self {
        Logger {
            state: Arc::new(Mutex::new(State::Ready(verbosity))),
        }
    }

    /// Resolve the verbosity and flush any buffered records in order.
    /// Calling this more than once only updates the level.
    pub fn configure(&self, verbosity: Verbosity) {
        let mut state = self.state.lock().unwrap();
        if let State::Buffering(records) = &mut *state {
            for (level, message) in records.drain(..) {
                emit(level, &message, verbosity);
            }
        }
        *state = State::Ready(verbosity);
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    /// Print the command about to run, like a shell trace.
    pub fn command(&self, command: &str) {
        self.log(Level::Info, &format!("$ {}", command));
    }

    fn log(&self, level: Level, message: &str) {
        let mut state = self.state.lock().unwrap();
        match &mut *state {
            State::Buffering(records) => records.push((level, message.to_string())),
            State::Ready(verbosity) => emit(level, message, *verbosity),
        }
    }

    #[cfg(test)]
    fn buffered_len(&self) -> usize {
        match &*self.state.lock().unwrap() {
            State::Buffering(records) => records.len(),
            State::Ready(_) => 0,
        }
    }
}

fn emit(level: Level, message: &str, verbosity: Verbosity) {
    if verbosity >= level.threshold() {
        eprintln!("{} {}", level.label(), message);
    }
}
