//! Script resolution
//!
//! Maps a task name to the concrete command string that should run, scanning
//! the project's own scripts before archetype-provided ones and skipping
//! definitions that would recurse straight back into rask.

use crate::config::types::LoadedConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::PathBuf;

/// Name of the rask binary, as it would appear in a script body
pub const BIN_NAME: &str = "rask";

/// Reserved archetype name for the invoking project itself
pub const ROOT_ARCHETYPE: &str = "ROOT";

/// Task-name prefixes reserved for hooks
const HOOK_PREFIXES: &[&str] = &["pre", "post"];

/// A task name resolved to a concrete command, together with the source
/// that provided it.
#[derive(Debug, Clone)]
pub struct ResolvedScript {
    /// Task name as requested
    pub name: String,

    /// The shell command to run
    pub script: String,

    /// Providing archetype, or ROOT for project-local scripts
    pub archetype_name: String,

    /// Absolute package directory for archetype scripts; None for ROOT
    pub archetype_path: Option<PathBuf>,
}

impl LoadedConfig {
    /// Resolve a task name to the first concrete definition found, scanning
    /// the project's scripts before archetypes in declared order.
    ///
    /// A definition that merely re-invokes rask with the identical action
    /// and task name is skipped, so a project script can delegate its name
    /// to an archetype without recursing forever.
    pub fn resolve_script(&self, action: &str, name: &str) -> ConfigResult<ResolvedScript> {
        if let Some(script) = self.config.scripts.get(name) {
            if !is_self_referential(script, action, name) {
                return Ok(ResolvedScript {
                    name: name.to_string(),
                    script: script.clone(),
                    archetype_name: ROOT_ARCHETYPE.to_string(),
                    archetype_path: None,
                });
            }
        }

        for archetype in &self.archetypes {
            if let Some(script) = archetype.config.scripts.get(name) {
                if is_self_referential(script, action, name) {
                    continue;
                }
                return Ok(ResolvedScript {
                    name: name.to_string(),
                    script: script.clone(),
                    archetype_name: archetype.name.clone(),
                    archetype_path: Some(archetype.path.clone()),
                });
            }
        }

        Err(ConfigError::TaskNotFound(name.to_string()))
    }

    /// Resolve a hook task, treating absence as None rather than an error.
    pub fn resolve_hook(&self, action: &str, name: &str) -> Option<ResolvedScript> {
        self.resolve_script(action, name).ok()
    }

    /// Whether a task name may have pre/post hooks discovered for it.
    /// Tasks already named with a hook prefix never get hooks of their own.
    pub fn hooks_allowed(name: &str) -> bool {
        !HOOK_PREFIXES.iter().any(|p| name.starts_with(p))
    }
}

/// Whether a script body is rask re-invoking the identical action and task.
pub fn is_self_referential(script: &str, action: &str, name: &str) -> bool {
    let mut words = script.split_whitespace();
    words.next() == Some(BIN_NAME) && words.next() == Some(action) && words.next() == Some(name)
}

/// Whether a command string is itself an invocation of rask.
pub fn is_nested_invocation(script: &str) -> bool {
    script.split_whitespace().next() == Some(BIN_NAME)
}
