//! Configuration validation
//!
//! This module provides validation logic for configuration files.

use crate::config::types::Config;
use crate::error::{ConfigError, ConfigResult};

/// Validate a complete configuration
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    if let Some(interpreter) = &config.interpreter {
        if interpreter.is_empty() {
            return Err(ConfigError::Invalid(
                "interpreter must name at least a binary".to_string(),
            ));
        }
    }

    for name in &config.archetypes {
        validate_archetype_name(name)?;
    }

    for (name, script) in &config.scripts {
        validate_script(name, script)?;
    }

    Ok(())
}

/// Archetype names become path components under node_modules, so they must
/// not escape that directory.
fn validate_archetype_name(name: &str) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(ConfigError::Invalid(
            "archetype name must not be empty".to_string(),
        ));
    }
    if name == ".." || name.contains('/') || name.contains('\\') {
        return Err(ConfigError::Invalid(format!(
            "archetype name '{}' must be a plain package name",
            name
        )));
    }
    Ok(())
}

/// Validate a single script entry
fn validate_script(name: &str, script: &str) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(ConfigError::Invalid(
            "script name must not be empty".to_string(),
        ));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid(format!(
            "script name '{}' must not contain whitespace",
            name
        )));
    }
    if script.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "script '{}' has an empty command",
            name
        )));
    }
    Ok(())
}
