//! Configuration file parsing and discovery

use crate::config::types::{Archetype, Config, LoadedConfig};
use crate::config::validate_config;
use crate::error::{ConfigError, ConfigResult, RaskError};
use crate::logger::Logger;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["rask.yml", "rask.yaml"];

/// Directory archetype packages are installed under
pub const PACKAGE_DIR: &str = "node_modules";

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.exists() && config_path.is_file() {
                return Ok(config_path);
            }
        }

        // Try parent directory
        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => {
                // Reached root without finding config
                return Err(ConfigError::NotFound(searched_paths.join(", ")));
            }
        }
    }
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<Config, RaskError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read file: {}", e)))?;

    parse_config(&contents)
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str) -> Result<Config, RaskError> {
    let config: Config = serde_yaml::from_str(yaml)?;
    Ok(config)
}

/// Load a project configuration and the archetypes it declares.
///
/// Each declared archetype must provide its own rask.yml under
/// `node_modules/<name>/`; a declared archetype that cannot be loaded is a
/// configuration error rather than a silent gap.
pub fn load_project(config_path: &Path, logger: &Logger) -> Result<LoadedConfig, RaskError> {
    let config = parse_config_file(config_path)?;
    validate_config(&config)?;

    let root = config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut archetypes = Vec::new();
    for name in &config.archetypes {
        let dir = root.join(PACKAGE_DIR).join(name);
        logger.debug(&format!("loading archetype '{}' from {}", name, dir.display()));
        let archetype_config_path = find_archetype_config(&dir).ok_or_else(|| {
            ConfigError::Archetype {
                name: name.clone(),
                error: format!("no rask.yml found in {}", dir.display()),
            }
        })?;
        let archetype_config =
            parse_config_file(&archetype_config_path).map_err(|e| ConfigError::Archetype {
                name: name.clone(),
                error: e.to_string(),
            })?;
        archetypes.push(Archetype {
            name: name.clone(),
            path: dir,
            config: archetype_config,
        });
    }

    Ok(LoadedConfig {
        config,
        root,
        archetypes,
    })
}

fn find_archetype_config(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Load a project with automatic file discovery
pub fn load_project_auto(logger: &Logger) -> Result<LoadedConfig, RaskError> {
    let config_path = find_config_file()?;
    logger.debug(&format!("using config file {}", config_path.display()));
    load_project(&config_path, logger)
}

/// Read `.env` entries from the project root, if the file exists.
///
/// Variables already present in the real environment win over the file.
pub fn load_dotenv(root: &Path) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    let path = root.join(".env");
    if !path.is_file() {
        return vars;
    }
    if let Ok(entries) = dotenvy::from_path_iter(&path) {
        for entry in entries.flatten() {
            let (key, value) = entry;
            if env::var_os(&key).is_none() {
                vars.insert(key, value);
            }
        }
    }
    vars
}
