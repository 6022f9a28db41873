//! Common test utilities

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use rask::config::{load_project, LoadedConfig};
use rask::logger::{Logger, Verbosity};
use rask::runner::{ExecutionEngine, ShellContext};

/// Create a temporary project directory with a rask.yml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("rask.yml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Add an archetype package with its own rask.yml under node_modules
pub fn create_archetype(root: &Path, name: &str, content: &str) {
    let dir = root.join("node_modules").join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("rask.yml"), content).unwrap();
}

/// Logger that swallows everything, so test output stays readable
pub fn quiet_logger() -> Logger {
    Logger::with_verbosity(Verbosity::Silent)
}

/// Load a project configuration for tests
pub fn load(config_path: &Path) -> LoadedConfig {
    load_project(config_path, &quiet_logger()).unwrap()
}

/// Build an engine rooted at the given project
pub fn engine_for(config_path: &Path) -> ExecutionEngine {
    let project = load(config_path);
    let ctx = ShellContext::new().with_working_dir(project.root.clone());
    ExecutionEngine::new(project, ctx, quiet_logger())
}

/// Build an engine with a caller-prepared context
pub fn engine_with_ctx(config_path: &Path, ctx: ShellContext) -> ExecutionEngine {
    let project = load(config_path);
    ExecutionEngine::new(project, ctx, quiet_logger())
}

/// Read the lines of a marker file, empty if it does not exist
pub fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
