//! Environment-set parsing for the matrix mode
//!
//! The matrix input is a JSON list of objects, supplied either as a
//! literal string or as a file path. It is parsed and validated in full
//! before any process starts.

use crate::error::{ExecutionError, ExecutionResult};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One variable mapping per parallel task instance
pub type EnvironmentSet = Vec<HashMap<String, String>>;

/// Parse an environment set from a literal JSON string or a file.
/// Exactly one of the two sources must be given.
pub fn parse_env_sets(
    literal: Option<&str>,
    file: Option<&Path>,
) -> ExecutionResult<EnvironmentSet> {
    let text = match (literal, file) {
        (Some(_), Some(_)) => {
            return Err(ExecutionError::EnvParse(
                "give either a literal list or a file, not both".to_string(),
            ))
        }
        (Some(s), None) => s.to_string(),
        (None, Some(path)) => fs::read_to_string(path).map_err(|e| {
            ExecutionError::EnvParse(format!("failed to read {}: {}", path.display(), e))
        })?,
        (None, None) => {
            return Err(ExecutionError::EnvParse(
                "an environment set list or file is required".to_string(),
            ))
        }
    };

    let value: Value = serde_json::from_str(&text)
        .map_err(|e| ExecutionError::EnvParse(format!("invalid JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        _ => {
            return Err(ExecutionError::EnvParse(
                "top-level value must be a list".to_string(),
            ))
        }
    };
    if items.is_empty() {
        return Err(ExecutionError::EnvParse(
            "the list must not be empty".to_string(),
        ));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| entry_vars(index, item))
        .collect()
}

fn entry_vars(index: usize, item: Value) -> ExecutionResult<HashMap<String, String>> {
    let map = match item {
        Value::Object(map) => map,
        _ => {
            return Err(ExecutionError::EnvParse(format!(
                "entry {} is not an object",
                index
            )))
        }
    };

    map.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(ExecutionError::EnvParse(format!(
                        "entry {} key '{}' must be a scalar",
                        index, key
                    )))
                }
            };
            Ok((key, value))
        })
        .collect()
}
