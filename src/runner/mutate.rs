//! Command mutation
//!
//! Two rewrites run against every command before it spawns: appending
//! passthrough custom flags, and expanding archetype package paths so a
//! script shipped inside an archetype can reference its own files.

use crate::config::ROOT_ARCHETYPE;
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::context::ShellContext;
use crate::runner::plan::TaskCommand;
use regex::Regex;
use std::collections::HashMap;

/// Environment carrier for custom flags, a JSON-encoded list of strings.
/// Nested rask invocations read it to inherit and extend the flag list.
pub const FLAGS_ENV: &str = "RASK_FLAGS";

/// Environment marker recording that archetype path expansion is active.
pub const EXPAND_ENV: &str = "RASK_EXPAND_ARCHETYPE";

/// Merge inherited carrier flags with this invocation's flags, storing the
/// result on the context and back into the carrier variable.
pub fn merge_custom_flags(ctx: &mut ShellContext, flags: &[String]) {
    let mut merged = read_carrier(&ctx.env);
    merged.extend(flags.iter().cloned());
    if !merged.is_empty() {
        if let Ok(encoded) = serde_json::to_string(&merged) {
            ctx.env.insert(FLAGS_ENV.to_string(), encoded);
        }
    }
    ctx.custom_flags = merged;
}

/// Read the flag carrier from the context environment, falling back to the
/// real process environment (how a nested invocation receives it).
fn read_carrier(env: &HashMap<String, String>) -> Vec<String> {
    let raw = env
        .get(FLAGS_ENV)
        .cloned()
        .or_else(|| std::env::var(FLAGS_ENV).ok());
    match raw {
        Some(raw) => serde_json::from_str(&raw).unwrap_or_default(),
        None => Vec::new(),
    }
}

/// Append the merged custom flags as literal trailing text.
///
/// Only main commands get the textual form, and only when the command is
/// not itself a rask invocation; a nested invocation picks the flags up
/// from the carrier variable instead, so they are never applied twice.
pub fn apply_custom_flags(script: &str, command: &TaskCommand, ctx: &ShellContext) -> String {
    if ctx.custom_flags.is_empty() || !command.is_main || command.is_nested {
        return script.to_string();
    }
    let mut out = String::from(script);
    for flag in &ctx.custom_flags {
        out.push(' ');
        out.push_str(flag);
    }
    out
}

/// Rewrite `node_modules/<archetype>` tokens to the package's absolute
/// path, so archetype scripts run against their real install location.
///
/// Only token occurrences are rewritten: a match at the very start of the
/// command, or one immediately preceded by whitespace or a quote. That
/// leaves sibling paths like `other/node_modules/x` and relative paths
/// like `../node_modules/x` untouched. The reserved ROOT name is never
/// expanded; the invoking project's own install depth is not predictable.
pub fn expand_archetype_path(
    script: &str,
    command: &TaskCommand,
    ctx: &ShellContext,
) -> ExecutionResult<String> {
    if !ctx.expand_archetype {
        return Ok(script.to_string());
    }

    let name = command
        .archetype_name
        .as_deref()
        .ok_or(ExecutionError::Internal(
            "archetype expansion requested for a command without an archetype name",
        ))?;
    if name == ROOT_ARCHETYPE {
        return Ok(script.to_string());
    }
    let path = command
        .archetype_path
        .as_deref()
        .ok_or(ExecutionError::Internal(
            "archetype expansion requested for a command without a resolved path",
        ))?;

    let pattern = Regex::new(&format!(r"node_modules[/\\]{}", regex::escape(name)))
        .map_err(|_| ExecutionError::Internal("invalid archetype token pattern"))?;

    let replacement = path.display().to_string();
    let mut out = String::with_capacity(script.len());
    let mut last = 0;
    for found in pattern.find_iter(script) {
        if is_token_start(script, found.start()) {
            out.push_str(&script[last..found.start()]);
            out.push_str(&replacement);
            last = found.end();
        }
    }
    out.push_str(&script[last..]);
    Ok(out)
}

fn is_token_start(script: &str, at: usize) -> bool {
    match script[..at].chars().next_back() {
        None => true,
        Some(c) => c.is_whitespace() || c == '"' || c == '\'' || c == '`',
    }
}

/// Derive the command text for one attempt from its base command.
pub fn derive(command: &TaskCommand, ctx: &ShellContext) -> ExecutionResult<String> {
    let script = apply_custom_flags(&command.script, command, ctx);
    expand_archetype_path(&script, command, ctx)
}
