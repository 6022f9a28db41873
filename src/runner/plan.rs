//! Execution options and task plans
//!
//! A task plan is the resolved unit of work for one task name: the main
//! command plus its discovered pre/post hooks, each paired with the
//! options it runs under.

use crate::config::{LoadedConfig, ResolvedScript};
use crate::error::ConfigResult;
use std::path::PathBuf;

/// Options controlling how tasks execute.
///
/// Out-of-range values normalize to their defaults instead of erroring, so
/// `--tries 0` simply behaves like a single attempt.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Total number of attempts for a main command (at least 1)
    pub tries: u32,

    /// Maximum number of sibling tasks in flight; None means unlimited
    pub queue: Option<usize>,

    /// Buffer command output and flush it once the command closes
    pub buffer: bool,

    /// Stop scheduling further siblings after the first failure
    pub bail: bool,

    /// Task whose process should stay alive for the whole invocation
    pub setup: Option<String>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        ExecutionOptions {
            tries: 1,
            queue: None,
            buffer: false,
            bail: true,
            setup: None,
        }
    }
}

impl ExecutionOptions {
    pub fn with_tries(mut self, tries: u32) -> Self {
        self.tries = tries.max(1);
        self
    }

    pub fn with_queue(mut self, queue: Option<usize>) -> Self {
        self.queue = queue.filter(|n| *n > 0);
        self
    }

    pub fn with_buffer(mut self, buffer: bool) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_bail(mut self, bail: bool) -> Self {
        self.bail = bail;
        self
    }

    pub fn with_setup(mut self, setup: Option<String>) -> Self {
        self.setup = setup.filter(|s| !s.is_empty());
        self
    }

    /// Options forced onto pre/post hooks: a single attempt, no setup.
    fn for_hook(&self) -> Self {
        ExecutionOptions {
            tries: 1,
            queue: self.queue,
            buffer: self.buffer,
            bail: self.bail,
            setup: None,
        }
    }
}

/// A resolved command ready for mutation and spawning
#[derive(Debug, Clone)]
pub struct TaskCommand {
    /// Task name the command resolved from
    pub name: String,

    /// The base shell command, before per-attempt mutation
    pub script: String,

    /// Whether the command is itself a rask invocation; nested invocations
    /// receive custom flags through the environment carrier only
    pub is_nested: bool,

    /// Main commands receive custom flags; hooks never do
    pub is_main: bool,

    /// Providing archetype name (ROOT for project-local scripts)
    pub archetype_name: Option<String>,

    /// Absolute archetype package path, when one exists
    pub archetype_path: Option<PathBuf>,
}

impl TaskCommand {
    fn from_resolved(resolved: ResolvedScript, is_main: bool) -> Self {
        let is_nested = crate::config::is_nested_invocation(&resolved.script);
        TaskCommand {
            name: resolved.name,
            script: resolved.script,
            is_nested,
            is_main,
            archetype_name: Some(resolved.archetype_name),
            archetype_path: resolved.archetype_path,
        }
    }
}

/// One step of a plan: a command and the options it runs under
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub command: TaskCommand,
    pub options: ExecutionOptions,
}

/// The full unit of work for one task name
#[derive(Debug, Clone)]
pub struct TaskPlan {
    pub pre: Option<PlanStep>,
    pub main: PlanStep,
    pub post: Option<PlanStep>,
}

impl TaskPlan {
    /// Resolve a plan for a task: the main command, plus pre/post hooks
    /// unless the task name itself carries a hook prefix.
    pub fn resolve(
        config: &LoadedConfig,
        action: &str,
        name: &str,
        options: &ExecutionOptions,
    ) -> ConfigResult<TaskPlan> {
        let main = PlanStep {
            command: TaskCommand::from_resolved(config.resolve_script(action, name)?, true),
            options: options.clone(),
        };

        let (pre, post) = if LoadedConfig::hooks_allowed(name) {
            let hook = |hook_name: String| {
                config.resolve_hook(action, &hook_name).map(|resolved| PlanStep {
                    command: TaskCommand::from_resolved(resolved, false),
                    options: options.for_hook(),
                })
            };
            (hook(format!("pre{}", name)), hook(format!("post{}", name)))
        } else {
            (None, None)
        };

        Ok(TaskPlan { pre, main, post })
    }
}
