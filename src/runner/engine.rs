//! Execution engine
//!
//! One engine is built per invocation. It resolves task plans, drives them
//! through the three execution modes, and always drains the process
//! tracker before handing its result back, whatever happened in between.

use crate::config::{LoadedConfig, ResolvedScript};
use crate::error::{ConfigResult, ExecutionError, ExecutionResult, RaskError, Result};
use crate::logger::Logger;
use crate::runner::context::{IoMode, ShellContext};
use crate::runner::envset::EnvironmentSet;
use crate::runner::plan::{ExecutionOptions, TaskPlan};
use crate::runner::retry;
use crate::runner::setup::SetupCoordinator;
use crate::runner::tracker::ProcessTracker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Errors accumulated across concurrent plan branches, in arrival order
pub(crate) type ErrorSink = Arc<Mutex<Vec<ExecutionError>>>;

/// Single-invocation execution engine. Consumed by whichever mode runs.
pub struct ExecutionEngine {
    config: LoadedConfig,
    ctx: ShellContext,
    logger: Logger,
    tracker: ProcessTracker,
    setup: Arc<SetupCoordinator>,
    errors: ErrorSink,
}

impl ExecutionEngine {
    pub fn new(config: LoadedConfig, ctx: ShellContext, logger: Logger) -> Self {
        let errors: ErrorSink = Arc::new(Mutex::new(Vec::new()));
        let setup = Arc::new(SetupCoordinator::new(Arc::clone(&errors)));
        ExecutionEngine {
            config,
            ctx,
            logger,
            tracker: ProcessTracker::new(),
            setup,
            errors,
        }
    }

    /// Run a single task: pre hook, setup, main (retried), post hook.
    pub async fn run(self, task: &str, options: ExecutionOptions) -> Result<()> {
        let plan = TaskPlan::resolve(&self.config, "run", task, &options)?;
        let setup = self.resolve_setup("run", &options)?;
        let plans = vec![(plan, self.ctx.clone())];
        self.drive(plans, &options, setup).await
    }

    /// Run several tasks as one batch under bounded concurrency.
    pub async fn concurrent(self, tasks: &[String], options: ExecutionOptions) -> Result<()> {
        let mut plans = Vec::with_capacity(tasks.len());
        for task in tasks {
            let plan = TaskPlan::resolve(&self.config, "concurrent", task, &options)?;
            plans.push((plan, self.ctx.clone()));
        }
        let setup = self.resolve_setup("concurrent", &options)?;
        self.drive(plans, &options, setup).await
    }

    /// Run one task once per environment set entry, as a batch.
    pub async fn envs(
        self,
        task: &str,
        sets: EnvironmentSet,
        options: ExecutionOptions,
    ) -> Result<()> {
        let plan = TaskPlan::resolve(&self.config, "envs", task, &options)?;
        let setup = self.resolve_setup("envs", &options)?;
        let plans = sets
            .into_iter()
            .map(|entry| {
                let mut ctx = self.ctx.clone();
                ctx.env.extend(entry);
                (plan.clone(), ctx)
            })
            .collect();
        self.drive(plans, &options, setup).await
    }

    fn resolve_setup(
        &self,
        action: &str,
        options: &ExecutionOptions,
    ) -> ConfigResult<Option<ResolvedScript>> {
        options
            .setup
            .as_deref()
            .map(|name| self.config.resolve_script(action, name))
            .transpose()
    }

    /// Schedule all plans under the queue bound, wait for every started
    /// plan to settle, then clean up and surface the first failure.
    async fn drive(
        self,
        plans: Vec<(TaskPlan, ShellContext)>,
        options: &ExecutionOptions,
        setup: Option<ResolvedScript>,
    ) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(
            options.queue.unwrap_or(Semaphore::MAX_PERMITS),
        ));
        let bail_tripped = Arc::new(AtomicBool::new(false));
        let setup = setup.map(Arc::new);

        let mut handles = Vec::with_capacity(plans.len());
        for (plan, mut ctx) in plans {
            if options.buffer {
                ctx.io = IoMode::Capture;
            }
            handles.push(tokio::spawn(run_plan(PlanJob {
                plan,
                ctx,
                bail: options.bail,
                semaphore: Arc::clone(&semaphore),
                bail_tripped: Arc::clone(&bail_tripped),
                setup: setup.clone(),
                coordinator: Arc::clone(&self.setup),
                tracker: self.tracker.clone(),
                errors: Arc::clone(&self.errors),
                logger: self.logger.clone(),
            })));
        }
        for handle in handles {
            let _ = handle.await;
        }

        self.finish().await
    }

    /// Unconditional final step: the main work is over, so a setup exit is
    /// no longer fatal, every surviving process tree is terminated, and
    /// the first accumulated error (if any) becomes the result.
    async fn finish(self) -> Result<()> {
        self.setup.finish();
        self.tracker.kill().await;

        let mut errors = self.errors.lock().unwrap();
        match errors.len() {
            0 => Ok(()),
            1 => Err(RaskError::Execution(errors.remove(0))),
            n => {
                self.logger
                    .warn(&format!("{} tasks failed; reporting the first failure", n));
                Err(RaskError::Execution(errors.remove(0)))
            }
        }
    }
}

struct PlanJob {
    plan: TaskPlan,
    ctx: ShellContext,
    bail: bool,
    semaphore: Arc<Semaphore>,
    bail_tripped: Arc<AtomicBool>,
    setup: Option<Arc<ResolvedScript>>,
    coordinator: Arc<SetupCoordinator>,
    tracker: ProcessTracker,
    errors: ErrorSink,
    logger: Logger,
}

async fn run_plan(job: PlanJob) {
    let _permit = match Arc::clone(&job.semaphore).acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return,
    };

    // A plan that has not started yet stays unstarted once a sibling
    // failed under bail, or once the invocation is already going down.
    if job.bail && job.bail_tripped.load(Ordering::SeqCst) {
        return;
    }
    if job.tracker.is_killed() || job.coordinator.is_fatal() {
        return;
    }

    let name = job.plan.main.command.name.clone();
    job.logger.info(&format!("Running task: {}", name));

    match execute_steps(&job).await {
        Ok(()) => job.logger.debug(&format!("Task completed: {}", name)),
        Err(err) => {
            job.bail_tripped.store(true, Ordering::SeqCst);
            job.errors.lock().unwrap().push(err);
        }
    }
}

/// Run one plan's steps in order. Each step sits behind the same guard:
/// once the tracker is killed or the setup died, the remaining steps are
/// immediate no-ops instead of new work.
async fn execute_steps(job: &PlanJob) -> ExecutionResult<()> {
    let halted = || job.tracker.is_killed() || job.coordinator.is_fatal();

    if let Some(pre) = &job.plan.pre {
        if halted() {
            return Ok(());
        }
        retry::run_step(pre, &job.ctx, &job.tracker, &job.logger).await?;
    }

    if let Some(setup) = &job.setup {
        if halted() {
            return Ok(());
        }
        job.coordinator
            .ensure_started(&setup.name, &setup.script, &job.ctx, &job.tracker, &job.logger)
            .await?;
    }

    if halted() {
        return Ok(());
    }
    retry::run_step(&job.plan.main, &job.ctx, &job.tracker, &job.logger).await?;

    if let Some(post) = &job.plan.post {
        if halted() {
            return Ok(());
        }
        retry::run_step(post, &job.ctx, &job.tracker, &job.logger).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Archetype, Config};
    use crate::error::ConfigError;
    use crate::logger::Verbosity;
    use std::collections::HashMap;
    use std::path::Path;

    fn engine_with(scripts: &[(&str, &str)]) -> ExecutionEngine {
        let config = LoadedConfig {
            config: Config {
                name: None,
                interpreter: None,
                archetypes: Vec::new(),
                scripts: scripts
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
            root: Path::new(".").to_path_buf(),
            archetypes: Vec::<Archetype>::new(),
        };
        ExecutionEngine::new(
            config,
            ShellContext::new(),
            Logger::with_verbosity(Verbosity::Silent),
        )
    }

    #[tokio::test]
    async fn test_run_unknown_task_is_config_error() {
        let engine = engine_with(&[]);
        let result = engine.run("ghost", ExecutionOptions::default()).await;
        assert!(matches!(
            result,
            Err(RaskError::Config(ConfigError::TaskNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_unknown_setup_task_fails_before_running() {
        let engine = engine_with(&[("ok", "true")]);
        let options = ExecutionOptions::default().with_setup(Some("ghost".to_string()));
        let result = engine.run("ok", options).await;
        assert!(matches!(
            result,
            Err(RaskError::Config(ConfigError::TaskNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_single_run_success() {
        let engine = engine_with(&[("ok", "true")]);
        let result = engine.run("ok", ExecutionOptions::default()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_envs_overrides_template_environment() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("out");
        let script = format!("echo \"$STAGE\" >> {}", out.display());
        let engine = engine_with(&[("emit", script.as_str())]);

        let mut first = HashMap::new();
        first.insert("STAGE".to_string(), "one".to_string());
        let mut second = HashMap::new();
        second.insert("STAGE".to_string(), "two".to_string());

        let result = engine
            .envs("emit", vec![first, second], ExecutionOptions::default())
            .await;
        assert!(result.is_ok());

        let mut lines: Vec<String> = std::fs::read_to_string(&out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        lines.sort();
        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
    }
}
