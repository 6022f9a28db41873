//! Setup process coordination
//!
//! A setup task is an auxiliary command (a database, a dev server) whose
//! process is expected to outlive the whole invocation. It is started at
//! most once, no matter how many concurrent task branches ask for it, and
//! an exit before the main work has finished aborts the invocation.

use crate::error::{ExecutionError, ExecutionResult};
use crate::logger::Logger;
use crate::runner::context::ShellContext;
use crate::runner::engine::ErrorSink;
use crate::runner::spawn;
use crate::runner::tracker::ProcessTracker;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Guards the one setup process of an engine invocation
pub struct SetupCoordinator {
    started: Mutex<bool>,
    fatal: Arc<AtomicBool>,
    finishing: Arc<AtomicBool>,
    errors: ErrorSink,
}

impl SetupCoordinator {
    pub fn new(errors: ErrorSink) -> Self {
        SetupCoordinator {
            started: Mutex::new(false),
            fatal: Arc::new(AtomicBool::new(false)),
            finishing: Arc::new(AtomicBool::new(false)),
            errors,
        }
    }

    /// Whether the setup process exited prematurely.
    pub fn is_fatal(&self) -> bool {
        self.fatal.load(Ordering::SeqCst)
    }

    /// Mark the main work as finished: from here on a setup exit is the
    /// expected result of cleanup, not a failure.
    pub fn finish(&self) {
        self.finishing.store(true, Ordering::SeqCst);
    }

    /// Start the setup process if it has not been started yet.
    ///
    /// Race-safe: concurrent callers serialize on the guard, and only the
    /// first one actually spawns. The setup always inherits stdio; its
    /// output is service output, not task output worth buffering.
    pub async fn ensure_started(
        &self,
        task: &str,
        script: &str,
        ctx: &ShellContext,
        tracker: &ProcessTracker,
        logger: &Logger,
    ) -> ExecutionResult<()> {
        if task.is_empty() {
            return Ok(());
        }

        let mut started = self.started.lock().await;
        if *started {
            return Ok(());
        }

        let mut command = spawn::shell_command(script, ctx);
        command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        let mut child = command.spawn().map_err(|source| ExecutionError::Spawn {
            task: task.to_string(),
            source,
        })?;
        let pid = child.id().unwrap_or_default();
        tracker.add(pid);
        *started = true;
        drop(started);

        logger.debug(&format!("setup '{}' started (pid {})", task, pid));

        // Watch for the process going away while work is still running.
        let task = task.to_string();
        let fatal = Arc::clone(&self.fatal);
        let finishing = Arc::clone(&self.finishing);
        let errors = Arc::clone(&self.errors);
        let tracker = tracker.clone();
        let logger = logger.clone();
        tokio::spawn(async move {
            let status = child.wait().await;
            tracker.remove(pid);
            if finishing.load(Ordering::SeqCst) {
                return;
            }
            let code = status.ok().and_then(|s| s.code());
            logger.error(&format!(
                "setup '{}' exited before the invocation finished",
                task
            ));
            fatal.store(true, Ordering::SeqCst);
            errors
                .lock()
                .unwrap()
                .push(ExecutionError::SetupExited { task, code });
            tracker.kill().await;
        });

        Ok(())
    }
}
