//! Retry execution
//!
//! Runs a command up to its configured number of attempts, stopping at the
//! first success. The command text is re-derived from its base for every
//! attempt, and every attempt's process is registered with the tracker
//! before it resolves, so an external kill reaches an in-flight retry.

use crate::error::{ExecutionError, ExecutionResult};
use crate::logger::Logger;
use crate::runner::context::ShellContext;
use crate::runner::plan::PlanStep;
use crate::runner::tracker::ProcessTracker;
use crate::runner::{mutate, spawn};

/// Run one plan step under its retry policy. The returned error is always
/// the most recent attempt's.
pub async fn run_step(
    step: &PlanStep,
    ctx: &ShellContext,
    tracker: &ProcessTracker,
    logger: &Logger,
) -> ExecutionResult<()> {
    let tries = step.options.tries.max(1);
    let mut attempt = 1;
    loop {
        let script = mutate::derive(&step.command, ctx)?;
        logger.command(&script);
        match spawn::run_command(&step.command.name, &script, ctx, tracker).await {
            Ok(()) => return Ok(()),
            // A process the OS never launched is not worth retrying.
            Err(err @ ExecutionError::Spawn { .. }) => return Err(err),
            Err(err) => {
                if attempt >= tries || tracker.is_killed() {
                    return Err(err);
                }
                logger.warn(&format!(
                    "task '{}' failed ({}); {} attempt(s) remaining",
                    step.command.name,
                    err,
                    tries - attempt
                ));
                attempt += 1;
            }
        }
    }
}
