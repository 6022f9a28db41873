//! Process spawning
//!
//! Every command runs under the context's shell interpreter and completes
//! through exactly one result: `Ok` on a clean zero exit, a `Spawn` error
//! when the OS could not launch the process, or an `Exit` error carrying
//! the exit code or termination signal.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::context::{IoMode, ShellContext};
use crate::runner::tracker::ProcessTracker;
use std::io::Write;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

/// Build the interpreter command for a script in the given context.
///
/// On POSIX the child is put in its own process group so that a later
/// termination reaches the whole tree it spawns.
pub fn shell_command(script: &str, ctx: &ShellContext) -> Command {
    let mut command = Command::new(&ctx.interpreter[0]);
    if ctx.interpreter.len() > 1 {
        command.args(&ctx.interpreter[1..]);
    }

    #[cfg(windows)]
    command.raw_arg(script);
    #[cfg(not(windows))]
    command.arg(script);

    command.current_dir(&ctx.working_dir);
    command.envs(&ctx.env);

    #[cfg(unix)]
    command.process_group(0);

    command
}

/// Spawn a command, register it with the tracker, and wait for it to
/// close. In `Capture` mode the output is held in memory and flushed
/// verbatim once the process has closed, so concurrent siblings never
/// interleave mid-line.
pub async fn run_command(
    task: &str,
    script: &str,
    ctx: &ShellContext,
    tracker: &ProcessTracker,
) -> ExecutionResult<()> {
    let mut command = shell_command(script, ctx);
    match ctx.io {
        IoMode::Inherit => {
            command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        }
        IoMode::Capture => {
            command
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        }
    }

    let mut child = command.spawn().map_err(|source| ExecutionError::Spawn {
        task: task.to_string(),
        source,
    })?;
    let pid = child.id().unwrap_or_default();
    tracker.add(pid);

    let status = match ctx.io {
        IoMode::Inherit => {
            let result = child.wait().await;
            tracker.remove(pid);
            result.map_err(|source| ExecutionError::Spawn {
                task: task.to_string(),
                source,
            })?
        }
        IoMode::Capture => {
            let result = child.wait_with_output().await;
            tracker.remove(pid);
            let output = result.map_err(|source| ExecutionError::Spawn {
                task: task.to_string(),
                source,
            })?;
            flush(&output.stdout, &output.stderr);
            output.status
        }
    };

    exit_result(task, status)
}

fn flush(stdout: &[u8], stderr: &[u8]) {
    if !stdout.is_empty() {
        let out = std::io::stdout();
        let mut handle = out.lock();
        let _ = handle.write_all(stdout);
        let _ = handle.flush();
    }
    if !stderr.is_empty() {
        let err = std::io::stderr();
        let mut handle = err.lock();
        let _ = handle.write_all(stderr);
        let _ = handle.flush();
    }
}

fn exit_result(task: &str, status: ExitStatus) -> ExecutionResult<()> {
    if status.success() {
        return Ok(());
    }

    #[cfg(unix)]
    let signal = std::os::unix::process::ExitStatusExt::signal(&status);
    #[cfg(not(unix))]
    let signal = None;

    Err(ExecutionError::Exit {
        task: task.to_string(),
        code: status.code(),
        signal,
    })
}

/// Terminate a process together with everything it spawned. Best-effort:
/// failures (the tree may already be gone) are swallowed.
pub async fn kill_tree(pid: u32) {
    if pid == 0 {
        return;
    }

    #[cfg(unix)]
    unsafe {
        libc::kill(-(pid as i32), libc::SIGTERM);
    }

    #[cfg(windows)]
    {
        let _ = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .output()
            .await;
    }
}
