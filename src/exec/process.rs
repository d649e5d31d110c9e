// src/exec/process.rs

//! Real subprocess launcher.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use command_group::{AsyncCommandGroup, AsyncGroupChild};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::backend::{LaunchFuture, ProcessLauncher, ToolExit, ToolInvocation};
use crate::engine::RunScope;

/// How long a cancelled process group gets between SIGTERM and SIGKILL.
const TERMINATE_GRACE: Duration = Duration::from_millis(500);

/// Launches invocations with `tokio::process`.
///
/// - stdout is forwarded line by line to our stdout.
/// - stderr lines go to the caller's callback.
/// - Each child leads its own process group. If the scope is cancelled the
///   whole group is terminated and reaped, and the launch resolves to
///   [`ToolExit::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for SystemLauncher {
    fn launch<'a>(
        &'a self,
        invocation: &'a ToolInvocation,
        scope: &'a RunScope,
        on_stderr: &'a mut (dyn FnMut(&str) + Send),
    ) -> LaunchFuture<'a> {
        Box::pin(run_process(invocation, scope, on_stderr))
    }
}

async fn run_process(
    invocation: &ToolInvocation,
    scope: &RunScope,
    on_stderr: &mut (dyn FnMut(&str) + Send),
) -> Result<ToolExit> {
    if scope.is_cancelled() {
        return Ok(ToolExit::Cancelled);
    }

    info!(
        run_id = scope.id(),
        kind = %invocation.kind,
        cmd = %invocation.command_line(),
        "starting process"
    );

    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .current_dir(&invocation.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let mut child: AsyncGroupChild = cmd
        .group_spawn()
        .with_context(|| format!("spawning `{}`", invocation.command_line()))?;

    let stdout_task = child.inner().stdout.take().map(|stdout| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                println!("{line}");
            }
        })
    });

    // Read stderr to EOF first so the callback sees every line, then reap.
    if let Some(stderr) = child.inner().stderr.take() {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            tokio::select! {
                biased;
                _ = scope.cancelled() => return kill_child(&mut child, invocation, scope).await,
                line = lines.next_line() => {
                    match line.with_context(|| format!("reading stderr of `{}`", invocation.program))? {
                        Some(line) => on_stderr(&line),
                        None => break,
                    }
                }
            }
        }
    }

    let status = tokio::select! {
        biased;
        _ = scope.cancelled() => return kill_child(&mut child, invocation, scope).await,
        status = child.wait() => status
            .with_context(|| format!("waiting for `{}`", invocation.program))?,
    };

    if let Some(task) = stdout_task {
        if let Err(e) = task.await {
            debug!(error = %e, "stdout forwarder ended abnormally");
        }
    }

    let code = status.code().unwrap_or(-1);
    info!(
        run_id = scope.id(),
        kind = %invocation.kind,
        exit_code = code,
        success = status.success(),
        "process exited"
    );

    Ok(ToolExit::Exited(code))
}

async fn kill_child(
    child: &mut AsyncGroupChild,
    invocation: &ToolInvocation,
    scope: &RunScope,
) -> Result<ToolExit> {
    info!(
        run_id = scope.id(),
        kind = %invocation.kind,
        "run cancelled; terminating process group"
    );
    terminate_process_group(child, TERMINATE_GRACE).await;
    Ok(ToolExit::Cancelled)
}

/// SIGTERM the group, give it `grace` to exit, then SIGKILL and reap.
///
/// Signalling the group rather than the leader also stops compilers and
/// test binaries the tool forked.
#[cfg(unix)]
async fn terminate_process_group(child: &mut AsyncGroupChild, grace: Duration) {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    let pgid = Pid::from_raw(-(pid as i32));

    if let Err(e) = signal::kill(pgid, Signal::SIGTERM)
        && e != Errno::ESRCH
    {
        warn!(pid, error = ?e, "SIGTERM to process group failed");
    }

    let deadline = tokio::time::Instant::now() + grace;
    while tokio::time::Instant::now() < deadline {
        if child.inner().try_wait().ok().flatten().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // The leader may have exited on SIGTERM while members linger.
    if let Err(e) = signal::kill(pgid, Signal::SIGKILL)
        && e != Errno::ESRCH
    {
        warn!(pid, error = ?e, "SIGKILL to process group failed");
    }

    if let Err(e) = child.wait().await {
        debug!(pid, error = %e, "reaping cancelled process failed");
    }
}

#[cfg(not(unix))]
async fn terminate_process_group(child: &mut AsyncGroupChild, _grace: Duration) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill process group on cancellation");
    }
    if let Err(e) = child.wait().await {
        debug!(error = %e, "reaping cancelled process failed");
    }
}
