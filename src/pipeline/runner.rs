// src/pipeline/runner.rs

//! Executes one configure → build → test run.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{junit, report};
use super::{FailedTest, FailureKind, PipelineConfig, RunContext, RunOutcome, StageFailure};
use crate::engine::{RunScope, SchedulerEvent};
use crate::exec::{InvocationKind, ProcessLauncher, ToolExit, ToolInvocation};
use crate::fs::FileSystem;
use crate::types::{ConfigureMode, HookPoint, Stage};
use crate::vcs::RebaseGuard;

/// Line ninja prints on stderr when its build graph no longer matches the
/// generated build files. Only a fresh configure recovers from it.
pub const STALE_CONFIGURATION_SIGNATURE: &str = "edge && !edge->outputs_ready()";

/// Result of one stage or one sub-step of a stage.
#[derive(Debug)]
enum StageResult {
    Passed,
    Cancelled,
    StaleConfiguration,
    Failed(FailureKind),
}

impl StageResult {
    fn passed(&self) -> bool {
        matches!(self, StageResult::Passed)
    }

    fn into_outcome(self, stage: Stage) -> Option<RunOutcome> {
        match self {
            StageResult::Passed => None,
            StageResult::Cancelled => Some(RunOutcome::Cancelled),
            StageResult::StaleConfiguration => Some(RunOutcome::StaleConfiguration),
            StageResult::Failed(kind) => Some(RunOutcome::Failed(StageFailure { stage, kind })),
        }
    }
}

/// Runs the pipeline stages through a [`ProcessLauncher`].
///
/// Stale-configuration feedback is sent back into the scheduler channel as
/// `SchedulerEvent::FreshConfigureRequested`.
pub struct PipelineRunner<L, G> {
    config: PipelineConfig,
    launcher: L,
    rebase_guard: G,
    fs: Arc<dyn FileSystem>,
    feedback: mpsc::Sender<SchedulerEvent>,
}

impl<L, G> fmt::Debug for PipelineRunner<L, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<L: ProcessLauncher, G: RebaseGuard> PipelineRunner<L, G> {
    pub fn new(
        config: PipelineConfig,
        launcher: L,
        rebase_guard: G,
        fs: Arc<dyn FileSystem>,
        feedback: mpsc::Sender<SchedulerEvent>,
    ) -> Self {
        Self {
            config,
            launcher,
            rebase_guard,
            fs,
            feedback,
        }
    }

    /// Execute one run under `scope`.
    ///
    /// `ctx.configure_mode` is reset to `None` once the configure tool itself
    /// exits 0, even if the post-configure hook then fails.
    pub async fn run(&self, ctx: &mut RunContext, scope: &RunScope) -> RunOutcome {
        let run_id = scope.id();

        match self.rebase_guard.rebase_in_progress() {
            Ok(true) => {
                warn!(run_id, "rebase in progress; skipping run");
                return RunOutcome::RebaseInProgress;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(run_id, error = %e, "could not determine rebase state; running anyway")
            }
        }

        if ctx.configure_mode != ConfigureMode::None {
            let result = self.configure(ctx, scope).await;
            if let Some(outcome) = result.into_outcome(Stage::Configure) {
                return outcome;
            }
        } else {
            debug!(run_id, "configure not required; skipping");
        }

        if let Some(outcome) = self.build(scope).await.into_outcome(Stage::Build) {
            return outcome;
        }

        if let Some(outcome) = self.test(scope).await.into_outcome(Stage::Test) {
            return outcome;
        }

        info!(run_id, "pipeline succeeded");
        RunOutcome::Succeeded
    }

    async fn configure(&self, ctx: &mut RunContext, scope: &RunScope) -> StageResult {
        if scope.is_cancelled() {
            return StageResult::Cancelled;
        }
        report::print_stage_start(Stage::Configure);

        let pre = self.run_hook(HookPoint::PreConfigure, scope).await;
        if !pre.passed() {
            return pre;
        }

        let mut invocation = self
            .tool(Stage::Configure, "cmake")
            .arg("--preset")
            .arg(&self.config.configure_preset);
        if ctx.configure_mode.is_fresh() {
            invocation = invocation.arg("--fresh");
        }

        let result = self.run_tool(&invocation, scope, &mut forward_stderr).await;
        if !result.passed() {
            return result;
        }
        ctx.configure_mode = ConfigureMode::None;

        self.run_hook(HookPoint::PostConfigure, scope).await
    }

    async fn build(&self, scope: &RunScope) -> StageResult {
        if scope.is_cancelled() {
            return StageResult::Cancelled;
        }
        report::print_stage_start(Stage::Build);

        let pre = self.run_hook(HookPoint::PreBuild, scope).await;
        if !pre.passed() {
            return pre;
        }

        let invocation = self
            .tool(Stage::Build, "cmake")
            .arg("--build")
            .arg("--preset")
            .arg(&self.config.build_preset)
            .arg("-j")
            .arg(self.config.jobs.to_string());

        let mut stale = false;
        let mut scan = |line: &str| {
            if line.contains(STALE_CONFIGURATION_SIGNATURE) {
                if !stale {
                    stale = true;
                    scope.cancel();
                }
            } else {
                eprintln!("{line}");
            }
        };

        let result = self.run_tool(&invocation, scope, &mut scan).await;

        if stale {
            warn!(run_id = scope.id(), "build graph is stale; requesting fresh configure");
            if self
                .feedback
                .send(SchedulerEvent::FreshConfigureRequested)
                .await
                .is_err()
            {
                debug!("scheduler channel closed; fresh configure request dropped");
            }
            return StageResult::StaleConfiguration;
        }
        if !result.passed() {
            return result;
        }

        self.run_hook(HookPoint::PostBuild, scope).await
    }

    async fn test(&self, scope: &RunScope) -> StageResult {
        if scope.is_cancelled() {
            return StageResult::Cancelled;
        }
        report::print_stage_start(Stage::Test);

        let pre = self.run_hook(HookPoint::PreTest, scope).await;
        if !pre.passed() {
            return pre;
        }

        let junit_path = &self.config.junit_path;
        if let Err(e) = self.fs.remove_file(junit_path) {
            debug!(error = %e, "could not remove previous test results");
        }

        let mut invocation = self
            .tool(Stage::Test, "ctest")
            .arg("--preset")
            .arg(&self.config.test_preset)
            .arg("--parallel")
            .arg("--progress")
            .arg("--output-junit")
            .arg(junit_path.to_string_lossy());
        if let Some(pattern) = &self.config.exclude_tests {
            invocation = invocation.arg("--exclude-regex").arg(pattern);
        }

        match self.run_tool(&invocation, scope, &mut forward_stderr).await {
            StageResult::Passed => self.run_hook(HookPoint::PostTest, scope).await,
            StageResult::Failed(FailureKind::ToolFailed { exit_code }) => {
                StageResult::Failed(FailureKind::TestsFailed {
                    exit_code,
                    failed: self.read_failed_tests(),
                })
            }
            other => other,
        }
    }

    fn read_failed_tests(&self) -> Vec<FailedTest> {
        let parsed = self
            .fs
            .read_to_string(&self.config.junit_path)
            .and_then(|xml| junit::failed_tests(&xml));

        match parsed {
            Ok(failed) => {
                info!(failed = failed.len(), "parsed test results");
                failed
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "could not read test results");
                Vec::new()
            }
        }
    }

    async fn run_hook(&self, point: HookPoint, scope: &RunScope) -> StageResult {
        let Some(script) = self.config.hooks.get(point) else {
            return StageResult::Passed;
        };

        let invocation =
            ToolInvocation::shell_script(InvocationKind::Hook(point), script, &self.config.root);

        match self.run_tool(&invocation, scope, &mut forward_stderr).await {
            StageResult::Failed(FailureKind::ToolFailed { exit_code }) => {
                StageResult::Failed(FailureKind::HookFailed { point, exit_code })
            }
            other => other,
        }
    }

    /// Launch one process unless the scope has already been cancelled.
    async fn run_tool(
        &self,
        invocation: &ToolInvocation,
        scope: &RunScope,
        on_stderr: &mut (dyn FnMut(&str) + Send),
    ) -> StageResult {
        if scope.is_cancelled() {
            debug!(run_id = scope.id(), kind = %invocation.kind, "scope cancelled; not starting");
            return StageResult::Cancelled;
        }

        match self.launcher.launch(invocation, scope, on_stderr).await {
            Ok(ToolExit::Cancelled) => StageResult::Cancelled,
            Ok(ToolExit::Exited(0)) => StageResult::Passed,
            Ok(ToolExit::Exited(exit_code)) => {
                warn!(run_id = scope.id(), kind = %invocation.kind, exit_code, "process failed");
                StageResult::Failed(FailureKind::ToolFailed { exit_code })
            }
            Err(e) => {
                warn!(run_id = scope.id(), kind = %invocation.kind, error = %format!("{e:#}"), "process could not run");
                StageResult::Failed(FailureKind::Error(format!("{e:#}")))
            }
        }
    }

    fn tool(&self, stage: Stage, program: &str) -> ToolInvocation {
        ToolInvocation::new(InvocationKind::Tool(stage), program, &self.config.root)
    }
}

fn forward_stderr(line: &str) {
    eprintln!("{line}");
}
