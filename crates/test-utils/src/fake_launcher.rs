use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vroomify::engine::RunScope;
use vroomify::exec::{InvocationKind, LaunchFuture, ProcessLauncher, ToolExit, ToolInvocation};
use vroomify::fs::mock::MockFileSystem;
use vroomify::types::{HookPoint, Stage};
use vroomify::vcs::RebaseGuard;

/// Scripted behaviour for one launch.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub exit_code: i32,
    pub stderr: Vec<String>,
    /// Park the launch until its scope is cancelled.
    pub block_until_cancelled: bool,
    /// File the "process" writes before exiting, e.g. a JUnit report.
    pub writes: Option<(MockFileSystem, PathBuf, String)>,
}

impl Script {
    pub fn exit(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Self::default()
        }
    }

    pub fn blocking() -> Self {
        Self {
            block_until_cancelled: true,
            ..Self::default()
        }
    }

    pub fn with_stderr(mut self, line: &str) -> Self {
        self.stderr.push(line.to_string());
        self
    }

    pub fn writing(mut self, fs: &MockFileSystem, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.writes = Some((fs.clone(), path.into(), contents.to_string()));
        self
    }
}

#[derive(Debug, Default)]
struct State {
    /// Consumed first, one entry per launch.
    once: HashMap<InvocationKind, VecDeque<Script>>,
    /// Used once the queue for a kind is empty.
    always: HashMap<InvocationKind, Script>,
    invocations: Vec<ToolInvocation>,
    active: usize,
    max_active: usize,
}

impl State {
    fn next_script(&mut self, kind: InvocationKind) -> Script {
        if let Some(script) = self.once.get_mut(&kind).and_then(VecDeque::pop_front) {
            return script;
        }
        self.always.get(&kind).cloned().unwrap_or_default()
    }
}

/// A fake launcher that:
/// - records every invocation (clones share the record)
/// - replays scripted stderr lines and exit codes per [`InvocationKind`]
/// - exits 0 for anything unscripted
/// - behaves like the real launcher on cancellation: a cancelled scope ends
///   the launch with `ToolExit::Cancelled`.
#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    state: Arc<Mutex<State>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behaviour for every launch of `kind`.
    pub fn script(&self, kind: InvocationKind, script: Script) -> &Self {
        self.state.lock().unwrap().always.insert(kind, script);
        self
    }

    /// Behaviour for the next launch of `kind` only.
    pub fn script_once(&self, kind: InvocationKind, script: Script) -> &Self {
        self.state
            .lock()
            .unwrap()
            .once
            .entry(kind)
            .or_default()
            .push_back(script);
        self
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.state.lock().unwrap().invocations.clone()
    }

    pub fn kinds(&self) -> Vec<InvocationKind> {
        self.invocations().into_iter().map(|i| i.kind).collect()
    }

    /// Invocations of the given stage's tool, in launch order.
    pub fn tool_invocations(&self, stage: Stage) -> Vec<ToolInvocation> {
        self.invocations()
            .into_iter()
            .filter(|i| i.kind == InvocationKind::Tool(stage))
            .collect()
    }

    pub fn max_concurrent(&self) -> usize {
        self.state.lock().unwrap().max_active
    }

    pub fn active(&self) -> usize {
        self.state.lock().unwrap().active
    }

    /// Wait until at least `n` launches have started.
    pub async fn wait_for_launches(&self, n: usize) {
        while self.invocations().len() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch<'a>(
        &'a self,
        invocation: &'a ToolInvocation,
        scope: &'a RunScope,
        on_stderr: &'a mut (dyn FnMut(&str) + Send),
    ) -> LaunchFuture<'a> {
        Box::pin(async move {
            let script = {
                let mut state = self.state.lock().unwrap();
                state.invocations.push(invocation.clone());
                state.active += 1;
                state.max_active = state.max_active.max(state.active);
                state.next_script(invocation.kind)
            };

            let exit = run_script(&script, scope, on_stderr).await;

            self.state.lock().unwrap().active -= 1;
            Ok(exit)
        })
    }
}

async fn run_script(
    script: &Script,
    scope: &RunScope,
    on_stderr: &mut (dyn FnMut(&str) + Send),
) -> ToolExit {
    for line in &script.stderr {
        if scope.is_cancelled() {
            return ToolExit::Cancelled;
        }
        on_stderr(line);
    }
    // Give the scheduler a chance to deliver events mid-launch.
    tokio::task::yield_now().await;

    if script.block_until_cancelled {
        scope.cancelled().await;
        return ToolExit::Cancelled;
    }
    if scope.is_cancelled() {
        return ToolExit::Cancelled;
    }
    if let Some((fs, path, contents)) = &script.writes {
        fs.add_file(path, contents.clone());
    }
    ToolExit::Exited(script.exit_code)
}

/// Shorthand for `InvocationKind::Tool(stage)`.
pub fn tool(stage: Stage) -> InvocationKind {
    InvocationKind::Tool(stage)
}

/// Shorthand for `InvocationKind::Hook(point)`.
pub fn hook(point: HookPoint) -> InvocationKind {
    InvocationKind::Hook(point)
}

/// Rebase guard whose answer can be flipped from the test.
#[derive(Debug, Clone, Default)]
pub struct StaticRebaseGuard {
    in_progress: Arc<AtomicBool>,
}

impl StaticRebaseGuard {
    pub fn new(in_progress: bool) -> Self {
        Self {
            in_progress: Arc::new(AtomicBool::new(in_progress)),
        }
    }

    pub fn set(&self, in_progress: bool) {
        self.in_progress.store(in_progress, Ordering::SeqCst);
    }
}

impl RebaseGuard for StaticRebaseGuard {
    fn rebase_in_progress(&self) -> anyhow::Result<bool> {
        Ok(self.in_progress.load(Ordering::SeqCst))
    }
}
