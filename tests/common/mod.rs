#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::mpsc;

use vroomify::engine::{RunScope, PreemptionController, Scheduler, SchedulerEvent, SchedulerOptions};
use vroomify::fs::mock::MockFileSystem;
use vroomify::pipeline::{PipelineConfig, PipelineRunner, RunContext};
use vroomify::types::ConfigureMode;
use vroomify::watch::PathFilter;
use vroomify_test_utils::fake_launcher::{FakeLauncher, StaticRebaseGuard};

pub const STALE_LINE: &str =
    "ninja: build.cc:NNN: void Builder::Plan...: Assertion `edge && !edge->outputs_ready()' failed.";

pub type TestRunner = PipelineRunner<FakeLauncher, StaticRebaseGuard>;
pub type TestScheduler = Scheduler<FakeLauncher, StaticRebaseGuard>;

/// Shared doubles for one test: launcher, rebase guard, filesystem and the
/// scheduler channel.
pub struct Rig {
    pub launcher: FakeLauncher,
    pub guard: StaticRebaseGuard,
    pub fs: MockFileSystem,
    pub tx: mpsc::Sender<SchedulerEvent>,
    rx: Option<mpsc::Receiver<SchedulerEvent>>,
}

impl Rig {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(64);
        Self {
            launcher: FakeLauncher::new(),
            guard: StaticRebaseGuard::new(false),
            fs: MockFileSystem::new(),
            tx,
            rx: Some(rx),
        }
    }

    pub fn runner(&self, config: PipelineConfig) -> TestRunner {
        PipelineRunner::new(
            config,
            self.launcher.clone(),
            self.guard.clone(),
            Arc::new(self.fs.clone()),
            self.tx.clone(),
        )
    }

    /// Receiver end of the channel; for runner-only tests that inspect
    /// feedback events.
    pub fn take_events(&mut self) -> mpsc::Receiver<SchedulerEvent> {
        self.rx.take().expect("events already taken")
    }

    pub fn scheduler(
        &mut self,
        config: PipelineConfig,
        mode: ConfigureMode,
        options: SchedulerOptions,
    ) -> TestScheduler {
        let triggers = PathFilter::any_of(&["CMakeLists.txt".to_string(), "*.cmake".to_string()])
            .expect("valid trigger patterns");
        let events = self.take_events();
        Scheduler::new(self.runner(config), RunContext::new(mode), triggers, events, options)
    }

    /// Send an event; a scheduler that already exited is ignored.
    pub async fn send(&self, event: SchedulerEvent) {
        let _ = self.tx.send(event).await;
    }

    /// Wait until no launch is in flight, then give the scheduler a moment
    /// to go idle.
    pub async fn settle(&self) {
        while self.launcher.active() > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}

/// A live scope for driving the runner directly.
pub fn scope() -> RunScope {
    PreemptionController::new().arm()
}
