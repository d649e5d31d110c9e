// src/pipeline/mod.rs

//! The configure → build → test pipeline.
//!
//! - [`runner`] executes one run under a [`RunScope`].
//! - [`junit`] extracts failed tests from the CTest JUnit result file.
//! - [`report`] renders the status banners shown to the user.
//!
//! [`RunScope`]: crate::engine::RunScope

use std::collections::HashMap;
use std::path::PathBuf;

use crate::types::{ConfigureMode, HookPoint, Stage};

pub mod junit;
pub mod report;
pub mod runner;

pub use junit::FailedTest;
pub use runner::{PipelineRunner, STALE_CONFIGURATION_SIGNATURE};

/// Cross-run state owned by the scheduler and handed to each run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub configure_mode: ConfigureMode,
}

impl RunContext {
    pub fn new(configure_mode: ConfigureMode) -> Self {
        Self { configure_mode }
    }
}

/// User scripts keyed by hook point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookScripts {
    scripts: HashMap<HookPoint, String>,
}

impl HookScripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, point: HookPoint, script: impl Into<String>) {
        self.scripts.insert(point, script.into());
    }

    pub fn get(&self, point: HookPoint) -> Option<&str> {
        self.scripts.get(&point).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// Everything the runner needs to build its tool invocations.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Working directory for every tool and hook.
    pub root: PathBuf,
    pub configure_preset: String,
    pub build_preset: String,
    pub test_preset: String,
    pub jobs: usize,
    /// Passed to `ctest --exclude-regex`.
    pub exclude_tests: Option<String>,
    /// Where ctest writes its JUnit report.
    pub junit_path: PathBuf,
    pub hooks: HookScripts,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// All stages (and their hooks) passed.
    Succeeded,
    /// A rebase was in progress; no stage ran.
    RebaseInProgress,
    /// The build reported a stale build graph; a fresh configure has been
    /// requested.
    StaleConfiguration,
    /// The run's scope was cancelled before it finished.
    Cancelled,
    Failed(StageFailure),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: Stage,
    pub kind: FailureKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// A pre or post hook exited non-zero.
    HookFailed { point: HookPoint, exit_code: i32 },
    /// The stage's tool exited non-zero.
    ToolFailed { exit_code: i32 },
    /// ctest exited non-zero; `failed` lists what the result file reported.
    TestsFailed { exit_code: i32, failed: Vec<FailedTest> },
    /// The tool could not be run at all.
    Error(String),
}
