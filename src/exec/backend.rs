// src/exec/backend.rs

//! Pluggable process launcher abstraction.
//!
//! The pipeline talks to a `ProcessLauncher` instead of spawning processes
//! itself. Production code uses [`SystemLauncher`]; tests provide a launcher
//! that scripts exit codes and stderr lines without running anything.
//!
//! [`SystemLauncher`]: super::process::SystemLauncher

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use anyhow::Result;

use crate::engine::RunScope;
use crate::types::{HookPoint, Stage};

/// What a launched process is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationKind {
    Tool(Stage),
    Hook(HookPoint),
}

impl fmt::Display for InvocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationKind::Tool(stage) => write!(f, "{stage}"),
            InvocationKind::Hook(point) => write!(f, "{point} hook"),
        }
    }
}

/// A single external process invocation: program, arguments and working
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub kind: InvocationKind,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl ToolInvocation {
    pub fn new(kind: InvocationKind, program: impl Into<String>, cwd: impl AsRef<Path>) -> Self {
        Self {
            kind,
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    /// Run `script` through the platform shell.
    pub fn shell_script(kind: InvocationKind, script: &str, cwd: impl AsRef<Path>) -> Self {
        if cfg!(windows) {
            Self::new(kind, "cmd", cwd).arg("/C").arg(script)
        } else {
            Self::new(kind, "sh", cwd).arg("-c").arg(script)
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Program and arguments joined for display.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// How a launched process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolExit {
    /// The process exited on its own with this code (`-1` if it was killed
    /// by a signal).
    Exited(i32),
    /// The run scope was cancelled and the process was stopped.
    Cancelled,
}

pub type LaunchFuture<'a> = Pin<Box<dyn Future<Output = Result<ToolExit>> + Send + 'a>>;

/// Trait abstracting how external tools are run.
pub trait ProcessLauncher: Send + Sync {
    /// Run `invocation` to completion, or until `scope` is cancelled.
    ///
    /// Each line the process writes to stderr is handed to `on_stderr`, in
    /// order, before the future resolves. The callback may cancel `scope`.
    fn launch<'a>(
        &'a self,
        invocation: &'a ToolInvocation,
        scope: &'a RunScope,
        on_stderr: &'a mut (dyn FnMut(&str) + Send),
    ) -> LaunchFuture<'a>;
}
