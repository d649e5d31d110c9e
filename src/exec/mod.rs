// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] defines [`ToolInvocation`] and the [`ProcessLauncher`]
//!   trait the pipeline runs tools through.
//! - [`process`] is the production launcher built on
//!   `tokio::process::Command`.

pub mod backend;
pub mod process;

pub use backend::{InvocationKind, LaunchFuture, ProcessLauncher, ToolExit, ToolInvocation};
pub use process::SystemLauncher;
