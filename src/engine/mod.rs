// src/engine/mod.rs

//! Scheduling engine for vroomify.
//!
//! This module ties together:
//! - the reason coalescer (bursts of changes become one batch)
//! - the preemption controller (one cancellable scope per pipeline run)
//! - the scheduler loop that reacts to:
//!   - file-watch changes
//!   - fresh-configure requests (from the build stage or the user)
//!   - shutdown signals
//!
//! Every producer feeds the same [`SchedulerEvent`] channel; the scheduler is
//! its only consumer.

use std::collections::HashSet;

use crate::types::RelativePath;

/// Messages flowing into the scheduler from watchers, the pipeline and the
/// user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A watched path matching the include patterns changed.
    PathChanged(RelativePath),
    /// The next run must reconfigure from scratch.
    FreshConfigureRequested,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Classification of one flushed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
    /// Non-empty set of distinct changed paths.
    FilesChanged(HashSet<RelativePath>),
    /// A stale build graph was detected or a fresh configure was requested.
    FreshConfigureRequired,
    /// Nothing happened since the last flush.
    RebuildNotRequired,
}

impl RebuildReason {
    pub fn requires_run(&self) -> bool {
        match self {
            RebuildReason::FilesChanged(_) | RebuildReason::FreshConfigureRequired => true,
            RebuildReason::RebuildNotRequired => false,
        }
    }
}

pub mod coalescer;
pub mod preemption;
pub mod scheduler;

pub use coalescer::ReasonCoalescer;
pub use preemption::{PreemptionController, RunScope};
pub use scheduler::{Scheduler, SchedulerOptions, SchedulerReport};
