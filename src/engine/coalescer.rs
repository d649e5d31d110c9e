// src/engine/coalescer.rs

use std::collections::HashSet;
use std::mem;

use tracing::debug;

use super::RebuildReason;
use crate::types::RelativePath;

/// Open batch of changes that have arrived since the last flush.
///
/// Semantics:
/// - Paths are deduplicated by value (case-insensitive, see
///   [`RelativePath`]); arrival order is not kept.
/// - A fresh-configure request does not enter the path buffer. It is
///   remembered separately and reported as its own reason on the next flush,
///   ahead of any file changes.
/// - The batch only closes when [`flush`](Self::flush) is called. The
///   scheduler calls it when the previous run has finished, so the
///   coalescing window is "while a run is active" rather than a timer.
#[derive(Debug, Default)]
pub struct ReasonCoalescer {
    paths: HashSet<RelativePath>,
    fresh_configure: bool,
}

impl ReasonCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a changed path to the open batch. Returns false if the batch
    /// already contained it.
    pub fn push_path(&mut self, path: RelativePath) -> bool {
        let inserted = self.paths.insert(path);
        debug!(inserted, pending = self.paths.len(), "path added to open batch");
        inserted
    }

    /// Remember that the next run must reconfigure from scratch.
    pub fn push_fresh_configure(&mut self) {
        if !self.fresh_configure {
            debug!("fresh configure requested for next batch");
        }
        self.fresh_configure = true;
    }

    /// True if flushing now would yield only `RebuildNotRequired`.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && !self.fresh_configure
    }

    /// Close the open batch and classify it.
    ///
    /// The result is never empty: a batch with no control signal and no
    /// paths yields exactly `[RebuildNotRequired]`. A fresh-configure request
    /// always comes first.
    pub fn flush(&mut self) -> Vec<RebuildReason> {
        let mut reasons = Vec::with_capacity(2);

        if mem::take(&mut self.fresh_configure) {
            reasons.push(RebuildReason::FreshConfigureRequired);
        }

        let paths = mem::take(&mut self.paths);
        if !paths.is_empty() {
            reasons.push(RebuildReason::FilesChanged(paths));
        }

        if reasons.is_empty() {
            reasons.push(RebuildReason::RebuildNotRequired);
        }

        debug!(?reasons, "flushed batch");
        reasons
    }
}
