// src/engine/preemption.rs

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cancellation lifetime of one pipeline run.
///
/// Clones share the same token, so a clone handed to the pipeline observes a
/// cancel requested through the controller.
#[derive(Debug, Clone)]
pub struct RunScope {
    id: u64,
    token: CancellationToken,
}

impl RunScope {
    fn new(id: u64) -> Self {
        Self {
            id,
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the scope is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Owns the current [`RunScope`].
///
/// At most one scope is current. Arming a new scope cancels the previous
/// one if it is still current; retiring clears it once its run is over.
#[derive(Debug, Default)]
pub struct PreemptionController {
    next_id: u64,
    current: Option<RunScope>,
}

impl PreemptionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the scope for the next run and make it current.
    pub fn arm(&mut self) -> RunScope {
        if let Some(previous) = self.current.take() {
            debug!(scope = previous.id, "superseding previous run scope");
            previous.cancel();
        }

        self.next_id += 1;
        let scope = RunScope::new(self.next_id);
        debug!(scope = scope.id, "armed run scope");
        self.current = Some(scope.clone());
        scope
    }

    pub fn current(&self) -> Option<&RunScope> {
        self.current.as_ref()
    }

    /// True while an armed scope has not yet been retired.
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Request cancellation of the current scope, if any. Returns true if a
    /// live scope was cancelled by this call.
    pub fn cancel_current(&self) -> bool {
        match &self.current {
            Some(scope) if !scope.is_cancelled() => {
                debug!(scope = scope.id, "cancelling current run scope");
                scope.cancel();
                true
            }
            _ => false,
        }
    }

    /// Mark the run governed by `scope` as finished.
    ///
    /// Retiring a scope that has already been superseded is a no-op.
    pub fn retire(&mut self, scope: &RunScope) {
        if self.current.as_ref().map(RunScope::id) == Some(scope.id) {
            debug!(scope = scope.id, cancelled = scope.is_cancelled(), "retired run scope");
            self.current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_reaches_clones_of_the_current_scope() {
        let mut ctl = PreemptionController::new();
        let scope = ctl.arm();
        assert!(!scope.is_cancelled());

        assert!(ctl.cancel_current());
        assert!(scope.is_cancelled());
        assert!(!ctl.cancel_current(), "second cancel reports nothing new");
    }

    #[test]
    fn arming_supersedes_and_cancels_the_old_scope_only() {
        let mut ctl = PreemptionController::new();
        let first = ctl.arm();
        let second = ctl.arm();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(ctl.current().map(RunScope::id), Some(second.id()));
    }

    #[test]
    fn retire_clears_only_the_matching_scope() {
        let mut ctl = PreemptionController::new();
        let first = ctl.arm();
        let second = ctl.arm();

        ctl.retire(&first);
        assert!(ctl.is_active());

        ctl.retire(&second);
        assert!(!ctl.is_active());
        assert!(!ctl.cancel_current());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_cancel() {
        let mut ctl = PreemptionController::new();
        let scope = ctl.arm();
        let waiter = {
            let scope = scope.clone();
            tokio::spawn(async move { scope.cancelled().await })
        };

        ctl.cancel_current();
        waiter.await.unwrap();
        assert!(scope.is_cancelled());
    }
}
