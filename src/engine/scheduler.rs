// src/engine/scheduler.rs

use std::fmt;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::ProcessLauncher;
use crate::pipeline::{report, PipelineRunner, RunContext, RunOutcome};
use crate::types::ConfigureMode;
use crate::vcs::RebaseGuard;
use crate::watch::PathFilter;

use super::{PreemptionController, ReasonCoalescer, RebuildReason, SchedulerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Start one run before any change has been observed.
    pub run_on_startup: bool,
    /// Return once no run is pending instead of waiting for more events.
    pub exit_when_idle: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            run_on_startup: true,
            exit_when_idle: false,
        }
    }
}

/// Summary returned when the scheduler stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub runs: u64,
    pub last_outcome: Option<RunOutcome>,
}

/// What the loop should do after accepting an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Shutdown,
}

/// The single consumer of the [`SchedulerEvent`] channel.
///
/// Runs never overlap: the next batch is flushed only after the previous
/// run's future has completed, and events arriving meanwhile both cancel
/// that run and accumulate in the coalescer.
pub struct Scheduler<L, G> {
    runner: PipelineRunner<L, G>,
    ctx: RunContext,
    coalescer: ReasonCoalescer,
    preemption: PreemptionController,
    events: mpsc::Receiver<SchedulerEvent>,
    configure_triggers: PathFilter,
    options: SchedulerOptions,
    channel_open: bool,
    shutdown: bool,
    report: SchedulerReport,
}

impl<L, G> fmt::Debug for Scheduler<L, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("ctx", &self.ctx)
            .field("options", &self.options)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl<L: ProcessLauncher, G: RebaseGuard> Scheduler<L, G> {
    pub fn new(
        runner: PipelineRunner<L, G>,
        ctx: RunContext,
        configure_triggers: PathFilter,
        events: mpsc::Receiver<SchedulerEvent>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            runner,
            ctx,
            coalescer: ReasonCoalescer::new(),
            preemption: PreemptionController::new(),
            events,
            configure_triggers,
            options,
            channel_open: true,
            shutdown: false,
            report: SchedulerReport::default(),
        }
    }

    /// Main loop.
    ///
    /// - Runs the pipeline whenever a flushed batch requires it.
    /// - While idle, blocks on the next event and flushes as soon as the
    ///   queued burst has been drained.
    /// - Stops on `ShutdownRequested`, on channel close, or (with
    ///   `exit_when_idle`) once nothing is pending.
    pub async fn run(mut self) -> Result<SchedulerReport> {
        info!(options = ?self.options, "vroomify scheduler started");

        let mut pending = self.options.run_on_startup;
        loop {
            if self.shutdown {
                info!("shutdown requested; stopping scheduler");
                break;
            }

            if pending {
                self.execute_run().await;
                self.drain();
                if self.shutdown {
                    continue;
                }
                // A finished run closes the batch, even an empty one.
                pending = self.process_batch();
                continue;
            }

            self.drain();
            if self.shutdown {
                continue;
            }
            if !self.coalescer.is_empty() {
                pending = self.process_batch();
                continue;
            }

            if self.options.exit_when_idle {
                info!("no run pending; exiting");
                break;
            }
            if !self.channel_open {
                info!("scheduler channel closed; exiting");
                break;
            }

            match self.events.recv().await {
                Some(event) => {
                    if accept(&mut self.coalescer, &self.preemption, event) == Flow::Shutdown {
                        self.shutdown = true;
                    }
                }
                None => self.channel_open = false,
            }
        }

        if let Some(scope) = self.preemption.current() {
            scope.cancel();
        }
        Ok(self.report)
    }

    /// Run the pipeline once under a freshly armed scope, accepting events
    /// concurrently so they can cancel it.
    async fn execute_run(&mut self) {
        let scope = self.preemption.arm();
        let run_id = scope.id();
        self.report.runs += 1;
        info!(run_id, configure = ?self.ctx.configure_mode, "starting pipeline run");

        let outcome = {
            let run = self.runner.run(&mut self.ctx, &scope);
            tokio::pin!(run);

            loop {
                if !self.channel_open {
                    break run.await;
                }

                tokio::select! {
                    outcome = &mut run => break outcome,
                    event = self.events.recv() => match event {
                        Some(event) => {
                            if accept(&mut self.coalescer, &self.preemption, event) == Flow::Shutdown {
                                self.shutdown = true;
                            }
                        }
                        None => {
                            debug!(run_id, "scheduler channel closed during run");
                            self.channel_open = false;
                        }
                    },
                }
            }
        };

        self.preemption.retire(&scope);
        match &outcome {
            RunOutcome::Cancelled => debug!(run_id, "run cancelled"),
            other => info!(run_id, outcome = ?other, "run finished"),
        }
        report::print_outcome(&outcome);
        self.report.last_outcome = Some(outcome);
    }

    /// Accept everything already queued without blocking.
    fn drain(&mut self) {
        while self.channel_open {
            match self.events.try_recv() {
                Ok(event) => {
                    if accept(&mut self.coalescer, &self.preemption, event) == Flow::Shutdown {
                        self.shutdown = true;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.channel_open = false,
            }
        }
    }

    /// Flush the open batch and apply each reason to the run context.
    /// Returns true if a run must start.
    fn process_batch(&mut self) -> bool {
        let mut run = false;

        for reason in self.coalescer.flush() {
            match &reason {
                RebuildReason::FreshConfigureRequired => {
                    info!("next run will configure from scratch");
                    self.ctx.configure_mode = self.ctx.configure_mode.escalate(ConfigureMode::Fresh);
                }
                RebuildReason::FilesChanged(paths) => {
                    let trigger = paths
                        .iter()
                        .find(|p| self.configure_triggers.is_included(p));
                    if let Some(path) = trigger {
                        debug!(path = %path, "configure trigger changed");
                        self.ctx.configure_mode =
                            self.ctx.configure_mode.escalate(ConfigureMode::Normal);
                    }
                    info!(paths = paths.len(), "files changed");
                }
                RebuildReason::RebuildNotRequired => {
                    debug!("batch empty; no run required");
                }
            }
            run |= reason.requires_run();
        }

        run
    }
}

/// Record one event. Any event cancels the active run first so an
/// in-flight stage sees it before the batch closes.
fn accept(
    coalescer: &mut ReasonCoalescer,
    preemption: &PreemptionController,
    event: SchedulerEvent,
) -> Flow {
    if preemption.cancel_current() {
        debug!(?event, "event preempted active run");
    }

    match event {
        SchedulerEvent::PathChanged(path) => {
            coalescer.push_path(path);
            Flow::Continue
        }
        SchedulerEvent::FreshConfigureRequested => {
            coalescer.push_fresh_configure();
            Flow::Continue
        }
        SchedulerEvent::ShutdownRequested => Flow::Shutdown,
    }
}
