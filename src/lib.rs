// src/lib.rs

pub mod cli;
pub mod config;
pub mod control;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod types;
pub mod vcs;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_settings, Settings};
use crate::engine::{Scheduler, SchedulerEvent, SchedulerOptions, SchedulerReport};
use crate::exec::SystemLauncher;
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::{PipelineRunner, RunContext};
use crate::vcs::GitRebaseGuard;
use crate::watch::{EventFilter, PathFilter};

const SCHEDULER_CHANNEL_CAPACITY: usize = 256;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings (config file + CLI)
/// - the git rebase guard (fatal if no repository is found)
/// - pipeline runner and scheduler
/// - (optional) file watcher
/// - stdin commands and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<SchedulerReport> {
    let settings = load_settings(&args)?;

    if args.dry_run {
        print_dry_run(&settings);
        return Ok(SchedulerReport::default());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let rebase_guard = GitRebaseGuard::discover(&settings.root, fs.clone()).await?;

    let (tx, rx) = mpsc::channel::<SchedulerEvent>(SCHEDULER_CHANNEL_CAPACITY);

    let runner = PipelineRunner::new(
        settings.pipeline_config(),
        SystemLauncher::new(),
        rebase_guard,
        fs,
        tx.clone(),
    );

    // File watcher (disabled in --once mode).
    let _watcher_handle = if !args.once {
        let filter = PathFilter::new(&settings.include, &settings.exclude)?;
        Some(crate::watch::spawn_watcher(
            EventFilter::new(&settings.root, filter),
            tx.clone(),
        )?)
    } else {
        None
    };

    if !args.once && !args.no_interactive {
        control::spawn_stdin_commands(tx.clone());
    }
    control::spawn_ctrl_c(tx.clone());
    drop(tx);

    let options = SchedulerOptions {
        run_on_startup: true,
        exit_when_idle: args.once,
    };
    let configure_triggers = PathFilter::any_of(&settings.configure_triggers)?;

    info!(root = %settings.root.display(), "watching project");
    let scheduler = Scheduler::new(
        runner,
        RunContext::new(settings.initial_configure),
        configure_triggers,
        rx,
        options,
    );
    Ok(scheduler.run().await?)
}

/// Print the effective settings without running anything.
fn print_dry_run(settings: &Settings) {
    println!("vroomify dry-run");
    println!("  root = {}", settings.root.display());
    println!("  presets.configure = {}", settings.configure_preset);
    println!("  presets.build = {}", settings.build_preset);
    println!("  presets.test = {}", settings.test_preset);
    println!("  build.jobs = {}", settings.jobs);
    if let Some(ref pattern) = settings.exclude_tests {
        println!("  test.exclude = {pattern}");
    }
    println!("  test.junit_path = {}", settings.junit_path.display());
    println!("  initial configure = {:?}", settings.initial_configure);
    println!();

    println!("watch:");
    println!("  include: {:?}", settings.include);
    println!("  exclude: {:?}", settings.exclude);
    println!("  configure_triggers: {:?}", settings.configure_triggers);

    let stages = [types::Stage::Configure, types::Stage::Build, types::Stage::Test];
    let hooks: Vec<_> = stages
        .iter()
        .flat_map(|s| [s.pre_hook(), s.post_hook()])
        .filter_map(|point| settings.hooks.get(point).map(|script| (point, script)))
        .collect();
    if !hooks.is_empty() {
        println!();
        println!("hooks:");
        for (point, script) in hooks {
            println!("  - {point}: {script}");
        }
    }

    debug!("dry-run complete (no execution)");
}
