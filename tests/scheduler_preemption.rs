mod common;

use crate::common::{Rig, STALE_LINE};

use vroomify::engine::{SchedulerEvent, SchedulerOptions};
use vroomify::pipeline::RunOutcome;
use vroomify::types::{ConfigureMode, RelativePath, Stage};
use vroomify_test_utils::builders::PipelineConfigBuilder;
use vroomify_test_utils::fake_launcher::{Script, tool};
use vroomify_test_utils::{init_tracing, with_timeout};

const ONCE: SchedulerOptions = SchedulerOptions {
    run_on_startup: true,
    exit_when_idle: true,
};

const WATCH: SchedulerOptions = SchedulerOptions {
    run_on_startup: true,
    exit_when_idle: false,
};

const ON_CHANGE_ONLY: SchedulerOptions = SchedulerOptions {
    run_on_startup: false,
    exit_when_idle: true,
};

fn changed(path: &str) -> SchedulerEvent {
    SchedulerEvent::PathChanged(RelativePath::new(path))
}

#[tokio::test]
async fn startup_run_then_exit_when_idle() {
    init_tracing();
    let mut rig = Rig::new();
    let scheduler = rig.scheduler(PipelineConfigBuilder::new().build(), ConfigureMode::Normal, ONCE);

    let report = with_timeout(scheduler.run()).await.unwrap();

    assert_eq!(report.runs, 1);
    assert_eq!(report.last_outcome, Some(RunOutcome::Succeeded));
    assert_eq!(rig.launcher.invocations().len(), 3);
}

#[tokio::test]
async fn empty_batch_starts_no_run() {
    let mut rig = Rig::new();
    let scheduler =
        rig.scheduler(PipelineConfigBuilder::new().build(), ConfigureMode::None, ON_CHANGE_ONLY);

    let report = with_timeout(scheduler.run()).await.unwrap();

    assert_eq!(report.runs, 0);
    assert_eq!(report.last_outcome, None);
    assert!(rig.launcher.invocations().is_empty());
}

#[tokio::test]
async fn repeated_changes_before_a_flush_start_one_run() {
    let mut rig = Rig::new();
    rig.send(changed("a.cpp")).await;
    rig.send(changed("a.cpp")).await;
    rig.send(changed("A.cpp")).await;
    let scheduler =
        rig.scheduler(PipelineConfigBuilder::new().build(), ConfigureMode::None, ON_CHANGE_ONLY);

    let report = with_timeout(scheduler.run()).await.unwrap();

    assert_eq!(report.runs, 1);
    assert_eq!(rig.launcher.tool_invocations(Stage::Build).len(), 1);
}

#[tokio::test]
async fn cmake_list_change_forces_configure() {
    let mut rig = Rig::new();
    rig.send(changed("CMakeLists.txt")).await;
    let scheduler =
        rig.scheduler(PipelineConfigBuilder::new().build(), ConfigureMode::None, ON_CHANGE_ONLY);

    let report = with_timeout(scheduler.run()).await.unwrap();

    assert_eq!(report.last_outcome, Some(RunOutcome::Succeeded));
    let configure = rig.launcher.tool_invocations(Stage::Configure);
    assert_eq!(configure.len(), 1);
    assert!(!configure[0].args.iter().any(|a| a == "--fresh"));
}

#[tokio::test]
async fn source_change_does_not_configure() {
    let mut rig = Rig::new();
    rig.send(changed("src/main.cpp")).await;
    let scheduler =
        rig.scheduler(PipelineConfigBuilder::new().build(), ConfigureMode::None, ON_CHANGE_ONLY);

    with_timeout(scheduler.run()).await.unwrap();

    assert!(rig.launcher.tool_invocations(Stage::Configure).is_empty());
    assert_eq!(rig.launcher.tool_invocations(Stage::Build).len(), 1);
}

#[tokio::test]
async fn change_during_a_run_cancels_it_and_reruns() {
    init_tracing();
    let mut rig = Rig::new();
    rig.launcher.script_once(tool(Stage::Build), Script::blocking());
    let scheduler = rig.scheduler(PipelineConfigBuilder::new().build(), ConfigureMode::None, ONCE);
    let handle = tokio::spawn(scheduler.run());

    with_timeout(rig.launcher.wait_for_launches(1)).await;
    rig.send(changed("src/a.cpp")).await;

    let report = with_timeout(handle).await.unwrap().unwrap();

    assert_eq!(report.runs, 2);
    assert_eq!(report.last_outcome, Some(RunOutcome::Succeeded));
    assert_eq!(
        rig.launcher.kinds(),
        vec![tool(Stage::Build), tool(Stage::Build), tool(Stage::Test)],
        "the cancelled run must not reach the test stage"
    );
    assert_eq!(rig.launcher.max_concurrent(), 1);
}

#[tokio::test]
async fn burst_of_changes_during_a_run_never_overlaps_runs() {
    let mut rig = Rig::new();
    rig.launcher.script_once(tool(Stage::Build), Script::blocking());
    rig.launcher.script_once(tool(Stage::Build), Script::blocking());
    let scheduler = rig.scheduler(PipelineConfigBuilder::new().build(), ConfigureMode::None, ONCE);
    let handle = tokio::spawn(scheduler.run());

    with_timeout(rig.launcher.wait_for_launches(1)).await;
    for i in 0..10 {
        rig.send(changed(&format!("src/file{i}.cpp"))).await;
    }
    with_timeout(rig.launcher.wait_for_launches(2)).await;
    rig.send(changed("src/late.cpp")).await;

    let report = with_timeout(handle).await.unwrap().unwrap();

    assert_eq!(report.last_outcome, Some(RunOutcome::Succeeded));
    assert!(report.runs >= 3);
    assert_eq!(rig.launcher.max_concurrent(), 1);
    assert_eq!(rig.launcher.active(), 0);
}

#[tokio::test]
async fn fresh_request_survives_a_cancelled_run() {
    let mut rig = Rig::new();
    rig.launcher.script_once(tool(Stage::Configure), Script::blocking());
    let scheduler =
        rig.scheduler(PipelineConfigBuilder::new().build(), ConfigureMode::Normal, ONCE);
    let handle = tokio::spawn(scheduler.run());

    with_timeout(rig.launcher.wait_for_launches(1)).await;
    rig.send(SchedulerEvent::FreshConfigureRequested).await;

    let report = with_timeout(handle).await.unwrap().unwrap();

    assert_eq!(report.runs, 2);
    assert_eq!(report.last_outcome, Some(RunOutcome::Succeeded));
    let configure = rig.launcher.tool_invocations(Stage::Configure);
    assert_eq!(configure.len(), 2);
    assert_eq!(configure[0].command_line(), "cmake --preset dev");
    assert_eq!(configure[1].command_line(), "cmake --preset dev --fresh");
}

#[tokio::test]
async fn stale_build_graph_reruns_with_fresh_configure() {
    init_tracing();
    let mut rig = Rig::new();
    rig.launcher
        .script_once(tool(Stage::Build), Script::exit(1).with_stderr(STALE_LINE));
    let scheduler = rig.scheduler(PipelineConfigBuilder::new().build(), ConfigureMode::None, ONCE);

    let report = with_timeout(scheduler.run()).await.unwrap();

    assert_eq!(report.runs, 2);
    assert_eq!(report.last_outcome, Some(RunOutcome::Succeeded));
    assert_eq!(
        rig.launcher.kinds(),
        vec![
            tool(Stage::Build),
            tool(Stage::Configure),
            tool(Stage::Build),
            tool(Stage::Test),
        ]
    );
    let configure = rig.launcher.tool_invocations(Stage::Configure);
    assert!(configure[0].args.iter().any(|a| a == "--fresh"));
}

#[tokio::test]
async fn failed_configure_is_retried_on_the_next_change() {
    let mut rig = Rig::new();
    rig.launcher.script_once(tool(Stage::Configure), Script::exit(1));
    let scheduler =
        rig.scheduler(PipelineConfigBuilder::new().build(), ConfigureMode::Fresh, WATCH);
    let handle = tokio::spawn(scheduler.run());

    with_timeout(rig.launcher.wait_for_launches(1)).await;
    with_timeout(rig.settle()).await;
    assert_eq!(rig.launcher.kinds(), vec![tool(Stage::Configure)]);

    rig.send(changed("src/main.cpp")).await;
    with_timeout(rig.launcher.wait_for_launches(4)).await;
    with_timeout(rig.settle()).await;
    rig.send(SchedulerEvent::ShutdownRequested).await;

    let report = with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(report.runs, 2);
    assert_eq!(report.last_outcome, Some(RunOutcome::Succeeded));
    let configure = rig.launcher.tool_invocations(Stage::Configure);
    assert_eq!(configure.len(), 2);
    assert!(configure.iter().all(|c| c.args.iter().any(|a| a == "--fresh")));
}

#[tokio::test]
async fn shutdown_cancels_the_active_run() {
    let mut rig = Rig::new();
    rig.launcher.script(tool(Stage::Build), Script::blocking());
    let scheduler = rig.scheduler(PipelineConfigBuilder::new().build(), ConfigureMode::None, WATCH);
    let handle = tokio::spawn(scheduler.run());

    with_timeout(rig.launcher.wait_for_launches(1)).await;
    rig.send(SchedulerEvent::ShutdownRequested).await;

    let report = with_timeout(handle).await.unwrap().unwrap();

    assert_eq!(report.runs, 1);
    assert_eq!(report.last_outcome, Some(RunOutcome::Cancelled));
    assert_eq!(rig.launcher.active(), 0);
}

#[tokio::test]
async fn rebase_skip_does_not_stop_later_batches() {
    let mut rig = Rig::new();
    rig.guard.set(true);
    let scheduler = rig.scheduler(PipelineConfigBuilder::new().build(), ConfigureMode::None, WATCH);
    let handle = tokio::spawn(scheduler.run());

    // Let the startup run observe the rebase and go idle.
    with_timeout(rig.settle()).await;
    assert!(rig.launcher.invocations().is_empty());

    rig.guard.set(false);
    rig.send(changed("src/main.cpp")).await;
    with_timeout(rig.launcher.wait_for_launches(2)).await;
    with_timeout(rig.settle()).await;
    rig.send(SchedulerEvent::ShutdownRequested).await;

    let report = with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(report.runs, 2);
    assert_eq!(report.last_outcome, Some(RunOutcome::Succeeded));
}
