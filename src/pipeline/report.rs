// src/pipeline/report.rs

//! Status banners written to stdout.

use std::fmt::Write as _;

use super::{FailureKind, RunOutcome, StageFailure};
use crate::types::Stage;

const MIN_WIDTH: usize = 80;

/// A three-line `#` banner around `text`.
pub fn banner(text: &str) -> String {
    let width = MIN_WIDTH.max(text.len() + 12);
    let rule = "#".repeat(width);
    let mut title = format!("#####  {text}  ");
    if title.len() < width {
        title.push_str(&"#".repeat(width - title.len()));
    }
    format!("{rule}\n{title}\n{rule}\n")
}

pub fn stage_title(stage: Stage) -> &'static str {
    match stage {
        Stage::Configure => "Configuring",
        Stage::Build => "Building",
        Stage::Test => "Testing",
    }
}

/// Render the report for a finished run.
///
/// Cancelled runs are silent and render nothing.
pub fn render_outcome(outcome: &RunOutcome) -> Option<String> {
    match outcome {
        RunOutcome::Cancelled => None,
        RunOutcome::Succeeded => Some(banner("SUCCESS")),
        RunOutcome::RebaseInProgress => Some(banner("SKIPPED: rebase in progress")),
        RunOutcome::StaleConfiguration => {
            Some(banner("BUILD FAILED: fresh configuration required"))
        }
        RunOutcome::Failed(failure) => Some(render_failure(failure)),
    }
}

fn render_failure(failure: &StageFailure) -> String {
    let stage = failure.stage.label().to_uppercase();
    match &failure.kind {
        FailureKind::HookFailed { point, exit_code } => banner(&format!(
            "{stage} FAILED: {point} hook exited with {exit_code}"
        )),
        FailureKind::ToolFailed { .. } => banner(&format!("{stage} FAILED")),
        FailureKind::Error(message) => banner(&format!("{stage} FAILED: {message}")),
        FailureKind::TestsFailed { failed, .. } => {
            let mut out = banner("TESTS FAILED");
            for test in failed {
                let heading = format!("### {}", test.name);
                let _ = writeln!(out, "{}", "#".repeat(heading.len()));
                let _ = writeln!(out, "{heading}");
                let _ = writeln!(out);
                if let Some(output) = &test.output {
                    let _ = writeln!(out, "{output}");
                }
                let _ = writeln!(out);
            }
            out
        }
    }
}

pub fn print_stage_start(stage: Stage) {
    println!("{}", banner(stage_title(stage)));
}

pub fn print_outcome(outcome: &RunOutcome) {
    if let Some(report) = render_outcome(outcome) {
        println!("{report}");
    }
}
