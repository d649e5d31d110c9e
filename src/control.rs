// src/control.rs

//! Control signals from the user: stdin commands and Ctrl-C.
//!
//! Both feed the scheduler channel like any other producer.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::SchedulerEvent;

/// Map one line typed on stdin to a scheduler event.
///
/// - `f` / `fresh`: reconfigure from scratch on the next run
/// - `q` / `quit`: stop the scheduler
///
/// Blank lines and unknown commands yield `None`.
pub fn parse_command(line: &str) -> Option<SchedulerEvent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "f" | "fresh" => Some(SchedulerEvent::FreshConfigureRequested),
        "q" | "quit" => Some(SchedulerEvent::ShutdownRequested),
        _ => None,
    }
}

/// Read commands from stdin until EOF or until the scheduler goes away.
pub fn spawn_stdin_commands(tx: mpsc::Sender<SchedulerEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("stdin closed; no more interactive commands");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read stdin; interactive commands disabled");
                    return;
                }
            };

            let Some(event) = parse_command(&line) else {
                if !line.trim().is_empty() {
                    info!(command = line.trim(), "unknown command (use 'f' for fresh, 'q' to quit)");
                }
                continue;
            };

            debug!(?event, "interactive command");
            if !forward(&tx, event).await {
                return;
            }
        }
    })
}

/// Ctrl-C → graceful shutdown.
pub fn spawn_ctrl_c(tx: mpsc::Sender<SchedulerEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        info!("Ctrl+C received; shutting down");
        forward(&tx, SchedulerEvent::ShutdownRequested).await;
    })
}

/// Send `event` to the scheduler. Returns false once the channel is closed.
async fn forward(tx: &mpsc::Sender<SchedulerEvent>, event: SchedulerEvent) -> bool {
    match tx.send(event).await {
        Ok(()) => true,
        Err(e) => {
            debug!(event = ?e.0, "scheduler channel closed; event dropped");
            false
        }
    }
}
