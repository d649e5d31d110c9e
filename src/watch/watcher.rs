// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::engine::SchedulerEvent;
use crate::watch::event_filter::EventFilter;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher that observes the filter's root recursively
/// and sends `SchedulerEvent::PathChanged` for every path the filter keeps.
pub fn spawn_watcher(
    filter: EventFilter,
    scheduler_tx: mpsc::Sender<SchedulerEvent>,
) -> Result<WatcherHandle> {
    let root: PathBuf = filter.root().to_path_buf();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("vroomify: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("vroomify: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            trace!(?event, "received notify event");

            for path in filter.filter_event(&event) {
                debug!(path = %path, "change detected");
                if scheduler_tx
                    .send(SchedulerEvent::PathChanged(path))
                    .await
                    .is_err()
                {
                    debug!("scheduler channel closed; stopping watcher loop");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
