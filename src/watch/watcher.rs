// src/watch/watcher.rs

use std::future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::engine::RuntimeEvent;
use crate::fs::FileSystem;
use crate::watch::event_handler::{classify_event, flush_due, ChangeFilter, Debouncer};
use crate::watch::patterns::WatchProfile;

/// Keeps the underlying `RecommendedWatcher` alive. Dropping it stops
/// file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and send one `RuntimeEvent::TasksTriggered`
/// per debounced batch of matching changes.
///
/// - `profiles` are the selected watch targets.
/// - `destinations` are compile outputs (relative to `root`); changes to
///   them never trigger.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profiles: Vec<WatchProfile>,
    destinations: &[String],
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    fs: Arc<dyn FileSystem>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("stylewatch: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("stylewatch: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    let names: Vec<&str> = profiles.iter().map(|p| p.name()).collect();
    info!(root = ?root, targets = ?names, "Waiting...");

    let filter = ChangeFilter::new(root, profiles, destinations, fs);

    tokio::spawn(async move {
        filter.prime_hashes().await;
        let mut debouncer = Debouncer::new();

        loop {
            let deadline = debouncer.next_deadline();
            let sleep = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => future::pending::<()>().await,
                }
            };

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    let Some(event) = maybe_event else {
                        break;
                    };
                    debug!(?event, "received notify event");
                    let now = Instant::now();
                    for (path, kind) in classify_event(&event) {
                        for idx in filter.matching_profiles(&path, kind) {
                            let delay = filter.profiles()[idx].debounce_delay();
                            debouncer.record(idx, now, delay);
                        }
                    }
                }
                _ = sleep => {
                    if !flush_due(&filter, &mut debouncer, Instant::now(), &runtime_tx).await {
                        break;
                    }
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
