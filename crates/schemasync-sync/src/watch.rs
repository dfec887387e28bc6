//! Polling file watcher.
//!
//! Scans the watched roots at a fixed interval and compares file metadata
//! against the previous scan. Events are sent over an mpsc channel whose
//! only consumer is the sync loop.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::MIN_POLL_INTERVAL;
use crate::fs::{Filesystem, LocalFilesystem};

/// Capacity of the event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Kind of file change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    /// A file appeared.
    Add,
    /// A file's content changed.
    Change,
    /// A file was removed.
    Unlink,
}

impl WatchEventKind {
    /// Event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchEventKind::Add => "add",
            WatchEventKind::Change => "change",
            WatchEventKind::Unlink => "unlink",
        }
    }
}

impl std::fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// What happened.
    pub kind: WatchEventKind,
    /// File affected.
    pub path: PathBuf,
}

impl WatchEvent {
    /// Create an event.
    pub fn new(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

type Snapshot = HashMap<PathBuf, FileStamp>;

/// Spawns polling watch tasks.
pub struct PollingWatcher;

impl PollingWatcher {
    /// Start watching `roots`, polling every `interval`.
    ///
    /// The first scan establishes a baseline and emits nothing. Intervals
    /// below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn spawn(roots: Vec<PathBuf>, interval: Duration) -> (WatchHandle, mpsc::Receiver<WatchEvent>) {
        let interval = interval.max(MIN_POLL_INTERVAL);
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_flag_clone = stop_flag.clone();

        let handle = tokio::spawn(async move {
            tracing::debug!(
                roots = roots.len(),
                interval_ms = interval.as_millis() as u64,
                "file watcher started"
            );

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            let mut previous = scan(&roots).await;

            loop {
                ticker.tick().await;

                if stop_flag_clone.load(Ordering::SeqCst) || tx.is_closed() {
                    break;
                }

                let current = scan(&roots).await;
                for event in changes(&previous, &current) {
                    tracing::trace!(kind = %event.kind, path = %event.path.display(), "file event");
                    if tx.send(event).await.is_err() {
                        tracing::debug!("file watcher receiver dropped");
                        return;
                    }
                }
                previous = current;
            }

            tracing::debug!("file watcher stopped");
        });

        (WatchHandle { handle, stop_flag }, rx)
    }
}

/// Handle for a running watcher.
pub struct WatchHandle {
    handle: JoinHandle<()>,
    stop_flag: Arc<AtomicBool>,
}

impl WatchHandle {
    /// Signal the watcher to stop after its current scan.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Stop the watcher and wait for it to finish.
    pub async fn join(self) {
        self.stop();
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "file watcher task panicked");
        }
    }
}

async fn scan(roots: &[PathBuf]) -> Snapshot {
    let mut snapshot = Snapshot::new();

    for root in roots {
        let files = match LocalFilesystem.list_files(root).await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "failed to scan watch root");
                continue;
            }
        };
        for path in files {
            if let Some(stamp) = stamp(&path).await {
                snapshot.insert(path, stamp);
            }
        }
    }

    snapshot
}

async fn stamp(path: &Path) -> Option<FileStamp> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    Some(FileStamp {
        modified: metadata.modified().ok(),
        len: metadata.len(),
    })
}

fn changes(previous: &Snapshot, current: &Snapshot) -> Vec<WatchEvent> {
    let mut events = Vec::new();

    for (path, stamp) in current {
        match previous.get(path) {
            None => events.push(WatchEvent::new(WatchEventKind::Add, path.clone())),
            Some(old) if old != stamp => {
                events.push(WatchEvent::new(WatchEventKind::Change, path.clone()))
            }
            _ => {}
        }
    }
    for path in previous.keys() {
        if !current.contains_key(path) {
            events.push(WatchEvent::new(WatchEventKind::Unlink, path.clone()));
        }
    }

    events.sort_by(|a, b| a.path.cmp(&b.path));
    events
}
