//! Filesystem event intake and debouncing
//!
//! Wraps the `notify` crate behind a [`FileWatcher`] that converts raw OS
//! events into [`ChangeEvent`] values, and a [`DebouncedChangeQueue`] that
//! coalesces bursts of events per path so a pass is only triggered once a
//! path has been quiet for the configured window.
//!
//! ```text
//! inotify ──→ FileWatcher ──→ mpsc::channel ──→ DebouncedChangeQueue ──→ SyncScheduler
//! ```
//!
//! The queue never feeds individual paths into the engine: a settled batch
//! only tells the scheduler that a pass is worth running. The pass itself
//! rescans the tree, so dropped or duplicated events are harmless.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

// ============================================================================
// ChangeEvent
// ============================================================================

/// What happened to a watched path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEventKind {
    Created,
    Modified,
    Removed,
    Renamed,
}

/// A filesystem change observed under a watched root
///
/// Internal representation decoupled from `notify`'s event types. A rename
/// produces two events, one for each endpoint, so both the vacated and the
/// occupied path reset their debounce windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeEventKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

// ============================================================================
// FileWatcher
// ============================================================================

/// Recursive watch over a sync root using the OS-native mechanism
///
/// On Linux this is inotify. Raw events are mapped to [`ChangeEvent`]s in
/// the notify callback thread and forwarded through an mpsc channel; the
/// async side consumes them via the receiver returned from [`FileWatcher::new`].
pub struct FileWatcher {
    watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Creates the watcher and the channel its events arrive on
    ///
    /// # Errors
    /// Returns an error if the OS watcher cannot be created.
    pub fn new() -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        let (event_tx, event_rx) = mpsc::channel::<ChangeEvent>(1024);

        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for change in map_notify_event(&event) {
                        if let Err(e) = event_tx.blocking_send(change) {
                            warn!(error = %e, "Change event receiver dropped");
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "File watcher error");
                }
            },
            notify::Config::default(),
        )
        .context("Failed to create file watcher")?;

        Ok((Self { watcher }, event_rx))
    }

    /// Starts watching a directory tree recursively
    ///
    /// # Errors
    /// Returns an error if the path cannot be watched (missing directory,
    /// permissions, inotify watch limit).
    pub fn watch(&mut self, root: &Path) -> Result<()> {
        self.watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))
    }

    /// Stops watching a directory tree
    ///
    /// # Errors
    /// Returns an error if the path was not being watched.
    pub fn unwatch(&mut self, root: &Path) -> Result<()> {
        self.watcher
            .unwatch(root)
            .with_context(|| format!("Failed to unwatch {}", root.display()))
    }
}

/// Maps a raw `notify` event to zero, one or two [`ChangeEvent`]s
///
/// Access events carry no sync-relevant information and are dropped.
/// Renames with both endpoints known become a Removed/Renamed pair so
/// each affected path is debounced independently.
fn map_notify_event(event: &notify::Event) -> Vec<ChangeEvent> {
    let paths = &event.paths;

    match &event.kind {
        EventKind::Create(_) => paths
            .first()
            .map(|p| ChangeEvent::new(p.clone(), ChangeEventKind::Created))
            .into_iter()
            .collect(),

        EventKind::Remove(_) => paths
            .first()
            .map(|p| ChangeEvent::new(p.clone(), ChangeEventKind::Removed))
            .into_iter()
            .collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            debug!(
                old = %paths[0].display(),
                new = %paths[1].display(),
                "Rename observed"
            );
            vec![
                ChangeEvent::new(paths[0].clone(), ChangeEventKind::Removed),
                ChangeEvent::new(paths[1].clone(), ChangeEventKind::Renamed),
            ]
        }

        EventKind::Modify(_) => paths
            .first()
            .map(|p| ChangeEvent::new(p.clone(), ChangeEventKind::Modified))
            .into_iter()
            .collect(),

        _ => Vec::new(),
    }
}

// ============================================================================
// DebouncedChangeQueue
// ============================================================================

/// Coalesces rapid per-path event bursts into settled batches
///
/// Each push replaces any pending event for the same path and restarts
/// that path's quiet timer. [`poll`](DebouncedChangeQueue::poll) drains
/// only the entries whose timer has expired, so a file being actively
/// written keeps extending its own window without delaying other paths.
pub struct DebouncedChangeQueue {
    pending: HashMap<PathBuf, (ChangeEventKind, Instant)>,
    debounce_delay: Duration,
}

impl DebouncedChangeQueue {
    pub fn new(debounce_delay: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            debounce_delay,
        }
    }

    /// Inserts or refreshes the pending event for the path
    pub fn push(&mut self, event: ChangeEvent) {
        self.pending.insert(event.path, (event.kind, Instant::now()));
    }

    /// Removes and returns every event that has been quiet long enough
    pub fn poll(&mut self) -> Vec<ChangeEvent> {
        let now = Instant::now();
        let settled_paths: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, (_, seen))| now.duration_since(*seen) >= self.debounce_delay)
            .map(|(path, _)| path.clone())
            .collect();

        let mut settled = Vec::with_capacity(settled_paths.len());
        for path in settled_paths {
            if let Some((kind, _)) = self.pending.remove(&path) {
                settled.push(ChangeEvent { path, kind });
            }
        }

        if !settled.is_empty() {
            debug!(count = settled.len(), "Settled change events");
        }

        settled
    }

    /// Discards all pending events without emitting them
    ///
    /// Used when a pass has just rescanned the whole tree and any queued
    /// events describe state the pass already observed.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ============================================================================
// Unit tests
// ============================================================================
