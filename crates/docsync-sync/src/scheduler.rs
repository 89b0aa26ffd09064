//! Pass scheduling for one synchronized root
//!
//! The [`SyncScheduler`] owns the trigger loop: a periodic poll timer
//! always runs, and debounced filesystem events become additional
//! triggers once the root has proven converged. Until a pass reports
//! itself settled, watcher events are dropped; the periodic passes
//! already rescan everything those early events describe, and arming
//! event-driven mode on a settled root keeps a busy initial sync from
//! stampeding itself.
//!
//! ```text
//! FileWatcher ──→ mpsc::Receiver ──┐
//!                                  ├──→ SyncScheduler ──→ Reconciler::sync()
//! poll interval ───────────────────┘
//! ```
//!
//! Triggers are fire-and-forget: the reconciler's single-flight guard
//! drops a trigger that lands while a pass is running, and the next
//! trigger rescans whatever that one would have seen.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::reconciler::{PassOutcome, Reconciler};
use crate::watcher::{ChangeEvent, DebouncedChangeQueue};

/// How often the debounce queue is checked for settled events
const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Drives reconciliation passes from timers and filesystem events
pub struct SyncScheduler {
    reconciler: Arc<Reconciler>,
    change_rx: mpsc::Receiver<ChangeEvent>,
    queue: DebouncedChangeQueue,
    poll_interval: Duration,
    shutdown: CancellationToken,
    /// Set once a pass reports the root converged; gates event triggers
    events_armed: bool,
}

impl SyncScheduler {
    pub fn new(
        reconciler: Arc<Reconciler>,
        change_rx: mpsc::Receiver<ChangeEvent>,
        debounce_delay: Duration,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            reconciler,
            change_rx,
            queue: DebouncedChangeQueue::new(debounce_delay),
            poll_interval,
            shutdown,
            events_armed: false,
        }
    }

    /// Runs until the shutdown token fires or the watcher channel closes
    ///
    /// The first poll tick fires immediately, so startup always begins
    /// with a full pass.
    pub async fn run(mut self) {
        info!(
            poll_secs = self.poll_interval.as_secs(),
            "Sync scheduler starting"
        );

        let mut poll_timer = tokio::time::interval(self.poll_interval);
        let mut queue_timer = tokio::time::interval(QUEUE_POLL_INTERVAL);

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("Shutdown requested, sync scheduler stopping");
                    break;
                }

                event = self.change_rx.recv() => {
                    match event {
                        Some(event) => self.absorb_event(event),
                        None => {
                            info!("Watcher channel closed, sync scheduler stopping");
                            break;
                        }
                    }
                }

                _ = poll_timer.tick() => {
                    self.trigger("poll interval").await;
                }

                _ = queue_timer.tick() => {
                    if !self.queue.poll().is_empty() {
                        self.trigger("filesystem events").await;
                    }
                }
            }
        }

        info!("Sync scheduler stopped");
    }

    fn absorb_event(&mut self, event: ChangeEvent) {
        if self.events_armed {
            self.queue.push(event);
        } else {
            // Periodic passes rescan everything until the root settles;
            // early events would only duplicate that work.
            debug!(path = %event.path.display(), "Dropping event before first settled pass");
        }
    }

    async fn trigger(&mut self, reason: &str) {
        debug!(reason, "Triggering reconciliation pass");
        match self.reconciler.sync().await {
            Ok(PassOutcome::Skipped) => {
                debug!(reason, "Pass skipped");
            }
            Ok(PassOutcome::Completed(report)) => {
                if report.settled && !self.events_armed {
                    info!("Root converged, event-driven triggers armed");
                    self.events_armed = true;
                    // Queued events describe state the settled pass saw.
                    self.queue.clear();
                }
            }
            Err(e) => {
                error!(reason, error = format!("{e:#}"), "Reconciliation pass failed");
            }
        }
    }
}
