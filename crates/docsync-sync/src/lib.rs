//! docsync Sync - Bidirectional reconciliation engine
//!
//! Drives the repeated reconciliation passes that keep a local directory
//! tree and a remote document repository converged. Each pass applies
//! remote changes first (change log or full crawl), then pushes local
//! changes detected against the persisted index.
//!
//! ## Modules
//!
//! - [`reconciler`] - the per-root pass orchestrator
//! - [`remote_source`] - change-log / crawl decision and paging
//! - [`detector`] - local tree scan against the index
//! - [`transfer`] - atomic downloads, uploads and content hashing
//! - [`watcher`] - filesystem event intake and debouncing
//! - [`scheduler`] - poll timer plus event-driven trigger loop

pub mod detector;
pub mod reconciler;
pub mod remote_source;
pub mod scheduler;
pub mod transfer;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use reconciler::{PassOutcome, PassReport, Reconciler};
pub use scheduler::SyncScheduler;
pub use watcher::{ChangeEvent, ChangeEventKind, DebouncedChangeQueue, FileWatcher};
