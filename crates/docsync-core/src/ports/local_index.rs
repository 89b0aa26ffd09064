//! Local index port
//!
//! Persistent store of per-item sync metadata plus the single
//! process-wide change-log token for one synchronized root. A record is
//! written only after the item's content transfer has fully completed;
//! a failed single-record write leaves the item unconfirmed so the next
//! pass retries it via drift detection.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::index_record::{FileChecksum, IndexRecord};
use crate::domain::newtypes::{ChangeLogToken, RelPath, RemoteId};

/// Errors surfaced by the index storage layer
#[derive(Debug, Error)]
pub enum IndexError {
    /// Failed to open or reach the storage backend
    #[error("Index connection failed: {0}")]
    ConnectionFailed(String),

    /// A query against the storage backend failed
    #[error("Index query failed: {0}")]
    QueryFailed(String),

    /// Stored data could not be mapped back to domain values
    #[error("Index data corrupt: {0}")]
    Corrupt(String),
}

/// Persistent per-root index of synchronized items
///
/// Implementations are shared across tasks; the engine holds them behind
/// `Arc` and borrows them across `.await` points.
#[async_trait]
pub trait ILocalIndex: Send + Sync {
    /// Fetch the record for a path, if one exists
    async fn get(&self, path: &RelPath) -> Result<Option<IndexRecord>, IndexError>;

    /// Insert or replace a record (idempotent upsert)
    async fn put(&self, record: &IndexRecord) -> Result<(), IndexError>;

    /// Remove the record for a path (absent path is a no-op)
    async fn remove(&self, path: &RelPath) -> Result<(), IndexError>;

    /// Remove the record for a path and every strict descendant
    ///
    /// Descendant matching is segment-aware: removing `"foo"` must not
    /// touch `"foo2/x"`.
    async fn remove_subtree(&self, path: &RelPath) -> Result<(), IndexError>;

    /// All tracked folder paths
    async fn list_folders(&self) -> Result<Vec<RelPath>, IndexError>;

    /// All tracked files with their stored checksums
    async fn list_files_with_checksum(&self) -> Result<Vec<FileChecksum>, IndexError>;

    /// All records pointing at a given remote object
    async fn find_by_remote_id(&self, id: &RemoteId) -> Result<Vec<IndexRecord>, IndexError>;

    /// Every record in the index
    async fn list_all(&self) -> Result<Vec<IndexRecord>, IndexError>;

    /// The last fully applied change-log position, if any
    async fn change_log_token(&self) -> Result<Option<ChangeLogToken>, IndexError>;

    /// Persist the change-log position
    async fn set_change_log_token(&self, token: &ChangeLogToken) -> Result<(), IndexError>;

    /// Number of records in the index
    async fn count(&self) -> Result<u64, IndexError>;
}
