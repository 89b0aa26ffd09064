//! Remote repository port
//!
//! Abstract session to the remote document-management repository. The
//! concrete protocol client is an external collaborator; the engine only
//! depends on this trait.
//!
//! Lookups return explicit [`RemoteLookup`] variants so call sites branch
//! on meaning: "not found" is a normal outcome (for example a deletion
//! already applied on the server), never an error to be inspected by type
//! or message.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::newtypes::{ChangeLogToken, RemoteId, RemotePath};
use crate::domain::remote::{RemoteChangeEvent, RemoteObject};

/// Errors surfaced by the remote session
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The addressed object does not exist (for operations where absence
    /// is unexpected; lookups report absence through [`RemoteLookup`])
    #[error("Remote object not found: {0}")]
    NotFound(String),

    /// The session lacks permission for the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The supplied change-log token is no longer recognized by the server
    #[error("Change-log token no longer valid")]
    InvalidToken,

    /// A transient runtime failure (network timeout, server hiccup);
    /// retried implicitly on the next pass
    #[error("Transient remote error: {0}")]
    Transient(String),

    /// A non-transient protocol-level failure
    #[error("Remote protocol error: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// Whether the failure is expected to clear on its own
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Outcome of resolving an object by path or id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLookup {
    /// The object exists and is readable
    Found(RemoteObject),
    /// No object at that path / with that id
    NotFound,
    /// The object exists but the session may not read it
    PermissionDenied,
}

/// One page of the change-log feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeLogPage {
    /// Events in this page, oldest first
    pub events: Vec<RemoteChangeEvent>,
    /// Token positioned after the last event of this page
    pub next_token: ChangeLogToken,
    /// Whether the server reports further events pending
    pub has_more: bool,
}

/// Session capability to the remote repository
#[async_trait]
pub trait IRemoteRepository {
    /// Whether the repository advertises change-log support
    async fn supports_change_log(&self) -> Result<bool, RemoteError>;

    /// The server's current (latest) change-log token
    async fn change_log_token(&self) -> Result<ChangeLogToken, RemoteError>;

    /// Fetch a page of change events starting after `since`
    ///
    /// An expired or unknown token yields [`RemoteError::InvalidToken`].
    async fn content_changes(
        &self,
        since: &ChangeLogToken,
        page_size: u32,
    ) -> Result<ChangeLogPage, RemoteError>;

    /// Resolve an object by its full remote path
    async fn lookup_by_path(&self, path: &RemotePath) -> Result<RemoteLookup, RemoteError>;

    /// Resolve an object by its identifier
    async fn lookup_by_id(&self, id: &RemoteId) -> Result<RemoteLookup, RemoteError>;

    /// List the direct children of a folder
    async fn list_children(&self, folder: &RemoteId) -> Result<Vec<RemoteObject>, RemoteError>;

    /// Fetch a document's content stream
    ///
    /// `Ok(None)` means the server reports no content stream for the
    /// document (distinct from zero-length content, which is
    /// `Ok(Some(vec![]))`).
    async fn download(&self, document: &RemoteId) -> Result<Option<Vec<u8>>, RemoteError>;

    /// Create a sub-folder
    async fn create_folder(
        &self,
        parent: &RemoteId,
        name: &str,
    ) -> Result<RemoteObject, RemoteError>;

    /// Create a document with the given content
    async fn create_document(
        &self,
        parent: &RemoteId,
        name: &str,
        content: &[u8],
    ) -> Result<RemoteObject, RemoteError>;

    /// Replace a document's content stream
    ///
    /// Returns the new server-side modification timestamp when the server
    /// reports one.
    async fn set_content(
        &self,
        document: &RemoteId,
        content: &[u8],
    ) -> Result<Option<DateTime<Utc>>, RemoteError>;

    /// Delete a document (all versions)
    async fn delete_document(&self, document: &RemoteId) -> Result<(), RemoteError>;

    /// Delete a folder and everything beneath it
    async fn delete_tree(&self, folder: &RemoteId) -> Result<(), RemoteError>;
}
