//! Remote repository value types
//!
//! The engine models remote objects as a tagged variant carrying only the
//! fields reconciliation needs, independent of any concrete protocol
//! client. Documents can be multi-filed (reachable through several parent
//! folders), so they carry a list of paths rather than a single one.

use chrono::{DateTime, Utc};

use super::newtypes::{RemoteId, RemotePath};

/// A folder or document as seen by the remote session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteObject {
    /// A remote folder
    Folder {
        /// Object identifier
        id: RemoteId,
        /// Folder name
        name: String,
        /// Full path of the folder
        path: RemotePath,
        /// Server-side modification timestamp
        modified: Option<DateTime<Utc>>,
    },
    /// A remote document
    Document {
        /// Object identifier
        id: RemoteId,
        /// Document name
        name: String,
        /// All paths the document is filed under (empty for unfiled
        /// documents)
        paths: Vec<RemotePath>,
        /// Content length in bytes, when the server reports one
        content_length: Option<u64>,
        /// Server-side modification timestamp
        modified: Option<DateTime<Utc>>,
    },
}

impl RemoteObject {
    /// Object identifier regardless of kind
    #[must_use]
    pub fn id(&self) -> &RemoteId {
        match self {
            Self::Folder { id, .. } | Self::Document { id, .. } => id,
        }
    }

    /// Object name regardless of kind
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Folder { name, .. } | Self::Document { name, .. } => name,
        }
    }

    /// Server-side modification timestamp
    #[must_use]
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Folder { modified, .. } | Self::Document { modified, .. } => *modified,
        }
    }

    /// Whether this object is a folder
    #[must_use]
    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder { .. })
    }

    /// All paths this object is reachable under
    #[must_use]
    pub fn paths(&self) -> Vec<&RemotePath> {
        match self {
            Self::Folder { path, .. } => vec![path],
            Self::Document { paths, .. } => paths.iter().collect(),
        }
    }
}

/// Kind of a change-log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Object was created
    Created,
    /// Object content or metadata was updated
    Updated,
    /// Object was deleted
    Deleted,
    /// Object permissions changed
    Security,
}

/// One entry from the remote change-log feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteChangeEvent {
    /// Identifier of the touched object
    pub id: RemoteId,
    /// What happened to it
    pub kind: ChangeKind,
}
