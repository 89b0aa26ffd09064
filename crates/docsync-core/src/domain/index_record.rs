//! Persisted index records
//!
//! One record per tracked file or folder. A record exists iff the item
//! was observed fully synchronized at least once; it is written only after
//! the content transfer for the item has completed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{ContentHash, RelPath, RemoteId};

/// Metadata for one synchronized file or folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Normalized relative path (the index key)
    pub path: RelPath,
    /// Identifier of the corresponding remote object
    pub remote_id: RemoteId,
    /// Whether this entry is a folder
    pub is_folder: bool,
    /// Timestamp of the last known server-side change
    pub server_modified: Option<DateTime<Utc>>,
    /// Content hash at last successful sync (folders: none)
    pub checksum: Option<ContentHash>,
}

impl IndexRecord {
    /// Record for a synchronized folder
    #[must_use]
    pub fn folder(
        path: RelPath,
        remote_id: RemoteId,
        server_modified: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            path,
            remote_id,
            is_folder: true,
            server_modified,
            checksum: None,
        }
    }

    /// Record for a synchronized file
    #[must_use]
    pub fn file(
        path: RelPath,
        remote_id: RemoteId,
        server_modified: Option<DateTime<Utc>>,
        checksum: ContentHash,
    ) -> Self {
        Self {
            path,
            remote_id,
            is_folder: false,
            server_modified,
            checksum: Some(checksum),
        }
    }
}

/// Projection used by the local change detector: every tracked file with
/// its stored checksum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChecksum {
    /// Normalized relative path of the file
    pub path: RelPath,
    /// Content hash at last successful sync
    pub checksum: ContentHash,
    /// Timestamp of the last known server-side change
    pub server_modified: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_record_has_no_checksum() {
        let rec = IndexRecord::folder(
            RelPath::new("docs").unwrap(),
            RemoteId::new("id-1").unwrap(),
            None,
        );
        assert!(rec.is_folder);
        assert!(rec.checksum.is_none());
    }

    #[test]
    fn test_file_record_carries_checksum() {
        let hash = ContentHash::from_digest(&[7u8; 32]);
        let rec = IndexRecord::file(
            RelPath::new("docs/a.txt").unwrap(),
            RemoteId::new("id-2").unwrap(),
            Some(Utc::now()),
            hash.clone(),
        );
        assert!(!rec.is_folder);
        assert_eq!(rec.checksum, Some(hash));
    }
}
