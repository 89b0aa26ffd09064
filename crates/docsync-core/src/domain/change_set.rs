//! Per-pass change set
//!
//! The transient result of local change detection: five disjoint path
//! sets, applied to the remote side in a fixed order. Descendants of
//! added or deleted folders are pruned because recursive upload and
//! recursive deletion already cover them.

use std::collections::BTreeSet;

use super::newtypes::RelPath;

/// The five categories of local drift detected in one pass
///
/// Application order is significant and fixed: deleted folders, deleted
/// files, modified files, added folders, added files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Folders tracked in the index but missing on disk
    pub deleted_folders: BTreeSet<RelPath>,
    /// Files tracked in the index but missing on disk
    pub deleted_files: BTreeSet<RelPath>,
    /// Files whose content no longer matches the stored checksum
    pub modified_files: BTreeSet<RelPath>,
    /// Directories on disk with no index record
    pub added_folders: BTreeSet<RelPath>,
    /// Files on disk with no index record
    pub added_files: BTreeSet<RelPath>,
}

impl ChangeSet {
    /// Create an empty change set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no changes were detected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of entries across all five sets
    #[must_use]
    pub fn len(&self) -> usize {
        self.deleted_folders.len()
            + self.deleted_files.len()
            + self.modified_files.len()
            + self.added_folders.len()
            + self.added_files.len()
    }

    /// Remove entries implied by a folder-level operation
    ///
    /// - added folders that are strict descendants of another added folder
    /// - added files under an added folder (uploaded by the recursive
    ///   folder upload)
    /// - deleted folders and deleted files that are strict descendants of
    ///   another deleted folder (removed by the recursive tree deletion)
    pub fn prune(&mut self) {
        self.added_folders = prune_nested(&self.added_folders);
        self.added_files = without_descendants(&self.added_files, &self.added_folders);

        self.deleted_folders = prune_nested(&self.deleted_folders);
        self.deleted_files = without_descendants(&self.deleted_files, &self.deleted_folders);
        self.modified_files = without_descendants(&self.modified_files, &self.deleted_folders);
    }
}

/// Keep only the topmost paths of a set (drop strict descendants)
fn prune_nested(paths: &BTreeSet<RelPath>) -> BTreeSet<RelPath> {
    paths
        .iter()
        .filter(|p| !paths.iter().any(|other| p.is_descendant_of(other)))
        .cloned()
        .collect()
}

/// Drop paths that are strict descendants of any folder in `folders`
fn without_descendants(paths: &BTreeSet<RelPath>, folders: &BTreeSet<RelPath>) -> BTreeSet<RelPath> {
    paths
        .iter()
        .filter(|p| !folders.iter().any(|f| p.is_descendant_of(f)))
        .cloned()
        .collect()
}
