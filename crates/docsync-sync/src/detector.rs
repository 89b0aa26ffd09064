//! Local change detection
//!
//! Compares the tree on disk against the persisted index and produces the
//! per-pass [`ChangeSet`]. Detection is stateless between passes: whatever
//! a previous pass failed to apply simply shows up as drift again.
//!
//! Two sweeps feed the set:
//!
//! 1. **Tree walk**: every on-disk entry without an index record is an
//!    addition. An untracked directory is recorded as one added folder
//!    and its contents are not walked; the recursive upload covers them.
//! 2. **Index sweep**: every record whose path no longer exists on disk
//!    is a deletion, and every tracked file whose current hash differs
//!    from the stored one is a modification.
//!
//! Unreadable directories are skipped with a warning rather than failing
//! the pass; their contents are revisited next time.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use docsync_core::config::IgnoreRules;
use docsync_core::domain::{ChangeSet, RelPath, RootMapping};
use docsync_core::ports::ILocalIndex;

use crate::transfer::hash_file;

/// Detects local drift for one synchronized root
pub struct LocalChangeDetector {
    index: Arc<dyn ILocalIndex + Send + Sync>,
    mapping: RootMapping,
    rules: IgnoreRules,
}

impl LocalChangeDetector {
    pub fn new(
        index: Arc<dyn ILocalIndex + Send + Sync>,
        mapping: RootMapping,
        rules: IgnoreRules,
    ) -> Self {
        Self {
            index,
            mapping,
            rules,
        }
    }

    /// Scans the local tree and the index, returning the pruned change set
    ///
    /// # Errors
    /// Returns an error only for index access failures; per-directory and
    /// per-file I/O problems are logged and skipped.
    pub async fn detect(&self) -> Result<ChangeSet> {
        let mut changes = ChangeSet::new();

        self.scan_tree(&mut changes).await?;
        self.sweep_index(&mut changes).await?;

        changes.prune();

        debug!(
            deleted_folders = changes.deleted_folders.len(),
            deleted_files = changes.deleted_files.len(),
            modified_files = changes.modified_files.len(),
            added_folders = changes.added_folders.len(),
            added_files = changes.added_files.len(),
            "Local change detection finished"
        );

        Ok(changes)
    }

    /// Walks tracked directories looking for untracked entries
    async fn scan_tree(&self, changes: &mut ChangeSet) -> Result<()> {
        let mut pending = vec![RelPath::root()];

        while let Some(dir) = pending.pop() {
            let abs = self.mapping.to_local(&dir);
            let mut entries = match tokio::fs::read_dir(&abs).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %abs.display(), error = %e, "Skipping unreadable directory");
                    continue;
                }
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(path = %abs.display(), error = %e, "Directory listing failed, skipping rest");
                        break;
                    }
                };

                let name = entry.file_name();
                let Some(name) = name.to_str() else {
                    warn!(path = %entry.path().display(), "Skipping non-UTF-8 name");
                    continue;
                };
                if !IgnoreRules::is_name_syncable(name) {
                    continue;
                }

                let rel = match dir.join(name) {
                    Ok(rel) => rel,
                    Err(e) => {
                        warn!(name, error = %e, "Skipping unrepresentable name");
                        continue;
                    }
                };
                if self.rules.is_ignored(rel.as_str()) {
                    continue;
                }

                let file_type = match entry.file_type().await {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(path = %entry.path().display(), error = %e, "Cannot stat entry, skipping");
                        continue;
                    }
                };

                let tracked = self
                    .index
                    .get(&rel)
                    .await
                    .context("Index lookup during tree scan")?
                    .is_some();

                if file_type.is_dir() {
                    if tracked {
                        pending.push(rel);
                    } else {
                        // Recursive upload covers the contents.
                        changes.added_folders.insert(rel);
                    }
                } else if file_type.is_file() && !tracked {
                    changes.added_files.insert(rel);
                }
            }
        }

        Ok(())
    }

    /// Checks every index record against the disk for deletions and edits
    async fn sweep_index(&self, changes: &mut ChangeSet) -> Result<()> {
        for folder in self
            .index
            .list_folders()
            .await
            .context("Listing tracked folders")?
        {
            if folder.is_root() {
                continue;
            }
            let abs = self.mapping.to_local(&folder);
            if tokio::fs::metadata(&abs).await.is_err() {
                changes.deleted_folders.insert(folder);
            }
        }

        for file in self
            .index
            .list_files_with_checksum()
            .await
            .context("Listing tracked files")?
        {
            let abs = self.mapping.to_local(&file.path);
            match tokio::fs::metadata(&abs).await {
                Err(_) => {
                    changes.deleted_files.insert(file.path);
                }
                Ok(meta) if meta.is_file() => match hash_file(&abs).await {
                    Ok(current) if current != file.checksum => {
                        changes.modified_files.insert(file.path);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(path = %abs.display(), error = %e, "Cannot hash tracked file, skipping");
                    }
                },
                // A directory now occupies the file's path; the tree walk
                // reports it and the remote phase resolves the clash.
                Ok(_) => {}
            }
        }

        Ok(())
    }
}
