//! Per-root reconciliation passes
//!
//! The [`Reconciler`] runs one pass at a time for its root: the remote
//! phase first (change-log events or a full crawl), then the local phase
//! (the detected [`ChangeSet`](docsync_core::domain::ChangeSet) applied in
//! its fixed category order). A single item failing is recorded in the
//! pass report and skipped; only losing the session, the index, or the
//! local root aborts a pass.
//!
//! Passes are single-flight per root: a trigger arriving while a pass is
//! running is dropped, and the caller relies on stateless re-detection to
//! pick the change up on the next trigger. Suspension works the same way,
//! rejecting new passes without interrupting a running one.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use docsync_core::config::IgnoreRules;
use docsync_core::domain::{
    ChangeKind, ChangeSet, IndexRecord, PassId, RelPath, RemoteChangeEvent, RemoteId,
    RemoteObject, RootMapping,
};
use docsync_core::ports::{
    ActivityScope, IActivityListener, ILocalIndex, IRemoteRepository, RemoteLookup,
};

use crate::detector::LocalChangeDetector;
use crate::remote_source::{RemoteChangeSource, RemotePlan};
use crate::transfer::TransferExecutor;

// ============================================================================
// Pass reporting
// ============================================================================

/// Result of one attempted pass
#[derive(Debug)]
pub enum PassOutcome {
    /// The pass did not run: another pass holds the root, or the root is
    /// suspended
    Skipped,
    /// The pass ran to its end
    Completed(PassReport),
}

/// Summary of a completed pass
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub pass_id: Option<PassId>,
    /// Files written locally from remote content
    pub downloaded: u32,
    /// Files pushed to the remote (creates and content updates)
    pub uploaded: u32,
    /// Local files and folders removed to mirror remote deletions
    pub deleted_local: u32,
    /// Remote documents and trees removed to mirror local deletions
    pub deleted_remote: u32,
    /// Folders created on either side
    pub folders_created: u32,
    /// Per-item failures; the items stay drifted and retry next pass
    pub errors: Vec<String>,
    /// Whether the pass observed a fully converged root
    pub settled: bool,
}

impl PassReport {
    /// Whether every touched item was applied successfully
    #[must_use]
    pub fn complete(&self) -> bool {
        self.errors.is_empty()
    }

    fn applied(&self) -> u32 {
        self.downloaded + self.uploaded + self.deleted_local + self.deleted_remote
            + self.folders_created
    }

    fn record_error(&mut self, item: impl std::fmt::Display, error: &anyhow::Error) {
        warn!(item = %item, error = format!("{error:#}"), "Item failed, continuing pass");
        self.errors.push(format!("{item}: {error:#}"));
    }
}

/// Resets the single-flight flag even on early exits
struct FlagGuard<'a>(&'a AtomicBool);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ============================================================================
// Reconciler
// ============================================================================

/// Orchestrates reconciliation passes for one synchronized root
pub struct Reconciler {
    remote: Arc<dyn IRemoteRepository + Send + Sync>,
    index: Arc<dyn ILocalIndex + Send + Sync>,
    activity: Arc<dyn IActivityListener>,
    mapping: RootMapping,
    rules: IgnoreRules,
    transfer: TransferExecutor,
    detector: LocalChangeDetector,
    change_source: RemoteChangeSource,
    syncing: AtomicBool,
    suspended: AtomicBool,
}

impl Reconciler {
    pub fn new(
        remote: Arc<dyn IRemoteRepository + Send + Sync>,
        index: Arc<dyn ILocalIndex + Send + Sync>,
        activity: Arc<dyn IActivityListener>,
        mapping: RootMapping,
        rules: IgnoreRules,
        poll_interval_secs: u64,
    ) -> Self {
        Self {
            transfer: TransferExecutor::new(remote.clone(), activity.clone()),
            detector: LocalChangeDetector::new(index.clone(), mapping.clone(), rules.clone()),
            change_source: RemoteChangeSource::new(remote.clone(), poll_interval_secs),
            remote,
            index,
            activity,
            mapping,
            rules,
            syncing: AtomicBool::new(false),
            suspended: AtomicBool::new(false),
        }
    }

    /// Stops accepting new passes; a running pass finishes undisturbed
    pub fn suspend(&self) {
        info!(root = %self.mapping.local_root().display(), "Synchronization suspended");
        self.suspended.store(true, Ordering::Release);
    }

    /// Accepts passes again
    pub fn resume(&self) {
        info!(root = %self.mapping.local_root().display(), "Synchronization resumed");
        self.suspended.store(false, Ordering::Release);
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    /// Runs one reconciliation pass, unless one is already running or the
    /// root is suspended
    ///
    /// # Errors
    /// Returns an error only for pass-fatal conditions: the local root is
    /// missing, the remote session cannot be established, or the index is
    /// unreachable. Per-item failures land in the report instead.
    pub async fn sync(&self) -> Result<PassOutcome> {
        if self.is_suspended() {
            debug!("Pass rejected: suspended");
            return Ok(PassOutcome::Skipped);
        }
        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Pass rejected: another pass is running");
            return Ok(PassOutcome::Skipped);
        }
        let _flag = FlagGuard(&self.syncing);

        self.run_pass().await.map(PassOutcome::Completed)
    }

    async fn run_pass(&self) -> Result<PassReport> {
        let pass_id = PassId::new();
        info!(
            pass = %pass_id,
            root = %self.mapping.local_root().display(),
            "Reconciliation pass started"
        );
        let _activity = ActivityScope::enter(self.activity.clone());

        let root_meta = tokio::fs::metadata(self.mapping.local_root())
            .await
            .with_context(|| {
                format!(
                    "Local root {} is not accessible",
                    self.mapping.local_root().display()
                )
            })?;
        anyhow::ensure!(
            root_meta.is_dir(),
            "Local root {} is not a directory",
            self.mapping.local_root().display()
        );

        let mut report = PassReport {
            pass_id: Some(pass_id),
            ..PassReport::default()
        };

        self.apply_remote_phase(&mut report).await?;
        let local_changes = self.apply_local_phase(&mut report).await?;

        report.settled = report.applied() == 0 && local_changes == 0 && report.complete();

        info!(
            pass = %pass_id,
            downloaded = report.downloaded,
            uploaded = report.uploaded,
            deleted_local = report.deleted_local,
            deleted_remote = report.deleted_remote,
            folders_created = report.folders_created,
            errors = report.errors.len(),
            settled = report.settled,
            "Reconciliation pass finished"
        );

        Ok(report)
    }

    // ------------------------------------------------------------------
    // Remote phase
    // ------------------------------------------------------------------

    async fn apply_remote_phase(&self, report: &mut PassReport) -> Result<()> {
        let plan = self.change_source.plan(self.index.as_ref()).await?;

        match plan {
            RemotePlan::NoOp => Ok(()),
            RemotePlan::ChangeLog { events, token } => {
                debug!(events = events.len(), "Applying change-log events");
                for event in events {
                    if let Err(e) = self.apply_remote_event(&event, report).await {
                        report.record_error(&event.id, &e);
                    }
                }
                // The token advances even when individual events failed:
                // failed items stay drifted and are healed by detection
                // or the next crawl, never by replaying the log.
                self.index
                    .set_change_log_token(&token)
                    .await
                    .context("Persisting change-log token")?;
                Ok(())
            }
            RemotePlan::Crawl { token } => {
                debug!("Crawling remote tree");
                self.crawl_remote(report).await?;
                if let Some(token) = token {
                    self.index
                        .set_change_log_token(&token)
                        .await
                        .context("Persisting change-log token after crawl")?;
                }
                Ok(())
            }
        }
    }

    /// Applies one change-log event
    ///
    /// Only a deleted event removes local copies. Every other kind
    /// resolves the object's current server state: an unreadable object
    /// is discarded, and a resolvable one is materialized at its
    /// applicable path. An object that no longer resolves without a
    /// deleted event is left alone; a later event or crawl settles it.
    async fn apply_remote_event(
        &self,
        event: &RemoteChangeEvent,
        report: &mut PassReport,
    ) -> Result<()> {
        if event.kind == ChangeKind::Deleted {
            return self.delete_local_by_remote_id(&event.id, report).await;
        }

        match self.remote.lookup_by_id(&event.id).await? {
            RemoteLookup::NotFound => {
                debug!(id = %event.id, kind = ?event.kind, "Changed object gone from server, ignoring");
                Ok(())
            }
            RemoteLookup::PermissionDenied => {
                debug!(id = %event.id, "Skipping inaccessible remote object");
                Ok(())
            }
            RemoteLookup::Found(object) => match self.applicable_path(&object) {
                Some(rel) => {
                    self.materialize(&object, rel.clone(), report).await?;
                    if object.is_folder() {
                        // The event stands for the whole subtree: a folder
                        // filed into scope carries its contents with it,
                        // and the log reports only the folder.
                        let mut visited = BTreeSet::new();
                        self.crawl_folder(object.id().clone(), rel, &mut visited, report)
                            .await?;
                    }
                    Ok(())
                }
                None => {
                    debug!(id = %event.id, "Event outside the synchronized subtree, discarded");
                    Ok(())
                }
            },
        }
    }

    /// First of the object's paths that lies under the root and is worth
    /// synchronizing
    fn applicable_path(&self, object: &RemoteObject) -> Option<RelPath> {
        for path in object.paths() {
            let Ok(rel) = self.mapping.from_remote(path) else {
                continue;
            };
            if rel.is_root() {
                continue;
            }
            let Some(name) = rel.file_name() else {
                continue;
            };
            if IgnoreRules::is_name_syncable(name) && !self.rules.is_ignored(rel.as_str()) {
                return Some(rel);
            }
        }
        None
    }

    /// Brings the local tree and the index in line with one remote object
    /// at the given path
    async fn materialize(
        &self,
        object: &RemoteObject,
        rel: RelPath,
        report: &mut PassReport,
    ) -> Result<()> {
        // A moved or renamed object leaves records at its old paths;
        // remove those copies before writing the new one.
        let current_paths: BTreeSet<RelPath> = object
            .paths()
            .iter()
            .filter_map(|p| self.mapping.from_remote(p).ok())
            .collect();
        for record in self.index.find_by_remote_id(object.id()).await? {
            if record.path != rel && !current_paths.contains(&record.path) {
                self.remove_local_artifact(&record, report).await?;
            }
        }

        let abs = self.mapping.to_local(&rel);

        if object.is_folder() {
            if tokio::fs::metadata(&abs).await.is_err() {
                tokio::fs::create_dir_all(&abs)
                    .await
                    .with_context(|| format!("Failed to create {}", abs.display()))?;
                report.folders_created += 1;
            }
            self.index
                .put(&IndexRecord::folder(
                    rel,
                    object.id().clone(),
                    object.modified(),
                ))
                .await?;
            return Ok(());
        }

        if let Some(existing) = self.index.get(&rel).await? {
            if !existing.is_folder
                && existing.server_modified.is_some()
                && existing.server_modified == object.modified()
            {
                debug!(path = %rel, "Remote object unchanged since last sync");
                return Ok(());
            }
        }

        match self.transfer.download(object.id(), &abs).await? {
            Some(hash) => {
                self.index
                    .put(&IndexRecord::file(
                        rel,
                        object.id().clone(),
                        object.modified(),
                        hash,
                    ))
                    .await?;
                report.downloaded += 1;
                Ok(())
            }
            // No content stream: nothing to write, nothing to track.
            None => Ok(()),
        }
    }

    /// Removes every local copy and index record of a remote object
    async fn delete_local_by_remote_id(
        &self,
        id: &RemoteId,
        report: &mut PassReport,
    ) -> Result<()> {
        for record in self.index.find_by_remote_id(id).await? {
            self.remove_local_artifact(&record, report).await?;
        }
        Ok(())
    }

    /// Deletes the file or tree behind a record, then the record itself
    async fn remove_local_artifact(
        &self,
        record: &IndexRecord,
        report: &mut PassReport,
    ) -> Result<()> {
        let abs = self.mapping.to_local(&record.path);

        if record.is_folder {
            match tokio::fs::remove_dir_all(&abs).await {
                Ok(()) => {
                    report.deleted_local += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to remove {}", abs.display()));
                }
            }
            self.index.remove_subtree(&record.path).await?;
        } else {
            match tokio::fs::remove_file(&abs).await {
                Ok(()) => {
                    report.deleted_local += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to remove {}", abs.display()));
                }
            }
            self.index.remove(&record.path).await?;
        }

        debug!(path = %record.path, "Removed local copy of deleted remote object");
        Ok(())
    }

    /// Walks the remote tree, materializing every reachable object and
    /// deleting local items whose remote counterpart is gone
    async fn crawl_remote(&self, report: &mut PassReport) -> Result<()> {
        let root = match self.remote.lookup_by_path(self.mapping.remote_root()).await? {
            RemoteLookup::Found(object) if object.is_folder() => object,
            RemoteLookup::Found(_) => {
                anyhow::bail!("Remote root {} is not a folder", self.mapping.remote_root())
            }
            RemoteLookup::NotFound => {
                anyhow::bail!("Remote root {} does not exist", self.mapping.remote_root())
            }
            RemoteLookup::PermissionDenied => {
                anyhow::bail!("Remote root {} is not readable", self.mapping.remote_root())
            }
        };

        let mut visited = BTreeSet::new();
        self.crawl_folder(root.id().clone(), RelPath::root(), &mut visited, report)
            .await?;

        // Deletion by absence: anything tracked but not encountered was
        // removed remotely. Topmost folders go first so their descendants
        // are not double-counted.
        let mut records = self.index.list_all().await?;
        records.sort_by(|a, b| a.path.cmp(&b.path));
        let mut removed_roots: Vec<RelPath> = Vec::new();
        for record in records {
            if record.path.is_root() || visited.contains(&record.path) {
                continue;
            }
            if removed_roots.iter().any(|r| record.path.is_descendant_of(r)) {
                continue;
            }
            if let Err(e) = self.remove_local_artifact(&record, report).await {
                report.record_error(&record.path, &e);
                continue;
            }
            if record.is_folder {
                removed_roots.push(record.path);
            }
        }

        Ok(())
    }

    /// Recursive crawl step; an unlistable folder skips its subtree
    fn crawl_folder<'a>(
        &'a self,
        folder: RemoteId,
        rel: RelPath,
        visited: &'a mut BTreeSet<RelPath>,
        report: &'a mut PassReport,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            visited.insert(rel.clone());

            let children = match self.remote.list_children(&folder).await {
                Ok(children) => children,
                Err(e) => {
                    report.record_error(&rel, &anyhow::Error::new(e));
                    return Ok(());
                }
            };

            for child in children {
                if !IgnoreRules::is_name_syncable(child.name()) {
                    debug!(name = child.name(), "Skipping unsyncable remote name");
                    continue;
                }
                let child_rel = match rel.join(child.name()) {
                    Ok(child_rel) => child_rel,
                    Err(e) => {
                        debug!(name = child.name(), error = %e, "Skipping unrepresentable remote name");
                        continue;
                    }
                };
                if self.rules.is_ignored(child_rel.as_str()) {
                    continue;
                }

                visited.insert(child_rel.clone());

                // Listing does not prove readability: an object the
                // session cannot read is discarded, and one that vanished
                // between listing and fetch waits for the next pass.
                match self.remote.lookup_by_id(child.id()).await {
                    Ok(RemoteLookup::Found(_)) => {}
                    Ok(RemoteLookup::PermissionDenied) => {
                        debug!(path = %child_rel, "Skipping unreadable remote object");
                        continue;
                    }
                    Ok(RemoteLookup::NotFound) => {
                        debug!(path = %child_rel, "Listed object gone from server, skipping");
                        continue;
                    }
                    Err(e) => {
                        report.record_error(&child_rel, &anyhow::Error::new(e));
                        continue;
                    }
                }

                if child.is_folder() {
                    if let Err(e) = self.materialize(&child, child_rel.clone(), report).await {
                        report.record_error(&child_rel, &e);
                        continue;
                    }
                    self.crawl_folder(child.id().clone(), child_rel, visited, report)
                        .await?;
                } else if let Err(e) = self.materialize(&child, child_rel.clone(), report).await {
                    report.record_error(&child_rel, &e);
                }
            }

            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Local phase
    // ------------------------------------------------------------------

    /// Applies detected local drift to the remote, category by category
    ///
    /// Returns the number of changes detected (before application), which
    /// feeds the settled decision.
    async fn apply_local_phase(&self, report: &mut PassReport) -> Result<usize> {
        let changes: ChangeSet = self.detector.detect().await?;
        let detected = changes.len();

        for path in &changes.deleted_folders {
            if let Err(e) = self.push_folder_deletion(path, report).await {
                report.record_error(path, &e);
            }
        }
        for path in &changes.deleted_files {
            if let Err(e) = self.push_file_deletion(path, report).await {
                report.record_error(path, &e);
            }
        }
        for path in &changes.modified_files {
            if let Err(e) = self.push_modification(path, report).await {
                report.record_error(path, &e);
            }
        }
        for path in &changes.added_folders {
            if let Err(e) = self.push_folder_addition(path, report).await {
                report.record_error(path, &e);
            }
        }
        for path in &changes.added_files {
            if let Err(e) = self.push_file_addition(path, report).await {
                report.record_error(path, &e);
            }
        }

        Ok(detected)
    }

    async fn push_folder_deletion(&self, path: &RelPath, report: &mut PassReport) -> Result<()> {
        let remote_path = self.mapping.to_remote(path)?;
        match self.remote.lookup_by_path(&remote_path).await? {
            RemoteLookup::Found(object) if object.is_folder() => {
                self.remote.delete_tree(object.id()).await?;
                report.deleted_remote += 1;
                debug!(path = %path, "Deleted remote tree");
            }
            // Already gone (or replaced by a document the next remote
            // phase will bring down): dropping the records is enough.
            RemoteLookup::Found(_) | RemoteLookup::NotFound => {
                debug!(path = %path, "Remote tree already absent");
            }
            RemoteLookup::PermissionDenied => {
                anyhow::bail!("No permission to delete {remote_path}");
            }
        }
        self.index.remove_subtree(path).await?;
        Ok(())
    }

    async fn push_file_deletion(&self, path: &RelPath, report: &mut PassReport) -> Result<()> {
        let remote_path = self.mapping.to_remote(path)?;
        match self.remote.lookup_by_path(&remote_path).await? {
            RemoteLookup::Found(object) if !object.is_folder() => {
                self.remote.delete_document(object.id()).await?;
                report.deleted_remote += 1;
                debug!(path = %path, "Deleted remote document");
            }
            RemoteLookup::Found(_) | RemoteLookup::NotFound => {
                debug!(path = %path, "Remote document already absent");
            }
            RemoteLookup::PermissionDenied => {
                anyhow::bail!("No permission to delete {remote_path}");
            }
        }
        self.index.remove(path).await?;
        Ok(())
    }

    async fn push_modification(&self, path: &RelPath, report: &mut PassReport) -> Result<()> {
        let remote_path = self.mapping.to_remote(path)?;
        let abs = self.mapping.to_local(path);

        match self.remote.lookup_by_path(&remote_path).await? {
            RemoteLookup::Found(object) if !object.is_folder() => {
                let (modified, hash) = self.transfer.update(&abs, object.id()).await?;
                self.index
                    .put(&IndexRecord::file(
                        path.clone(),
                        object.id().clone(),
                        modified.or(object.modified()),
                        hash,
                    ))
                    .await?;
                report.uploaded += 1;
                Ok(())
            }
            RemoteLookup::Found(_) => {
                anyhow::bail!("Remote path {remote_path} is a folder")
            }
            // The document was deleted remotely after our edit; re-create
            // it so the edit survives.
            RemoteLookup::NotFound => {
                debug!(path = %path, "Edited document gone remotely, re-uploading");
                self.push_file_addition(path, report).await
            }
            RemoteLookup::PermissionDenied => {
                anyhow::bail!("No permission to update {remote_path}")
            }
        }
    }

    async fn push_folder_addition(&self, path: &RelPath, report: &mut PassReport) -> Result<()> {
        let parent = path.parent().unwrap_or_else(RelPath::root);
        let parent_id = self.resolve_remote_folder(&parent).await?;
        self.upload_folder_tree(parent_id, path.clone(), report)
            .await
    }

    async fn push_file_addition(&self, path: &RelPath, report: &mut PassReport) -> Result<()> {
        let parent = path.parent().unwrap_or_else(RelPath::root);
        let parent_id = self.resolve_remote_folder(&parent).await?;
        let name = path
            .file_name()
            .context("Cannot upload the root as a file")?;
        let abs = self.mapping.to_local(path);

        let (object, hash) = self.transfer.upload(&abs, &parent_id, name).await?;
        self.index
            .put(&IndexRecord::file(
                path.clone(),
                object.id().clone(),
                object.modified(),
                hash,
            ))
            .await?;
        report.uploaded += 1;
        Ok(())
    }

    /// Resolves the remote folder backing a tracked relative path
    async fn resolve_remote_folder(&self, rel: &RelPath) -> Result<RemoteId> {
        let remote_path = self.mapping.to_remote(rel)?;
        match self.remote.lookup_by_path(&remote_path).await? {
            RemoteLookup::Found(object) if object.is_folder() => Ok(object.id().clone()),
            RemoteLookup::Found(_) => {
                anyhow::bail!("Remote path {remote_path} is not a folder")
            }
            RemoteLookup::NotFound => {
                anyhow::bail!("Remote folder {remote_path} does not exist")
            }
            RemoteLookup::PermissionDenied => {
                anyhow::bail!("No permission to access {remote_path}")
            }
        }
    }

    /// Creates a remote folder and uploads its local contents recursively
    ///
    /// A local tree that vanishes mid-upload rolls back the remote folder
    /// so no half-filed tree is left behind.
    fn upload_folder_tree<'a>(
        &'a self,
        parent_id: RemoteId,
        rel: RelPath,
        report: &'a mut PassReport,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let name = rel
                .file_name()
                .context("Cannot upload the root as a folder")?;
            let created = self.remote.create_folder(&parent_id, name).await?;
            self.index
                .put(&IndexRecord::folder(
                    rel.clone(),
                    created.id().clone(),
                    created.modified(),
                ))
                .await?;
            report.folders_created += 1;
            debug!(path = %rel, "Created remote folder");

            let abs = self.mapping.to_local(&rel);
            let mut entries = match tokio::fs::read_dir(&abs).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %abs.display(), error = %e, "Folder vanished during upload, rolling back");
                    if let Err(rollback) = self.remote.delete_tree(created.id()).await {
                        warn!(error = %rollback, "Rollback of remote folder failed");
                    }
                    self.index.remove_subtree(&rel).await?;
                    return Err(e)
                        .with_context(|| format!("{} vanished during upload", abs.display()));
                }
            };

            while let Some(entry) = entries.next_entry().await.transpose() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        report.record_error(&rel, &anyhow::Error::new(e));
                        break;
                    }
                };
                let name = entry.file_name();
                let Some(name) = name.to_str() else {
                    continue;
                };
                if !IgnoreRules::is_name_syncable(name) {
                    continue;
                }
                let Ok(child_rel) = rel.join(name) else {
                    continue;
                };
                if self.rules.is_ignored(child_rel.as_str()) {
                    continue;
                }

                let file_type = match entry.file_type().await {
                    Ok(t) => t,
                    Err(e) => {
                        report.record_error(&child_rel, &anyhow::Error::new(e));
                        continue;
                    }
                };

                if file_type.is_dir() {
                    self.upload_folder_tree(created.id().clone(), child_rel, report)
                        .await?;
                } else if file_type.is_file() {
                    let child_abs = entry.path();
                    match self.transfer.upload(&child_abs, created.id(), name).await {
                        Ok((object, hash)) => {
                            self.index
                                .put(&IndexRecord::file(
                                    child_rel.clone(),
                                    object.id().clone(),
                                    object.modified(),
                                    hash,
                                ))
                                .await?;
                            report.uploaded += 1;
                        }
                        Err(e) => {
                            report.record_error(&child_rel, &e);
                        }
                    }
                }
            }

            Ok(())
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
