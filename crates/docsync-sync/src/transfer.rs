//! Content transfers between the local tree and the remote repository
//!
//! Downloads never write the destination path directly: content is
//! streamed into a sibling temp file (destination name plus the temp
//! suffix) while a SHA-256 digest accumulates over the same bytes, and the
//! temp file is renamed over the destination only after the write
//! completed. A failed transfer leaves no partial file at the destination.
//!
//! Uploads read the source, push it in one call, then re-check that the
//! source still exists; a source that vanished mid-upload rolls the remote
//! document back so neither side keeps a half-truth.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use docsync_core::config::TEMP_SUFFIX;
use docsync_core::domain::{ContentHash, RemoteId, RemoteObject};
use docsync_core::ports::{ActivityScope, IActivityListener, IRemoteRepository};

/// Chunk size for streaming writes and hashing
const CHUNK_SIZE: usize = 8 * 1024;

/// Executes individual content transfers for the reconciler
///
/// Holds the remote session and the activity listener; every public
/// operation is bracketed by an [`ActivityScope`].
pub struct TransferExecutor {
    remote: Arc<dyn IRemoteRepository + Send + Sync>,
    activity: Arc<dyn IActivityListener>,
}

impl TransferExecutor {
    pub fn new(
        remote: Arc<dyn IRemoteRepository + Send + Sync>,
        activity: Arc<dyn IActivityListener>,
    ) -> Self {
        Self { remote, activity }
    }

    /// Downloads a document's content to `dest` atomically
    ///
    /// Returns `Ok(None)` when the server reports no content stream for
    /// the document; the caller must treat that as success without
    /// recording the item. Zero-length content is a normal download and
    /// produces an empty file.
    ///
    /// # Errors
    /// Returns an error if the remote fetch or any local I/O step fails.
    /// On failure the temp file is removed and `dest` is left untouched.
    pub async fn download(&self, document: &RemoteId, dest: &Path) -> Result<Option<ContentHash>> {
        let _scope = ActivityScope::enter(self.activity.clone());

        let content = self
            .remote
            .download(document)
            .await
            .with_context(|| format!("Failed to fetch content of {document}"))?;

        let Some(content) = content else {
            warn!(document = %document, dest = %dest.display(), "Document has no content stream, skipping");
            return Ok(None);
        };

        let hash = self.write_atomically(dest, &content).await?;

        debug!(
            document = %document,
            dest = %dest.display(),
            bytes = content.len(),
            "Downloaded document"
        );

        Ok(Some(hash))
    }

    /// Creates a remote document from a local file
    ///
    /// After the remote create succeeds, verifies the source file still
    /// exists; a file deleted while its content was in flight is rolled
    /// back by deleting the just-created document.
    ///
    /// # Errors
    /// Returns an error if the source cannot be read, the remote create
    /// fails, or the rollback path was taken.
    pub async fn upload(
        &self,
        source: &Path,
        parent: &RemoteId,
        name: &str,
    ) -> Result<(RemoteObject, ContentHash)> {
        let _scope = ActivityScope::enter(self.activity.clone());

        let content = tokio::fs::read(source)
            .await
            .with_context(|| format!("Failed to read {}", source.display()))?;
        let hash = hash_bytes(&content);

        let object = self
            .remote
            .create_document(parent, name, &content)
            .await
            .with_context(|| format!("Failed to create remote document {name}"))?;

        if tokio::fs::metadata(source).await.is_err() {
            warn!(
                source = %source.display(),
                document = %object.id(),
                "Source vanished during upload, rolling back remote document"
            );
            if let Err(e) = self.remote.delete_document(object.id()).await {
                warn!(document = %object.id(), error = %e, "Rollback deletion failed");
            }
            anyhow::bail!("{} vanished during upload", source.display());
        }

        debug!(
            source = %source.display(),
            document = %object.id(),
            bytes = content.len(),
            "Uploaded document"
        );

        Ok((object, hash))
    }

    /// Replaces a remote document's content from a local file
    ///
    /// Returns the server-side modification timestamp when the server
    /// reports one, plus the hash of the uploaded content.
    ///
    /// # Errors
    /// Returns an error if the source cannot be read or the remote call
    /// fails.
    pub async fn update(
        &self,
        source: &Path,
        document: &RemoteId,
    ) -> Result<(Option<DateTime<Utc>>, ContentHash)> {
        let _scope = ActivityScope::enter(self.activity.clone());

        let content = tokio::fs::read(source)
            .await
            .with_context(|| format!("Failed to read {}", source.display()))?;
        let hash = hash_bytes(&content);

        let modified = self
            .remote
            .set_content(document, &content)
            .await
            .with_context(|| format!("Failed to replace content of {document}"))?;

        debug!(
            source = %source.display(),
            document = %document,
            bytes = content.len(),
            "Updated document content"
        );

        Ok((modified, hash))
    }

    /// Streams content into `<dest>.sync.tmp`, hashing as it goes, then
    /// renames over `dest`
    async fn write_atomically(&self, dest: &Path, content: &[u8]) -> Result<ContentHash> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        // A folder occupying the destination name blocks the rename.
        if let Ok(meta) = tokio::fs::metadata(dest).await {
            if meta.is_dir() {
                warn!(dest = %dest.display(), "Removing directory occupying a document path");
                tokio::fs::remove_dir_all(dest)
                    .await
                    .with_context(|| format!("Failed to remove directory {}", dest.display()))?;
            }
        }

        let tmp = temp_path(dest);
        let result = self.write_temp(&tmp, content).await;

        match result {
            Ok(hash) => {
                tokio::fs::rename(&tmp, dest).await.map_err(|e| {
                    let _ = std::fs::remove_file(&tmp);
                    anyhow::Error::new(e)
                        .context(format!("Failed to move temp file into {}", dest.display()))
                })?;
                Ok(hash)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                Err(e)
            }
        }
    }

    async fn write_temp(&self, tmp: &Path, content: &[u8]) -> Result<ContentHash> {
        let mut file = tokio::fs::File::create(tmp)
            .await
            .with_context(|| format!("Failed to create temp file {}", tmp.display()))?;

        let mut hasher = Sha256::new();
        for chunk in content.chunks(CHUNK_SIZE) {
            hasher.update(chunk);
            file.write_all(chunk)
                .await
                .with_context(|| format!("Failed to write temp file {}", tmp.display()))?;
        }
        file.flush()
            .await
            .with_context(|| format!("Failed to flush temp file {}", tmp.display()))?;

        let digest: [u8; 32] = hasher.finalize().into();
        Ok(ContentHash::from_digest(&digest))
    }
}

/// Temp file name next to the destination: `report.pdf` -> `report.pdf.sync.tmp`
fn temp_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// SHA-256 over a byte slice, chunked like the streaming paths
#[must_use]
pub fn hash_bytes(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    for chunk in content.chunks(CHUNK_SIZE) {
        hasher.update(chunk);
    }
    let digest: [u8; 32] = hasher.finalize().into();
    ContentHash::from_digest(&digest)
}

/// SHA-256 of a file's current content
///
/// # Errors
/// Returns an error if the file cannot be read.
pub async fn hash_file(path: &Path) -> Result<ContentHash> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(hash_bytes(&content))
}
