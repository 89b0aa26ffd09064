//! Root path mapping
//!
//! Translation between the three path spaces of one synchronized root:
//! absolute local filesystem paths, normalized relative paths (the index
//! key space), and remote repository paths. The translation is a pure
//! function of the two configured root prefixes and is reversible.

use std::path::{Path, PathBuf};

use super::errors::DomainError;
use super::newtypes::{RelPath, RemotePath};

/// Path translation for one synchronized root
///
/// Holds the local root directory and the corresponding remote root path.
/// All conversions are deterministic; converting a path to its relative
/// form and back reproduces the original exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootMapping {
    local_root: PathBuf,
    remote_root: RemotePath,
}

impl RootMapping {
    /// Create a new mapping
    ///
    /// # Errors
    /// Returns error if the local root is not absolute
    pub fn new(local_root: PathBuf, remote_root: RemotePath) -> Result<Self, DomainError> {
        if !local_root.is_absolute() {
            return Err(DomainError::InvalidPath(format!(
                "Local root must be absolute: {}",
                local_root.display()
            )));
        }
        Ok(Self {
            local_root,
            remote_root,
        })
    }

    /// The local root directory
    #[must_use]
    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    /// The remote root path
    #[must_use]
    pub fn remote_root(&self) -> &RemotePath {
        &self.remote_root
    }

    /// Absolute local path for a relative path
    #[must_use]
    pub fn to_local(&self, rel: &RelPath) -> PathBuf {
        if rel.is_root() {
            self.local_root.clone()
        } else {
            self.local_root.join(rel.to_fs_path())
        }
    }

    /// Remote path for a relative path
    ///
    /// # Errors
    /// Returns error if a segment is invalid in the remote namespace
    pub fn to_remote(&self, rel: &RelPath) -> Result<RemotePath, DomainError> {
        self.remote_root.join_rel(rel)
    }

    /// Relative path for an absolute local path under this root
    ///
    /// # Errors
    /// Returns `PathNotInSyncRoot` if the path is outside the local root
    pub fn from_local(&self, absolute: &Path) -> Result<RelPath, DomainError> {
        let stripped = absolute.strip_prefix(&self.local_root).map_err(|_| {
            DomainError::PathNotInSyncRoot(format!(
                "{} is not within {}",
                absolute.display(),
                self.local_root.display()
            ))
        })?;
        RelPath::from_fs_path(stripped)
    }

    /// Relative path for a remote path under this root's remote prefix
    ///
    /// # Errors
    /// Returns `PathNotInRemoteRoot` if the path is outside the remote root
    pub fn from_remote(&self, remote: &RemotePath) -> Result<RelPath, DomainError> {
        remote.strip_root(&self.remote_root).ok_or_else(|| {
            DomainError::PathNotInRemoteRoot(format!(
                "{remote} is not within {}",
                self.remote_root
            ))
        })
    }

    /// Whether a remote path lies under this root's remote prefix
    #[must_use]
    pub fn contains_remote(&self, remote: &RemotePath) -> bool {
        remote.strip_root(&self.remote_root).is_some()
    }
}
