//! Domain error types
//!
//! Validation failures raised when constructing domain values: paths,
//! identifiers, hashes and change-log tokens.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid local path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Path is not within the configured sync root
    #[error("Path not within sync root: {0}")]
    PathNotInSyncRoot(String),

    /// Invalid remote path format
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Remote path is not within the configured remote root
    #[error("Path not within remote root: {0}")]
    PathNotInRemoteRoot(String),

    /// Invalid remote object ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid content hash format (expected lowercase hex SHA-256)
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),

    /// Invalid change-log token
    #[error("Invalid change-log token: {0}")]
    InvalidToken(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}
