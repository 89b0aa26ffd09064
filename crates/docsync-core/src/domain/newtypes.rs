//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the paths, identifiers and values the
//! reconciliation engine passes between components. Each newtype validates
//! at construction time so the rest of the engine never sees a malformed
//! path or token.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// Pass identifier
// ============================================================================

/// Identifier for one synchronization pass, used to correlate log output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassId(Uuid);

impl PassId {
    /// Create a new random PassId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PassId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PassId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PassId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid PassId: {e}")))
    }
}

// ============================================================================
// Path types
// ============================================================================

/// A normalized path relative to a synchronized root
///
/// The canonical key form used by the local index and the change
/// detector: forward slashes, no leading or trailing slash, no empty,
/// `.` or `..` components. The root itself is represented by the empty
/// relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelPath(String);

impl RelPath {
    /// Create a new RelPath from an already slash-delimited string
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` for absolute paths, backslashes,
    /// empty components, or traversal components.
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();

        if path.is_empty() {
            return Ok(Self(path));
        }
        if path.starts_with('/') || path.ends_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "Relative path must not start or end with '/': {path}"
            )));
        }
        if path.contains('\\') {
            return Err(DomainError::InvalidPath(format!(
                "Relative path must use forward slashes: {path}"
            )));
        }
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(DomainError::InvalidPath(format!(
                    "Invalid path segment in: {path}"
                )));
            }
        }

        Ok(Self(path))
    }

    /// The root of the synchronized tree (empty relative path)
    #[must_use]
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Whether this is the root (empty) path
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append a single name segment
    ///
    /// # Errors
    /// Returns error if the segment is empty or contains a separator
    pub fn join(&self, segment: &str) -> Result<Self, DomainError> {
        if segment.is_empty() || segment.contains('/') || segment.contains('\\') {
            return Err(DomainError::InvalidPath(format!(
                "Invalid path segment: {segment}"
            )));
        }
        if segment == "." || segment == ".." {
            return Err(DomainError::InvalidPath(format!(
                "Invalid path segment: {segment}"
            )));
        }

        if self.0.is_empty() {
            Self::new(segment.to_string())
        } else {
            Self::new(format!("{}/{segment}", self.0))
        }
    }

    /// Parent path, or `None` for the root and for top-level entries'
    /// parent being the root
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Final name segment, or `None` for the root
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        if self.0.is_empty() {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// Whether `self` is a strict descendant of `other`
    ///
    /// Segment-aware: `"foo2/x"` is not a descendant of `"foo"`.
    #[must_use]
    pub fn is_descendant_of(&self, other: &RelPath) -> bool {
        if other.0.is_empty() {
            return !self.0.is_empty();
        }
        self.0.len() > other.0.len()
            && self.0.starts_with(&other.0)
            && self.0.as_bytes()[other.0.len()] == b'/'
    }

    /// Interpret the relative path as a native filesystem path fragment
    #[must_use]
    pub fn to_fs_path(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }

    /// Build a RelPath from native filesystem components
    ///
    /// # Errors
    /// Returns error if the path is absolute or contains traversal
    /// components.
    pub fn from_fs_path(path: &Path) -> Result<Self, DomainError> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(c) => {
                    let s = c.to_str().ok_or_else(|| {
                        DomainError::InvalidPath(format!(
                            "Path is not valid UTF-8: {}",
                            path.display()
                        ))
                    })?;
                    segments.push(s);
                }
                Component::CurDir => {}
                _ => {
                    return Err(DomainError::InvalidPath(format!(
                        "Path must be plain relative: {}",
                        path.display()
                    )));
                }
            }
        }
        Self::new(segments.join("/"))
    }
}

impl Display for RelPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RelPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RelPath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RelPath> for String {
    fn from(path: RelPath) -> Self {
        path.0
    }
}

/// A path in the remote repository's namespace (must start with /)
///
/// Example: "/User Homes/alice/projects"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemotePath(String);

impl RemotePath {
    /// Create a new RemotePath
    ///
    /// # Errors
    /// Returns error if the path does not start with '/', contains double
    /// slashes, or traversal components.
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();

        if !path.starts_with('/') {
            return Err(DomainError::InvalidRemotePath(format!(
                "Remote path must start with '/': {path}"
            )));
        }
        if path.len() > 1 && path.ends_with('/') {
            return Err(DomainError::InvalidRemotePath(format!(
                "Remote path must not end with '/': {path}"
            )));
        }
        if path.contains("//") {
            return Err(DomainError::InvalidRemotePath(format!(
                "Remote path contains double slashes: {path}"
            )));
        }
        if path.split('/').any(|seg| seg == "." || seg == "..") {
            return Err(DomainError::InvalidRemotePath(format!(
                "Remote path contains traversal: {path}"
            )));
        }

        Ok(Self(path))
    }

    /// Create the root path "/"
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join a single name segment
    ///
    /// # Errors
    /// Returns error if the segment is empty or contains a separator
    pub fn join(&self, segment: &str) -> Result<Self, DomainError> {
        if segment.is_empty() || segment.contains('/') {
            return Err(DomainError::InvalidRemotePath(format!(
                "Invalid path segment: {segment}"
            )));
        }

        let new_path = if self.0 == "/" {
            format!("/{segment}")
        } else {
            format!("{}/{segment}", self.0)
        };
        Self::new(new_path)
    }

    /// Append a relative path below this one
    ///
    /// # Errors
    /// Returns error if a resulting path would be malformed
    pub fn join_rel(&self, rel: &RelPath) -> Result<Self, DomainError> {
        if rel.is_root() {
            return Ok(self.clone());
        }
        let mut current = self.clone();
        for segment in rel.as_str().split('/') {
            current = current.join(segment)?;
        }
        Ok(current)
    }

    /// Get the parent path
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0 == "/" {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Get the final name segment
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        if self.0 == "/" {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// The path relative to `root`, if this path lies under it
    ///
    /// Returns `None` when this path is not the root itself nor a
    /// descendant of it. Segment-aware, like [`RelPath::is_descendant_of`].
    #[must_use]
    pub fn strip_root(&self, root: &RemotePath) -> Option<RelPath> {
        if self == root {
            return Some(RelPath::root());
        }
        let prefix = if root.0 == "/" {
            "/".to_string()
        } else {
            format!("{}/", root.0)
        };
        let rest = self.0.strip_prefix(&prefix)?;
        RelPath::new(rest.to_string()).ok()
    }
}

impl Display for RemotePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemotePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemotePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemotePath> for String {
    fn from(path: RemotePath) -> Self {
        path.0
    }
}

// ============================================================================
// Remote repository value types
// ============================================================================

/// Opaque identifier of an object in the remote repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains control characters
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }
        if id.chars().any(char::is_control) {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains control characters: {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

/// SHA-256 content hash, lowercase hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Length of a hex-encoded SHA-256 digest
    const HEX_LEN: usize = 64;

    /// Create a new ContentHash
    ///
    /// # Errors
    /// Returns error if the string is not 64 lowercase hex characters
    pub fn new(hash: impl Into<String>) -> Result<Self, DomainError> {
        let hash = hash.into();
        if hash.len() != Self::HEX_LEN {
            return Err(DomainError::InvalidHash(format!(
                "Hash has wrong length: expected {} hex chars, got {}",
                Self::HEX_LEN,
                hash.len()
            )));
        }
        if !hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(DomainError::InvalidHash(format!(
                "Hash is not lowercase hex: {hash}"
            )));
        }
        Ok(Self(hash))
    }

    /// Build a ContentHash from a raw 32-byte digest
    #[must_use]
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        let mut hex = String::with_capacity(Self::HEX_LEN);
        for byte in digest {
            use fmt::Write;
            // Writing to a String cannot fail.
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ContentHash {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

/// Opaque cursor into the remote repository's change history
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChangeLogToken(String);

impl ChangeLogToken {
    /// Create a new ChangeLogToken
    ///
    /// # Errors
    /// Returns error if the token is empty
    pub fn new(token: impl Into<String>) -> Result<Self, DomainError> {
        let token = token.into();
        if token.is_empty() {
            return Err(DomainError::InvalidToken(
                "Change-log token cannot be empty".to_string(),
            ));
        }
        Ok(Self(token))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChangeLogToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChangeLogToken {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ChangeLogToken {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ChangeLogToken> for String {
    fn from(token: ChangeLogToken) -> Self {
        token.0
    }
}

// ============================================================================
// Tests
// ============================================================================
