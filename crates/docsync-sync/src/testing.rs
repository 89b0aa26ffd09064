//! Test doubles for the reconciliation engine
//!
//! [`InMemoryRemote`] is a small in-process document repository backing
//! the engine tests: a path-keyed node map plus an append-only change
//! log. Tokens are positions in that log, so token equality, paging and
//! expiry behave like a real server without any I/O.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use docsync_core::domain::{
    ChangeKind, ChangeLogToken, RemoteChangeEvent, RemoteId, RemoteObject, RemotePath,
};
use docsync_core::ports::{ChangeLogPage, IRemoteRepository, RemoteError, RemoteLookup};

struct Node {
    id: RemoteId,
    is_folder: bool,
    /// Document content; `None` on a document models a missing content
    /// stream. Folders never carry content.
    content: Option<Vec<u8>>,
    modified: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    /// Full remote path -> node. The root "/" is always present.
    nodes: BTreeMap<String, Node>,
    events: Vec<RemoteChangeEvent>,
    next_id: u64,
    denied_paths: Vec<String>,
}

/// In-memory stand-in for a remote document repository
pub struct InMemoryRemote {
    state: Mutex<State>,
    supports_change_log: bool,
    fail_downloads: AtomicBool,
    /// Tokens strictly below this log position are reported expired
    token_floor: AtomicU64,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::build(true)
    }

    /// A repository that does not advertise change-log support
    pub fn without_change_log() -> Self {
        Self::build(false)
    }

    fn build(supports_change_log: bool) -> Self {
        let mut state = State::default();
        state.nodes.insert(
            "/".to_string(),
            Node {
                id: RemoteId::new("root").unwrap(),
                is_folder: true,
                content: None,
                modified: Utc::now(),
            },
        );
        Self {
            state: Mutex::new(state),
            supports_change_log,
            fail_downloads: AtomicBool::new(false),
            token_floor: AtomicU64::new(0),
        }
    }

    // ------------------------------------------------------------------
    // Test-side controls
    // ------------------------------------------------------------------

    pub async fn root_id(&self) -> RemoteId {
        self.state.lock().unwrap().nodes["/"].id.clone()
    }

    /// Creates a folder (and any missing ancestors), appending Created events
    pub async fn seed_folder(&self, path: &str) -> RemoteId {
        let mut state = self.state.lock().unwrap();
        ensure_folder(&mut state, path)
    }

    /// Creates a document with content, creating missing ancestors
    pub async fn seed_document(&self, path: &str, content: &[u8]) -> RemoteId {
        self.seed(path, Some(content.to_vec())).await
    }

    /// Creates a document that reports no content stream
    pub async fn seed_document_without_content(&self, path: &str) -> RemoteId {
        self.seed(path, None).await
    }

    /// Creates a document the change log never reports, as with a tree
    /// filed into scope where only the enclosing folder is logged
    pub async fn seed_document_without_event(&self, path: &str, content: &[u8]) -> RemoteId {
        let mut state = self.state.lock().unwrap();
        if let Some(parent) = parent_of(path) {
            ensure_folder(&mut state, &parent);
        }
        let id = next_id(&mut state);
        state.nodes.insert(
            path.to_string(),
            Node {
                id: id.clone(),
                is_folder: false,
                content: Some(content.to_vec()),
                modified: Utc::now(),
            },
        );
        id
    }

    /// Removes a path but logs an Updated event for it, as a feed
    /// interleaving an update with a concurrent removal would
    pub async fn vanish_with_update_event(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        let node = state.nodes.remove(path).expect("path must exist");
        state.events.push(RemoteChangeEvent {
            id: node.id,
            kind: ChangeKind::Updated,
        });
    }

    async fn seed(&self, path: &str, content: Option<Vec<u8>>) -> RemoteId {
        let mut state = self.state.lock().unwrap();
        if let Some(parent) = parent_of(path) {
            ensure_folder(&mut state, &parent);
        }
        let id = next_id(&mut state);
        state.nodes.insert(
            path.to_string(),
            Node {
                id: id.clone(),
                is_folder: false,
                content,
                modified: Utc::now(),
            },
        );
        state.events.push(RemoteChangeEvent {
            id: id.clone(),
            kind: ChangeKind::Created,
        });
        id
    }

    /// Replaces a document's content server-side, appending an Updated event
    pub async fn touch_document(&self, path: &str, content: &[u8]) {
        let mut state = self.state.lock().unwrap();
        let id = {
            let node = state.nodes.get_mut(path).expect("document must exist");
            node.content = Some(content.to_vec());
            node.modified = Utc::now();
            node.id.clone()
        };
        state.events.push(RemoteChangeEvent {
            id,
            kind: ChangeKind::Updated,
        });
    }

    /// Deletes a path (and descendants), appending Deleted events
    pub async fn remove_path(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let doomed: Vec<String> = state
            .nodes
            .keys()
            .filter(|p| p.as_str() == path || p.starts_with(&prefix))
            .cloned()
            .collect();
        for p in doomed {
            if let Some(node) = state.nodes.remove(&p) {
                state.events.push(RemoteChangeEvent {
                    id: node.id,
                    kind: ChangeKind::Deleted,
                });
            }
        }
    }

    /// Moves a document to a new path, appending an Updated event
    pub async fn move_path(&self, from: &str, to: &str) {
        let mut state = self.state.lock().unwrap();
        let node = state.nodes.remove(from).expect("source must exist");
        let id = node.id.clone();
        if let Some(parent) = parent_of(to) {
            ensure_folder(&mut state, &parent);
        }
        state.nodes.insert(to.to_string(), node);
        state.events.push(RemoteChangeEvent {
            id,
            kind: ChangeKind::Updated,
        });
    }

    /// Marks a path as unreadable for the current session
    pub async fn deny_path(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .denied_paths
            .push(path.to_string());
    }

    pub fn fail_downloads(&self, fail: bool) {
        self.fail_downloads.store(fail, Ordering::SeqCst);
    }

    /// Invalidates every token handed out so far
    pub async fn expire_tokens(&self) {
        let len = self.state.lock().unwrap().events.len() as u64;
        self.token_floor.store(len, Ordering::SeqCst);
    }

    pub async fn content_at(&self, path: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .nodes
            .get(path)
            .and_then(|n| n.content.clone())
    }

    pub async fn exists(&self, path: &str) -> bool {
        self.state.lock().unwrap().nodes.contains_key(path)
    }

    pub async fn event_count(&self) -> usize {
        self.state.lock().unwrap().events.len()
    }

    fn object_at(state: &State, path: &str) -> Option<RemoteObject> {
        let node = state.nodes.get(path)?;
        Some(make_object(path, node))
    }

    fn path_of(state: &State, id: &RemoteId) -> Option<String> {
        state
            .nodes
            .iter()
            .find(|(_, node)| &node.id == id)
            .map(|(path, _)| path.clone())
    }
}

fn next_id(state: &mut State) -> RemoteId {
    state.next_id += 1;
    RemoteId::new(format!("obj-{}", state.next_id)).unwrap()
}

fn parent_of(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

fn ensure_folder(state: &mut State, path: &str) -> RemoteId {
    if let Some(node) = state.nodes.get(path) {
        return node.id.clone();
    }
    if let Some(parent) = parent_of(path) {
        ensure_folder(state, &parent);
    }
    let id = next_id(state);
    state.nodes.insert(
        path.to_string(),
        Node {
            id: id.clone(),
            is_folder: true,
            content: None,
            modified: Utc::now(),
        },
    );
    state.events.push(RemoteChangeEvent {
        id: id.clone(),
        kind: ChangeKind::Created,
    });
    id
}

fn name_of(path: &str) -> String {
    path.rsplit('/').next().unwrap_or_default().to_string()
}

fn make_object(path: &str, node: &Node) -> RemoteObject {
    let remote_path = RemotePath::new(path.to_string()).unwrap();
    if node.is_folder {
        RemoteObject::Folder {
            id: node.id.clone(),
            name: if path == "/" {
                String::new()
            } else {
                name_of(path)
            },
            path: remote_path,
            modified: Some(node.modified),
        }
    } else {
        RemoteObject::Document {
            id: node.id.clone(),
            name: name_of(path),
            paths: vec![remote_path],
            content_length: node.content.as_ref().map(|c| c.len() as u64),
            modified: Some(node.modified),
        }
    }
}

#[async_trait]
impl IRemoteRepository for InMemoryRemote {
    async fn supports_change_log(&self) -> Result<bool, RemoteError> {
        Ok(self.supports_change_log)
    }

    async fn change_log_token(&self) -> Result<ChangeLogToken, RemoteError> {
        let len = self.state.lock().unwrap().events.len();
        Ok(ChangeLogToken::new(len.to_string()).unwrap())
    }

    async fn content_changes(
        &self,
        since: &ChangeLogToken,
        page_size: u32,
    ) -> Result<ChangeLogPage, RemoteError> {
        let position: usize = since
            .as_str()
            .parse()
            .map_err(|_| RemoteError::InvalidToken)?;
        if (position as u64) < self.token_floor.load(Ordering::SeqCst) {
            return Err(RemoteError::InvalidToken);
        }
        let state = self.state.lock().unwrap();
        if position > state.events.len() {
            return Err(RemoteError::InvalidToken);
        }
        let end = (position + page_size as usize).min(state.events.len());
        Ok(ChangeLogPage {
            events: state.events[position..end].to_vec(),
            next_token: ChangeLogToken::new(end.to_string()).unwrap(),
            has_more: end < state.events.len(),
        })
    }

    async fn lookup_by_path(&self, path: &RemotePath) -> Result<RemoteLookup, RemoteError> {
        let state = self.state.lock().unwrap();
        if state.denied_paths.iter().any(|p| p == path.as_str()) {
            return Ok(RemoteLookup::PermissionDenied);
        }
        Ok(match Self::object_at(&state, path.as_str()) {
            Some(object) => RemoteLookup::Found(object),
            None => RemoteLookup::NotFound,
        })
    }

    async fn lookup_by_id(&self, id: &RemoteId) -> Result<RemoteLookup, RemoteError> {
        let state = self.state.lock().unwrap();
        let Some(path) = Self::path_of(&state, id) else {
            return Ok(RemoteLookup::NotFound);
        };
        if state.denied_paths.iter().any(|p| p == &path) {
            return Ok(RemoteLookup::PermissionDenied);
        }
        Ok(RemoteLookup::Found(
            Self::object_at(&state, &path).expect("path resolved above"),
        ))
    }

    async fn list_children(&self, folder: &RemoteId) -> Result<Vec<RemoteObject>, RemoteError> {
        let state = self.state.lock().unwrap();
        let Some(folder_path) = Self::path_of(&state, folder) else {
            return Err(RemoteError::NotFound(folder.to_string()));
        };
        let prefix = if folder_path == "/" {
            "/".to_string()
        } else {
            format!("{folder_path}/")
        };
        Ok(state
            .nodes
            .iter()
            .filter(|(path, _)| {
                path.as_str() != folder_path
                    && path.starts_with(&prefix)
                    && !path[prefix.len()..].contains('/')
            })
            .map(|(path, node)| make_object(path, node))
            .collect())
    }

    async fn download(&self, document: &RemoteId) -> Result<Option<Vec<u8>>, RemoteError> {
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(RemoteError::Transient("injected download failure".into()));
        }
        let state = self.state.lock().unwrap();
        let Some(path) = Self::path_of(&state, document) else {
            return Err(RemoteError::NotFound(document.to_string()));
        };
        if state.denied_paths.iter().any(|p| p == &path) {
            return Err(RemoteError::PermissionDenied(path.clone()));
        }
        Ok(state.nodes[&path].content.clone())
    }

    async fn create_folder(
        &self,
        parent: &RemoteId,
        name: &str,
    ) -> Result<RemoteObject, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let Some(parent_path) = Self::path_of(&state, parent) else {
            return Err(RemoteError::NotFound(parent.to_string()));
        };
        let path = join_path(&parent_path, name);
        ensure_folder(&mut state, &path);
        Ok(Self::object_at(&state, &path).expect("just created"))
    }

    async fn create_document(
        &self,
        parent: &RemoteId,
        name: &str,
        content: &[u8],
    ) -> Result<RemoteObject, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let Some(parent_path) = Self::path_of(&state, parent) else {
            return Err(RemoteError::NotFound(parent.to_string()));
        };
        let path = join_path(&parent_path, name);
        let id = next_id(&mut state);
        state.nodes.insert(
            path.clone(),
            Node {
                id: id.clone(),
                is_folder: false,
                content: Some(content.to_vec()),
                modified: Utc::now(),
            },
        );
        state.events.push(RemoteChangeEvent {
            id,
            kind: ChangeKind::Created,
        });
        Ok(Self::object_at(&state, &path).expect("just created"))
    }

    async fn set_content(
        &self,
        document: &RemoteId,
        content: &[u8],
    ) -> Result<Option<DateTime<Utc>>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let Some(path) = Self::path_of(&state, document) else {
            return Err(RemoteError::NotFound(document.to_string()));
        };
        let modified = Utc::now();
        if let Some(node) = state.nodes.get_mut(&path) {
            node.content = Some(content.to_vec());
            node.modified = modified;
        }
        state.events.push(RemoteChangeEvent {
            id: document.clone(),
            kind: ChangeKind::Updated,
        });
        Ok(Some(modified))
    }

    async fn delete_document(&self, document: &RemoteId) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        let Some(path) = Self::path_of(&state, document) else {
            return Err(RemoteError::NotFound(document.to_string()));
        };
        state.nodes.remove(&path);
        state.events.push(RemoteChangeEvent {
            id: document.clone(),
            kind: ChangeKind::Deleted,
        });
        Ok(())
    }

    async fn delete_tree(&self, folder: &RemoteId) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        let Some(folder_path) = Self::path_of(&state, folder) else {
            return Err(RemoteError::NotFound(folder.to_string()));
        };
        let prefix = format!("{folder_path}/");
        let doomed: Vec<String> = state
            .nodes
            .keys()
            .filter(|p| p.as_str() == folder_path || p.starts_with(&prefix))
            .cloned()
            .collect();
        for p in doomed {
            if let Some(node) = state.nodes.remove(&p) {
                state.events.push(RemoteChangeEvent {
                    id: node.id,
                    kind: ChangeKind::Deleted,
                });
            }
        }
        Ok(())
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}
