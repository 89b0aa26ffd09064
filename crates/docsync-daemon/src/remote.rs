//! Remote session wiring
//!
//! The protocol client behind
//! [`IRemoteRepository`](docsync_core::ports::IRemoteRepository) is an
//! external collaborator: deployments link their repository's client crate
//! and register it here. The daemon itself stays protocol-agnostic; every
//! other component only sees the port.

use std::sync::Arc;

use anyhow::Result;

use docsync_core::config::RootConfig;
use docsync_core::ports::IRemoteRepository;

/// Opens the remote session for one configured root
///
/// # Errors
/// Returns an error when no adapter is registered for the root or the
/// session cannot be established.
pub fn connect(root: &RootConfig) -> Result<Arc<dyn IRemoteRepository + Send + Sync>> {
    anyhow::bail!(
        "No remote repository adapter is registered for root '{}' ({}); \
         link a client crate and wire it up in docsync_daemon::remote::connect",
        root.name,
        root.remote_root,
    )
}
