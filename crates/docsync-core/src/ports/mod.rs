//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the trait boundaries the engine depends on; their
//! implementations live in adapter crates or with external collaborators.
//!
//! - [`IRemoteRepository`] - session to the remote document repository
//! - [`ILocalIndex`] - persistent per-root sync metadata store
//! - [`IActivityListener`] - start/stop reporting for external consumers

pub mod activity;
pub mod local_index;
pub mod remote_repository;

pub use activity::{ActivityScope, IActivityListener, NullActivityListener};
pub use local_index::{ILocalIndex, IndexError};
pub use remote_repository::{ChangeLogPage, IRemoteRepository, RemoteError, RemoteLookup};
