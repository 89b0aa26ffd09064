//! Domain types for the reconciliation engine
//!
//! This module contains the pure domain model:
//! - Newtypes for type-safe paths, identifiers, hashes and tokens
//! - Root path mapping between local, relative and remote path spaces
//! - The persisted index record shape
//! - The per-pass change set with descendant pruning
//! - Remote object and change-log event values
//! - Domain-specific error types

pub mod change_set;
pub mod errors;
pub mod index_record;
pub mod mapping;
pub mod newtypes;
pub mod remote;

// Re-export commonly used types
pub use change_set::ChangeSet;
pub use errors::DomainError;
pub use index_record::{FileChecksum, IndexRecord};
pub use mapping::RootMapping;
pub use newtypes::*;
pub use remote::{ChangeKind, RemoteChangeEvent, RemoteObject};
