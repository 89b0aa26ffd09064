//! docsync Index - SQLite persistence for sync metadata
//!
//! Implements the `ILocalIndex` port from `docsync-core` using SQLite as
//! the storage backend. One database file per synchronized root, holding
//! the per-item records and the root's change-log cursor. This is a
//! driven (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`IndexPool`] - connection pool with schema bootstrap
//! - [`SqliteLocalIndex`] - the `ILocalIndex` implementation
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use docsync_index::{IndexPool, SqliteLocalIndex};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = IndexPool::new(Path::new("/home/alice/.local/share/docsync/work.db")).await?;
//! let index = SqliteLocalIndex::new(pool.pool().clone());
//! // Use index as ILocalIndex...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;

pub use pool::IndexPool;
pub use repository::SqliteLocalIndex;
