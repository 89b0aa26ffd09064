//! Database connection pool management
//!
//! Wrapper around SQLx's SqlitePool with:
//! - Automatic directory creation for database files
//! - WAL journal mode for concurrent reads
//! - Schema bootstrap on first connection
//! - In-memory mode for testing

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use docsync_core::ports::IndexError;

/// Manages a pool of SQLite connections for one root's index database
///
/// The pool is configured with WAL journal mode, a small connection
/// limit (the index is owned by a single orchestrator per root), and a
/// busy timeout to ride out write contention.
pub struct IndexPool {
    pool: SqlitePool,
}

impl IndexPool {
    /// Creates a new pool connected to the specified file
    ///
    /// Creates parent directories and the database file as needed, then
    /// runs the schema bootstrap.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::ConnectionFailed` if the connection cannot be
    /// established, or `IndexError::QueryFailed` if the schema bootstrap
    /// fails.
    pub async fn new(db_path: &Path) -> Result<Self, IndexError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                IndexError::ConnectionFailed(format!(
                    "Failed to create index directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                IndexError::ConnectionFailed(format!(
                    "Failed to open index database at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        Self::bootstrap_schema(&pool).await?;

        tracing::info!(path = %db_path.display(), "Index database opened");

        Ok(Self { pool })
    }

    /// Creates an in-memory pool for testing
    ///
    /// Uses a single connection so the data survives across queries
    /// (SQLite in-memory databases are per-connection).
    ///
    /// # Errors
    ///
    /// Returns `IndexError::ConnectionFailed` if the connection cannot be
    /// established.
    pub async fn in_memory() -> Result<Self, IndexError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                IndexError::ConnectionFailed(format!("Failed to create in-memory index: {e}"))
            })?;

        Self::bootstrap_schema(&pool).await?;

        tracing::debug!("In-memory index initialized");

        Ok(Self { pool })
    }

    /// Returns a reference to the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs the initial schema creation
    async fn bootstrap_schema(pool: &SqlitePool) -> Result<(), IndexError> {
        let schema_sql = include_str!("migrations/20260815_initial.sql");
        sqlx::raw_sql(schema_sql)
            .execute(pool)
            .await
            .map_err(|e| IndexError::QueryFailed(format!("Schema bootstrap failed: {e}")))?;

        tracing::debug!("Index schema ready");
        Ok(())
    }
}
