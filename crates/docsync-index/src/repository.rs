//! SQLite implementation of ILocalIndex
//!
//! Concrete index backend for one synchronized root. Handles the mapping
//! between domain types and SQL columns.
//!
//! ## Type Mapping
//!
//! | Domain Type     | SQL Type | Strategy                                  |
//! |-----------------|----------|-------------------------------------------|
//! | RelPath         | TEXT     | `.as_str()` / `RelPath::new()`            |
//! | RemoteId        | TEXT     | `.as_str()` / `RemoteId::new()`           |
//! | ContentHash     | TEXT     | `.as_str()` / `ContentHash::new()`        |
//! | ChangeLogToken  | TEXT     | `.as_str()` / `ChangeLogToken::new()`     |
//! | DateTime<Utc>   | TEXT     | RFC 3339 via `to_rfc3339()` / parse       |
//! | is_folder       | INTEGER  | 0 / 1                                     |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use docsync_core::domain::{ChangeLogToken, ContentHash, FileChecksum, IndexRecord, RelPath, RemoteId};
use docsync_core::ports::{ILocalIndex, IndexError};

/// SQLite-based implementation of the local index port
///
/// All operations go through a connection pool; each statement is a
/// single implicit transaction, which keeps per-path upserts atomic.
pub struct SqliteLocalIndex {
    pool: SqlitePool,
}

impl SqliteLocalIndex {
    /// Creates a new index instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn db_err(e: sqlx::Error) -> IndexError {
    IndexError::QueryFailed(e.to_string())
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, IndexError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| IndexError::Corrupt(format!("Failed to parse datetime '{s}': {e}")))
}

fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, IndexError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

/// Escape LIKE wildcards in a literal path prefix (escape char `\`)
fn escape_like(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Reconstruct an IndexRecord from a database row
fn record_from_row(row: &SqliteRow) -> Result<IndexRecord, IndexError> {
    let path_str: String = row.get("path");
    let remote_id_str: String = row.get("remote_id");
    let is_folder: i64 = row.get("is_folder");
    let server_modified_str: Option<String> = row.get("server_modified");
    let checksum_str: Option<String> = row.get("checksum");

    let path = RelPath::new(path_str)
        .map_err(|e| IndexError::Corrupt(format!("Invalid stored path: {e}")))?;
    let remote_id = RemoteId::new(remote_id_str)
        .map_err(|e| IndexError::Corrupt(format!("Invalid stored remote id: {e}")))?;
    let server_modified = parse_optional_datetime(server_modified_str)?;
    let checksum = checksum_str
        .map(ContentHash::new)
        .transpose()
        .map_err(|e| IndexError::Corrupt(format!("Invalid stored checksum: {e}")))?;

    Ok(IndexRecord {
        path,
        remote_id,
        is_folder: is_folder != 0,
        server_modified,
        checksum,
    })
}

// ============================================================================
// ILocalIndex implementation
// ============================================================================

#[async_trait]
impl ILocalIndex for SqliteLocalIndex {
    async fn get(&self, path: &RelPath) -> Result<Option<IndexRecord>, IndexError> {
        let row = sqlx::query(
            "SELECT path, remote_id, is_folder, server_modified, checksum
             FROM index_records WHERE path = ?",
        )
        .bind(path.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn put(&self, record: &IndexRecord) -> Result<(), IndexError> {
        sqlx::query(
            "INSERT INTO index_records (path, remote_id, is_folder, server_modified, checksum)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(path) DO UPDATE SET
                 remote_id = excluded.remote_id,
                 is_folder = excluded.is_folder,
                 server_modified = excluded.server_modified,
                 checksum = excluded.checksum",
        )
        .bind(record.path.as_str())
        .bind(record.remote_id.as_str())
        .bind(i64::from(record.is_folder))
        .bind(record.server_modified.map(|dt| dt.to_rfc3339()))
        .bind(record.checksum.as_ref().map(|h| h.as_str().to_string()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        tracing::debug!(path = %record.path, "Index record upserted");
        Ok(())
    }

    async fn remove(&self, path: &RelPath) -> Result<(), IndexError> {
        sqlx::query("DELETE FROM index_records WHERE path = ?")
            .bind(path.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn remove_subtree(&self, path: &RelPath) -> Result<(), IndexError> {
        if path.is_root() {
            sqlx::query("DELETE FROM index_records")
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
            return Ok(());
        }

        // Segment-aware: match the path itself and anything under
        // "<path>/", so removing "foo" leaves "foo2/x" alone.
        let pattern = format!("{}/%", escape_like(path.as_str()));
        sqlx::query("DELETE FROM index_records WHERE path = ? OR path LIKE ? ESCAPE '\\'")
            .bind(path.as_str())
            .bind(pattern)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        tracing::debug!(path = %path, "Index subtree removed");
        Ok(())
    }

    async fn list_folders(&self) -> Result<Vec<RelPath>, IndexError> {
        let rows = sqlx::query(
            "SELECT path FROM index_records WHERE is_folder = 1 ORDER BY path",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let path_str: String = row.get("path");
                RelPath::new(path_str)
                    .map_err(|e| IndexError::Corrupt(format!("Invalid stored path: {e}")))
            })
            .collect()
    }

    async fn list_files_with_checksum(&self) -> Result<Vec<FileChecksum>, IndexError> {
        let rows = sqlx::query(
            "SELECT path, checksum, server_modified
             FROM index_records
             WHERE is_folder = 0 AND checksum IS NOT NULL
             ORDER BY path",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let path_str: String = row.get("path");
                let checksum_str: String = row.get("checksum");
                let server_modified_str: Option<String> = row.get("server_modified");

                Ok(FileChecksum {
                    path: RelPath::new(path_str)
                        .map_err(|e| IndexError::Corrupt(format!("Invalid stored path: {e}")))?,
                    checksum: ContentHash::new(checksum_str).map_err(|e| {
                        IndexError::Corrupt(format!("Invalid stored checksum: {e}"))
                    })?,
                    server_modified: parse_optional_datetime(server_modified_str)?,
                })
            })
            .collect()
    }

    async fn find_by_remote_id(&self, id: &RemoteId) -> Result<Vec<IndexRecord>, IndexError> {
        let rows = sqlx::query(
            "SELECT path, remote_id, is_folder, server_modified, checksum
             FROM index_records WHERE remote_id = ? ORDER BY path",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(record_from_row).collect()
    }

    async fn list_all(&self) -> Result<Vec<IndexRecord>, IndexError> {
        let rows = sqlx::query(
            "SELECT path, remote_id, is_folder, server_modified, checksum
             FROM index_records ORDER BY path",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(record_from_row).collect()
    }

    async fn change_log_token(&self) -> Result<Option<ChangeLogToken>, IndexError> {
        let row = sqlx::query("SELECT token FROM change_log_cursor WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => {
                let token_str: String = row.get("token");
                ChangeLogToken::new(token_str)
                    .map(Some)
                    .map_err(|e| IndexError::Corrupt(format!("Invalid stored token: {e}")))
            }
            None => Ok(None),
        }
    }

    async fn set_change_log_token(&self, token: &ChangeLogToken) -> Result<(), IndexError> {
        sqlx::query(
            "INSERT INTO change_log_cursor (id, token) VALUES (1, ?)
             ON CONFLICT(id) DO UPDATE SET token = excluded.token",
        )
        .bind(token.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        tracing::debug!(token = %token, "Change-log token persisted");
        Ok(())
    }

    async fn count(&self) -> Result<u64, IndexError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM index_records")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        let n: i64 = row.get("n");
        Ok(n as u64)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IndexPool;

    async fn index() -> SqliteLocalIndex {
        let pool = IndexPool::in_memory().await.unwrap();
        SqliteLocalIndex::new(pool.pool().clone())
    }

    fn rel(s: &str) -> RelPath {
        RelPath::new(s).unwrap()
    }

    fn file_record(path: &str, remote_id: &str, fill: u8) -> IndexRecord {
        IndexRecord::file(
            rel(path),
            RemoteId::new(remote_id).unwrap(),
            Some(Utc::now()),
            ContentHash::from_digest(&[fill; 32]),
        )
    }

    fn folder_record(path: &str, remote_id: &str) -> IndexRecord {
        IndexRecord::folder(rel(path), RemoteId::new(remote_id).unwrap(), None)
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let idx = index().await;
        assert!(idx.get(&rel("nope.txt")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let idx = index().await;
        let rec = file_record("docs/a.txt", "id-1", 1);
        idx.put(&rec).await.unwrap();

        let got = idx.get(&rel("docs/a.txt")).await.unwrap().unwrap();
        assert_eq!(got.path, rec.path);
        assert_eq!(got.remote_id, rec.remote_id);
        assert_eq!(got.checksum, rec.checksum);
        assert!(!got.is_folder);
        // RFC 3339 round-trip preserves the instant.
        assert_eq!(
            got.server_modified.map(|dt| dt.timestamp()),
            rec.server_modified.map(|dt| dt.timestamp())
        );
    }

    #[tokio::test]
    async fn test_put_is_idempotent_upsert() {
        let idx = index().await;
        let mut rec = file_record("a.txt", "id-1", 1);
        idx.put(&rec).await.unwrap();
        idx.put(&rec).await.unwrap();
        assert_eq!(idx.count().await.unwrap(), 1);

        rec.checksum = Some(ContentHash::from_digest(&[9u8; 32]));
        idx.put(&rec).await.unwrap();
        let got = idx.get(&rel("a.txt")).await.unwrap().unwrap();
        assert_eq!(got.checksum, rec.checksum);
        assert_eq!(idx.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let idx = index().await;
        idx.put(&file_record("a.txt", "id-1", 1)).await.unwrap();
        idx.remove(&rel("a.txt")).await.unwrap();
        assert!(idx.get(&rel("a.txt")).await.unwrap().is_none());

        // Removing an absent path is a no-op.
        idx.remove(&rel("a.txt")).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_subtree_is_segment_aware() {
        let idx = index().await;
        idx.put(&folder_record("foo", "f1")).await.unwrap();
        idx.put(&file_record("foo/a.txt", "d1", 1)).await.unwrap();
        idx.put(&folder_record("foo/bar", "f2")).await.unwrap();
        idx.put(&file_record("foo2/b.txt", "d2", 2)).await.unwrap();

        idx.remove_subtree(&rel("foo")).await.unwrap();

        assert!(idx.get(&rel("foo")).await.unwrap().is_none());
        assert!(idx.get(&rel("foo/a.txt")).await.unwrap().is_none());
        assert!(idx.get(&rel("foo/bar")).await.unwrap().is_none());
        assert!(idx.get(&rel("foo2/b.txt")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_subtree_root_clears_everything() {
        let idx = index().await;
        idx.put(&folder_record("a", "f1")).await.unwrap();
        idx.put(&file_record("b.txt", "d1", 1)).await.unwrap();

        idx.remove_subtree(&RelPath::root()).await.unwrap();
        assert_eq!(idx.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_subtree_with_like_wildcards_in_path() {
        let idx = index().await;
        idx.put(&folder_record("100%", "f1")).await.unwrap();
        idx.put(&file_record("100%/a.txt", "d1", 1)).await.unwrap();
        idx.put(&file_record("100x/b.txt", "d2", 2)).await.unwrap();

        idx.remove_subtree(&rel("100%")).await.unwrap();

        assert!(idx.get(&rel("100%/a.txt")).await.unwrap().is_none());
        assert!(idx.get(&rel("100x/b.txt")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_folders_and_files() {
        let idx = index().await;
        idx.put(&folder_record("docs", "f1")).await.unwrap();
        idx.put(&folder_record("docs/sub", "f2")).await.unwrap();
        idx.put(&file_record("docs/a.txt", "d1", 1)).await.unwrap();

        let folders = idx.list_folders().await.unwrap();
        assert_eq!(folders, vec![rel("docs"), rel("docs/sub")]);

        let files = idx.list_files_with_checksum().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, rel("docs/a.txt"));
    }

    #[tokio::test]
    async fn test_find_by_remote_id() {
        let idx = index().await;
        idx.put(&file_record("a.txt", "shared", 1)).await.unwrap();
        idx.put(&file_record("copy/a.txt", "shared", 1)).await.unwrap();
        idx.put(&file_record("b.txt", "other", 2)).await.unwrap();

        let hits = idx
            .find_by_remote_id(&RemoteId::new("shared").unwrap())
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|r| r.remote_id.as_str() == "shared"));
    }

    #[tokio::test]
    async fn test_change_log_token_cursor() {
        let idx = index().await;
        assert!(idx.change_log_token().await.unwrap().is_none());

        let t1 = ChangeLogToken::new("100").unwrap();
        idx.set_change_log_token(&t1).await.unwrap();
        assert_eq!(idx.change_log_token().await.unwrap(), Some(t1));

        // Overwrites the singleton row.
        let t2 = ChangeLogToken::new("250").unwrap();
        idx.set_change_log_token(&t2).await.unwrap();
        assert_eq!(idx.change_log_token().await.unwrap(), Some(t2));
    }
}
