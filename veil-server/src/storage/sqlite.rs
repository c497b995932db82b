//! SQLite storage backend for veil-server.

use super::{ModeRecord, ModeStore};
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use veil_types::EncryptionMode;

/// Primary key of the singleton row.
const SETTING_ID: i64 = 1;

/// SQLite-based mode store.
///
/// Uses WAL mode for concurrent reads/writes.
#[derive(Clone)]
pub struct SqliteModeStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteModeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteModeStore")
            .field("connections", &self.pool.size())
            .finish()
    }
}

impl SqliteModeStore {
    /// Create a new SQLite mode store from a database path.
    ///
    /// Creates the database file if it doesn't exist.
    pub async fn new(path: &Path) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .map_err(StorageError::Database)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite mode store (for testing).
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(":memory:")
            .map_err(StorageError::Database)?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        // One connection that is never recycled: each connection would be
        // a separate in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(StorageError::Database)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS encryption_setting (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                mode TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(())
    }

    /// Insert the default record unless one exists.
    async fn ensure_record(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO encryption_setting (id, mode, updated_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(SETTING_ID)
        .bind(EncryptionMode::default().as_str())
        .bind(Self::current_timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(())
    }

    async fn read_record(&self) -> Result<ModeRecord, StorageError> {
        let row = sqlx::query_as::<_, SettingRow>(
            "SELECT mode, updated_at FROM encryption_setting WHERE id = ?1",
        )
        .bind(SETTING_ID)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        row.try_into()
    }

    fn current_timestamp_millis() -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl ModeStore for SqliteModeStore {
    async fn get_mode(&self) -> Result<ModeRecord, StorageError> {
        self.ensure_record().await?;
        self.read_record().await
    }

    async fn set_mode(&self, mode: EncryptionMode) -> Result<(ModeRecord, bool), StorageError> {
        self.ensure_record().await?;

        // Compare-and-write in one statement: no row comes back when the
        // stored mode already equals `mode`.
        let updated = sqlx::query_as::<_, SettingRow>(
            r#"
            UPDATE encryption_setting
            SET mode = ?1, updated_at = ?2
            WHERE id = ?3 AND mode != ?1
            RETURNING mode, updated_at
            "#,
        )
        .bind(mode.as_str())
        .bind(Self::current_timestamp_millis())
        .bind(SETTING_ID)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        match updated {
            Some(row) => Ok((row.try_into()?, true)),
            None => Ok((self.read_record().await?, false)),
        }
    }
}

/// Internal row type for SQLite queries.
#[derive(sqlx::FromRow)]
struct SettingRow {
    mode: String,
    updated_at: i64,
}

impl TryFrom<SettingRow> for ModeRecord {
    type Error = StorageError;

    fn try_from(row: SettingRow) -> Result<Self, Self::Error> {
        let mode = EncryptionMode::from_str(&row.mode)
            .map_err(|_| StorageError::CorruptRecord { value: row.mode })?;
        let updated_at = DateTime::<Utc>::from_timestamp_millis(row.updated_at).ok_or_else(|| {
            StorageError::CorruptRecord {
                value: row.updated_at.to_string(),
            }
        })?;

        Ok(ModeRecord { mode, updated_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_read_creates_plaintext_record() {
        let store = SqliteModeStore::in_memory().await.unwrap();

        let record = store.get_mode().await.unwrap();
        assert_eq!(record.mode, EncryptionMode::Plaintext);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM encryption_setting")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn repeated_reads_keep_one_record() {
        let store = SqliteModeStore::in_memory().await.unwrap();

        let first = store.get_mode().await.unwrap();
        let second = store.get_mode().await.unwrap();
        assert_eq!(first, second);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM encryption_setting")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn set_mode_reports_change() {
        let store = SqliteModeStore::in_memory().await.unwrap();

        let (record, changed) = store.set_mode(EncryptionMode::WeakXor).await.unwrap();
        assert!(changed);
        assert_eq!(record.mode, EncryptionMode::WeakXor);
        assert_eq!(store.get_mode().await.unwrap().mode, EncryptionMode::WeakXor);
    }

    #[tokio::test]
    async fn set_same_mode_is_noop() {
        let store = SqliteModeStore::in_memory().await.unwrap();
        let (before, _) = store.set_mode(EncryptionMode::WeakXor).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let (after, changed) = store.set_mode(EncryptionMode::WeakXor).await.unwrap();
        assert!(!changed);
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn set_default_on_fresh_store_is_noop() {
        let store = SqliteModeStore::in_memory().await.unwrap();

        let (record, changed) = store.set_mode(EncryptionMode::Plaintext).await.unwrap();
        assert!(!changed);
        assert_eq!(record.mode, EncryptionMode::Plaintext);
    }

    #[tokio::test]
    async fn record_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modes.db");

        {
            let store = SqliteModeStore::new(&path).await.unwrap();
            store.set_mode(EncryptionMode::WeakXorBase64).await.unwrap();
        }

        let reopened = SqliteModeStore::new(&path).await.unwrap();
        assert_eq!(
            reopened.get_mode().await.unwrap().mode,
            EncryptionMode::WeakXorBase64
        );
    }

    #[tokio::test]
    async fn unknown_stored_value_is_corrupt() {
        let store = SqliteModeStore::in_memory().await.unwrap();
        store.get_mode().await.unwrap();

        sqlx::query("UPDATE encryption_setting SET mode = 'WEAK_XOR' WHERE id = 1")
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.get_mode().await.unwrap_err();
        assert!(matches!(err, StorageError::CorruptRecord { value } if value == "WEAK_XOR"));
    }

    #[tokio::test]
    async fn second_row_is_rejected() {
        let store = SqliteModeStore::in_memory().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO encryption_setting (id, mode, updated_at) VALUES (2, 'plaintext', 0)",
        )
        .execute(&store.pool)
        .await;
        assert!(result.is_err());
    }
}
