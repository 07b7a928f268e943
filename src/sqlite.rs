//! SQLite persistor implementation.
//!
//! The durable backend: a single embedded database file holding one row
//! per slot key. WAL mode keeps concurrent readers cheap. Pass one of
//! these to the facade when state must survive process restarts.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::error::Result;
use crate::persistor::Persistor;

/// SQLite implementation of [`Persistor`].
pub struct SqlitePersistor {
    pool: SqlitePool,
}

impl SqlitePersistor {
    /// Open or create a SQLite-backed persistor at the given path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("opening sqlite persistor at {:?}", path);

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let persistor = Self { pool };
        persistor.init_schema().await?;
        Ok(persistor)
    }

    /// Create an in-memory SQLite persistor (for testing).
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let persistor = Self { pool };
        persistor.init_schema().await?;
        Ok(persistor)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sovran_state (
                key TEXT PRIMARY KEY NOT NULL,
                value BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("sqlite persistor schema initialized");
        Ok(())
    }

    fn now_unix() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs() as i64
    }
}

#[async_trait]
impl Persistor for SqlitePersistor {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT value FROM sovran_state WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sovran_state (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(&value)
        .bind(Self::now_unix())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistor::PersistorExt;

    #[tokio::test]
    async fn test_sqlite_set_and_get() {
        let persistor = SqlitePersistor::in_memory().await.unwrap();

        persistor.set("test-context", b"value".to_vec()).await.unwrap();
        let loaded = persistor.get("test-context").await.unwrap();
        assert_eq!(loaded, Some(b"value".to_vec()));
    }

    #[tokio::test]
    async fn test_sqlite_get_absent_key() {
        let persistor = SqlitePersistor::in_memory().await.unwrap();
        assert!(persistor.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_set_overwrites() {
        let persistor = SqlitePersistor::in_memory().await.unwrap();

        persistor.set("key", b"v1".to_vec()).await.unwrap();
        persistor.set("key", b"v2".to_vec()).await.unwrap();

        let loaded = persistor.get("key").await.unwrap();
        assert_eq!(loaded, Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn test_sqlite_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");

        {
            let persistor = SqlitePersistor::open(&path).await.unwrap();
            persistor.set("key", b"persisted".to_vec()).await.unwrap();
        }

        let persistor = SqlitePersistor::open(&path).await.unwrap();
        let loaded = persistor.get("key").await.unwrap();
        assert_eq!(loaded, Some(b"persisted".to_vec()));
    }

    #[tokio::test]
    async fn test_sqlite_json_round_trip() {
        let persistor = SqlitePersistor::in_memory().await.unwrap();
        let value = serde_json::json!({ "app": { "name": "test" } });

        persistor.set_json("key", &value).await.unwrap();
        let loaded: serde_json::Value = persistor.get_json("key").await.unwrap().unwrap();
        assert_eq!(loaded, value);
    }
}
