//! Key/value persistence behind the store task.
//!
//! Backends are owned by exactly one task and never shared, so they take
//! `&mut self` and need no locking of their own.

use std::{collections::HashMap, future::Future};

use sqlx::{sqlite::SqliteConnectOptions, ConnectOptions, Connection, Row, SqliteConnection};
use std::str::FromStr;
use tracing::{debug, info_span, Instrument};

use super::StoreError;

pub trait Backend: Send + 'static {
    fn get(&mut self, key: &str)
        -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn put(&mut self, key: &str, value: String)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete(&mut self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Release the backend once the store task has no handles left.
    fn close(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Volatile in-process storage.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    async fn put(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn close(self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// SQLite file (or `sqlite::memory:`) with a single `kv` table.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: SqliteConnection,
}

impl SqliteBackend {
    /// Open the database and create the table if needed.
    ///
    /// # Errors
    /// Returns an error if the DSN is invalid or the database cannot be opened.
    pub async fn connect(dsn: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(dsn)?;
        let mut conn = options.connect().await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL)",
        )
        .execute(&mut conn)
        .await?;

        debug!("sqlite backend ready");

        Ok(Self { conn })
    }
}

impl Backend for SqliteBackend {
    async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let span = info_span!("db.query", db.system = "sqlite", db.operation = "SELECT");
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&mut self.conn)
            .instrument(span)
            .await?;

        Ok(match row {
            Some(row) => Some(row.try_get::<String, _>(0)?),
            None => None,
        })
    }

    async fn put(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let span = info_span!("db.query", db.system = "sqlite", db.operation = "UPSERT");
        sqlx::query(
            "INSERT INTO kv (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&mut self.conn)
        .instrument(span)
        .await?;
        Ok(())
    }

    async fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        let span = info_span!("db.query", db.system = "sqlite", db.operation = "DELETE");
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&mut self.conn)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn close(self) -> Result<(), StoreError> {
        self.conn.close().await?;
        debug!("sqlite backend closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exercise(backend: &mut impl Backend) {
        assert_eq!(backend.get("k").await.unwrap(), None);
        backend.put("k", "1".to_string()).await.unwrap();
        backend.put("k", "2".to_string()).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("2"));
        backend.delete("k").await.unwrap();
        backend.delete("k").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_backend_get_put_delete() {
        exercise(&mut MemoryBackend::new()).await;
    }

    #[tokio::test]
    async fn sqlite_backend_get_put_delete() {
        let mut backend = SqliteBackend::connect("sqlite::memory:").await.unwrap();
        exercise(&mut backend).await;
        backend.close().await.unwrap();
    }
}
