//! SQLite-backed cache implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{Cache, CacheError, CacheValue};

/// Cache persisted in a SQLite table.
///
/// Values are stored as JSON. Survives restarts, so it can be shared by
/// several processes pointing at the same file.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Open (or create) a cache database at `path`.
    pub fn new(path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(path).map_err(|e| CacheError::Backend(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite cache (useful for testing).
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory().map_err(|e| CacheError::Backend(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at);
            "#,
        )
        .map_err(|e| CacheError::Backend(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Backend("cache connection mutex poisoned".to_string()))
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[async_trait]
impl Cache for SqliteCache {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>, CacheError> {
        let conn = self.conn()?;
        let now = now_millis();

        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT value, expires_at FROM cache_entries WHERE key = ?",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        match row {
            None => Ok(None),
            Some((_, expires_at)) if expires_at <= now => {
                conn.execute(
                    "DELETE FROM cache_entries WHERE key = ? AND expires_at <= ?",
                    params![key, now],
                )
                .map_err(|e| CacheError::Backend(e.to_string()))?;
                Ok(None)
            }
            Some((json, _)) => Ok(Some(serde_json::from_str(&json)?)),
        }
    }

    async fn set(&self, key: &str, value: CacheValue, ttl: Duration) -> Result<(), CacheError> {
        let json = serde_json::to_string(&value)?;
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now_millis().saturating_add(ttl_ms);

        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)",
                params![key, json, expires_at],
            )
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.conn()?
            .execute("DELETE FROM cache_entries WHERE key = ?", params![key])
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.conn()?
            .execute("DELETE FROM cache_entries", [])
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let removed = self
            .conn()?
            .execute(
                "DELETE FROM cache_entries WHERE expires_at <= ?",
                params![now_millis()],
            )
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(removed)
    }
}
