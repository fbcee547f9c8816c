//! SQLite-backed cache backend.
//!
//! Entries live in the `cache` table of the application database, so the
//! in-progress and pending state survives between CLI invocations and is
//! visible to every process sharing the file.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::{expires_at_ms, CacheStore, UpdateFn};
use crate::clock::Clock;
use crate::error_handling::CacheError;

/// Cache stored in the `cache` table.
pub struct SqliteCacheStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteCacheStore {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Deletes every expired row and returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, CacheError> {
        let now_ms = self.clock.now().timestamp_millis();
        let result = sqlx::query("DELETE FROM cache WHERE expires_at_ms <= ?")
            .bind(now_ms)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

async fn read_live(
    conn: &mut SqliteConnection,
    key: &str,
    now_ms: i64,
) -> Result<Option<Value>, CacheError> {
    let row = sqlx::query("SELECT value FROM cache WHERE key = ? AND expires_at_ms > ?")
        .bind(key)
        .bind(now_ms)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let raw: String = row.get("value");
            Ok(Some(serde_json::from_str(&raw)?))
        }
        None => Ok(None),
    }
}

async fn write(
    conn: &mut SqliteConnection,
    key: &str,
    value: &Value,
    expires_at_ms: i64,
) -> Result<(), CacheError> {
    let encoded = serde_json::to_string(value)?;
    sqlx::query(
        "INSERT INTO cache (key, value, expires_at_ms) VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET
            value=excluded.value,
            expires_at_ms=excluded.expires_at_ms",
    )
    .bind(key)
    .bind(encoded)
    .bind(expires_at_ms)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn delete(conn: &mut SqliteConnection, key: &str) -> Result<(), CacheError> {
    sqlx::query("DELETE FROM cache WHERE key = ?")
        .bind(key)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now_ms = self.clock.now().timestamp_millis();
        let mut conn = self.pool.acquire().await?;
        read_live(&mut conn, key, now_ms).await
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let now_ms = self.clock.now().timestamp_millis();
        let mut conn = self.pool.acquire().await?;
        write(&mut conn, key, &value, expires_at_ms(now_ms, ttl)).await
    }

    async fn forget(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.pool.acquire().await?;
        delete(&mut conn, key).await
    }

    async fn update(
        &self,
        key: &str,
        ttl: Duration,
        f: UpdateFn,
    ) -> Result<Option<Value>, CacheError> {
        let now_ms = self.clock.now().timestamp_millis();

        // IMMEDIATE takes the write lock up front, so a concurrent writer
        // cannot slip in between our read and our write. Dropping the
        // transaction before commit rolls it back.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let current = read_live(&mut tx, key, now_ms).await?;
        let next = f(current);
        match &next {
            Some(value) => write(&mut tx, key, value, expires_at_ms(now_ms, ttl)).await?,
            None => delete(&mut tx, key).await?,
        }

        tx.commit().await?;
        Ok(next)
    }
}
