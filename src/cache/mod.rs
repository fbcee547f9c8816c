//! Shared key-value cache with per-entry expiry.
//!
//! The snapshot coordinator keeps its in-progress set and pending map here, and
//! the registry client caches the last site listing. Values are JSON documents.
//!
//! Two backends are provided:
//! - [`MemoryCacheStore`]: process-local, used by tests and embedders
//! - [`SqliteCacheStore`]: a table in the application database, shared by every
//!   process pointed at the same file

mod memory;
mod sqlite;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error_handling::CacheError;

pub use memory::MemoryCacheStore;
pub use sqlite::SqliteCacheStore;

/// Read-modify-write closure passed to [`CacheStore::update`].
///
/// Receives the current (unexpired) value and returns the replacement, or
/// `None` to remove the key.
pub type UpdateFn = Box<dyn FnOnce(Option<Value>) -> Option<Value> + Send>;

/// Key-value store with expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value and resetting the TTL.
    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    /// Removes `key`.
    async fn forget(&self, key: &str) -> Result<(), CacheError>;

    /// Atomically replaces the value under `key` with `f(current)`.
    ///
    /// No other `update`, `put` or `forget` on the same store can interleave
    /// between the read and the write. Returns the value written.
    async fn update(
        &self,
        key: &str,
        ttl: Duration,
        f: UpdateFn,
    ) -> Result<Option<Value>, CacheError>;
}

pub(crate) fn expires_at_ms(now_ms: i64, ttl: Duration) -> i64 {
    now_ms.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}
