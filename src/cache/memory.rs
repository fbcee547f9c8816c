//! In-process cache backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{expires_at_ms, CacheStore, UpdateFn};
use crate::clock::Clock;
use crate::error_handling::CacheError;

struct Entry {
    value: Value,
    expires_at_ms: i64,
}

/// `HashMap` behind a mutex; entries expire lazily against the injected clock.
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // A panic inside an update closure must not wedge the cache
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn live_value(entries: &mut HashMap<String, Entry>, key: &str, now_ms: i64) -> Option<Value> {
        match entries.get(key) {
            Some(entry) if entry.expires_at_ms > now_ms => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now_ms = self.clock.now().timestamp_millis();
        let mut entries = self.lock();
        Ok(Self::live_value(&mut entries, key, now_ms))
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let now_ms = self.clock.now().timestamp_millis();
        self.lock().insert(
            key.to_string(),
            Entry {
                value,
                expires_at_ms: expires_at_ms(now_ms, ttl),
            },
        );
        Ok(())
    }

    async fn forget(&self, key: &str) -> Result<(), CacheError> {
        self.lock().remove(key);
        Ok(())
    }

    async fn update(
        &self,
        key: &str,
        ttl: Duration,
        f: UpdateFn,
    ) -> Result<Option<Value>, CacheError> {
        let now_ms = self.clock.now().timestamp_millis();
        let mut entries = self.lock();
        let current = Self::live_value(&mut entries, key, now_ms);
        let next = f(current);
        match &next {
            Some(value) => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: value.clone(),
                        expires_at_ms: expires_at_ms(now_ms, ttl),
                    },
                );
            }
            None => {
                entries.remove(key);
            }
        }
        Ok(next)
    }
}
