// Shared test helpers for database setup and test data creation.
//
// This module provides common utilities used across multiple test files to reduce duplication.

#![allow(dead_code)] // Each test binary uses a different subset

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use site_monitor::storage::{init_db_pool_with_path, upsert_site, SiteUpsert};
use site_monitor::{run_migrations, AppContext, CacheStore, Config, ManualClock, MemoryCacheStore};

/// Creates a test database pool with migrations applied.
/// Uses a single-connection in-memory database so every query sees the same data.
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Creates a migrated file-backed pool, for tests that need several connections.
pub async fn create_test_pool_with_path(db_path: &Path) -> SqlitePool {
    let pool = init_db_pool_with_path(db_path)
        .await
        .expect("Failed to create test database");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Fixed start time shared by the time-dependent tests.
pub fn test_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(test_start()))
}

/// Inserts (or updates) a site and returns its ID.
pub async fn create_test_site(pool: &SqlitePool, site_url: &str, license_key: Option<&str>) -> i64 {
    let site = SiteUpsert {
        site_url: site_url.to_string(),
        license_key: license_key.map(str::to_string),
        last_emailed_at: None,
        last_emailed_date: None,
        raw_data: serde_json::json!({ "site_url": site_url }),
    };
    upsert_site(pool, &site, test_start())
        .await
        .expect("Failed to insert test site")
}

/// Application context over an in-memory database, memory cache and manual clock.
pub async fn create_test_context(config: Config) -> (AppContext, Arc<ManualClock>) {
    let clock = manual_clock();
    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(clock.clone()));
    let pool = create_test_pool().await;
    let ctx = AppContext::new(config, pool, cache, clock.clone(), reqwest::Client::new());
    (ctx, clock)
}
