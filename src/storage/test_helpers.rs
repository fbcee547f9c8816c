//! Shared test helpers for storage-backed unit tests.

#[cfg(test)]
use sqlx::sqlite::SqlitePoolOptions;
#[cfg(test)]
use sqlx::SqlitePool;

#[cfg(test)]
use crate::storage::run_migrations;

/// Creates a test database pool with migrations applied.
/// Uses a single-connection in-memory database so every query sees the same data.
#[cfg(test)]
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

/// Inserts a site with the given URL and license key, returning its ID.
#[cfg(test)]
pub async fn create_test_site(pool: &SqlitePool, site_url: &str, license_key: Option<&str>) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO sites (site_url, license_key, created_at_ms, updated_at_ms)
        VALUES (?, ?, ?, ?)
        RETURNING id",
    )
    .bind(site_url)
    .bind(license_key)
    .bind(1_735_689_600_000i64)
    .bind(1_735_689_600_000i64)
    .fetch_one(pool)
    .await
    .expect("Failed to insert test site")
}
