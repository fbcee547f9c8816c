//! Application initialization and resource setup.
//!
//! This module provides functions to initialize shared resources:
//! - Logger (plain or JSON)
//! - HTTP client
//! - Database connection pool with migrations applied
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;

use std::path::Path;

use sqlx::SqlitePool;

use crate::error_handling::InitializationError;
use crate::storage::{init_db_pool_with_path, run_migrations};

// Re-export public API
pub use client::init_client;
pub use logger::init_logger_with;

/// Opens the database at `path` and brings its schema up to date.
///
/// # Errors
///
/// Returns `InitializationError::ConfigError` if the file cannot be opened or
/// a migration fails.
pub async fn init_storage(path: &Path) -> Result<SqlitePool, InitializationError> {
    let pool = init_db_pool_with_path(path).await.map_err(|e| {
        InitializationError::ConfigError(format!(
            "Failed to open database {}: {}",
            path.display(),
            e
        ))
    })?;
    run_migrations(&pool).await.map_err(|e| {
        InitializationError::ConfigError(format!("Failed to run migrations: {:#}", e))
    })?;
    Ok(pool)
}
