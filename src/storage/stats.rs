//! `site_stats` table operations.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::models::{from_millis, SiteStat};
use crate::error_handling::DatabaseError;

/// Writes the latest probe outcome of a site, replacing the previous one.
pub async fn upsert_site_stat(pool: &SqlitePool, stat: &SiteStat) -> Result<(), DatabaseError> {
    let fetched_ms = stat.last_fetched_at.timestamp_millis();
    let raw_response = stat
        .raw_response
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        "INSERT INTO site_stats (
            site_id, available, plugin_version, raw_response, error_message,
            last_fetched_at_ms, created_at_ms, updated_at_ms
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(site_id) DO UPDATE SET
            available=excluded.available,
            plugin_version=excluded.plugin_version,
            raw_response=excluded.raw_response,
            error_message=excluded.error_message,
            last_fetched_at_ms=excluded.last_fetched_at_ms,
            updated_at_ms=excluded.updated_at_ms",
    )
    .bind(stat.site_id)
    .bind(stat.available)
    .bind(&stat.plugin_version)
    .bind(raw_response)
    .bind(&stat.error_message)
    .bind(fetched_ms)
    .bind(fetched_ms)
    .bind(fetched_ms)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_site_stat(
    pool: &SqlitePool,
    site_id: i64,
) -> Result<Option<SiteStat>, DatabaseError> {
    let row = sqlx::query(
        "SELECT site_id, available, plugin_version, raw_response, error_message, last_fetched_at_ms
        FROM site_stats WHERE site_id = ?",
    )
    .bind(site_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let raw_response: Option<String> = row.get("raw_response");
    Ok(Some(SiteStat {
        site_id: row.get("site_id"),
        available: row.get("available"),
        plugin_version: row.get("plugin_version"),
        raw_response: raw_response
            .map(|raw| serde_json::from_str(&raw))
            .transpose()?,
        error_message: row.get("error_message"),
        last_fetched_at: from_millis(row.get("last_fetched_at_ms")),
    }))
}

/// Time of the most recent probe across all sites.
pub async fn last_stats_run(pool: &SqlitePool) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    let ms: Option<i64> = sqlx::query_scalar("SELECT MAX(last_fetched_at_ms) FROM site_stats")
        .fetch_one(pool)
        .await?;
    Ok(ms.map(from_millis))
}
