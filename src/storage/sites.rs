//! `sites` table operations.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::models::{from_millis, Site, SiteUpsert};
use crate::error_handling::DatabaseError;

const SITE_COLUMNS: &str = "id, site_url, license_key, last_emailed_at, last_emailed_date, \
                            raw_data, created_at_ms, updated_at_ms";

fn site_from_row(row: &SqliteRow) -> Result<Site, DatabaseError> {
    let raw_data: Option<String> = row.get("raw_data");
    let last_emailed_date: Option<String> = row.get("last_emailed_date");
    Ok(Site {
        id: row.get("id"),
        site_url: row.get("site_url"),
        license_key: row.get("license_key"),
        last_emailed_at: row.get("last_emailed_at"),
        last_emailed_date: last_emailed_date.and_then(|d| d.parse::<NaiveDate>().ok()),
        raw_data: raw_data.map(|raw| serde_json::from_str(&raw)).transpose()?,
        created_at: from_millis(row.get("created_at_ms")),
        updated_at: from_millis(row.get("updated_at_ms")),
    })
}

/// Inserts or updates a site keyed by its URL, returning the row ID.
///
/// `created_at_ms` is kept on update so the first-seen time survives re-syncs.
pub async fn upsert_site(
    pool: &SqlitePool,
    site: &SiteUpsert,
    now: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    let now_ms = now.timestamp_millis();
    let raw_data = serde_json::to_string(&site.raw_data)?;

    let id = sqlx::query_scalar(
        "INSERT INTO sites (
            site_url, license_key, last_emailed_at, last_emailed_date, raw_data,
            created_at_ms, updated_at_ms
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(site_url) DO UPDATE SET
            license_key=excluded.license_key,
            last_emailed_at=excluded.last_emailed_at,
            last_emailed_date=excluded.last_emailed_date,
            raw_data=excluded.raw_data,
            updated_at_ms=excluded.updated_at_ms
        RETURNING id",
    )
    .bind(&site.site_url)
    .bind(&site.license_key)
    .bind(&site.last_emailed_at)
    .bind(site.last_emailed_date.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(raw_data)
    .bind(now_ms)
    .bind(now_ms)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns every stored site in insertion order.
pub async fn list_sites(pool: &SqlitePool) -> Result<Vec<Site>, DatabaseError> {
    let rows = sqlx::query(&format!("SELECT {SITE_COLUMNS} FROM sites ORDER BY id"))
        .fetch_all(pool)
        .await?;
    rows.iter().map(site_from_row).collect()
}

pub async fn count_sites(pool: &SqlitePool) -> Result<i64, DatabaseError> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM sites")
        .fetch_one(pool)
        .await?)
}

pub async fn find_site_by_url(
    pool: &SqlitePool,
    site_url: &str,
) -> Result<Option<Site>, DatabaseError> {
    let row = sqlx::query(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE site_url = ?"))
        .bind(site_url)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(site_from_row).transpose()
}

/// Finds the first site (lowest ID) whose URL contains `domain`, ignoring case.
///
/// This is a substring match: `example.com` also matches
/// `https://shop.example.com` and `https://notexample.com`. The lowest ID wins.
pub async fn find_site_matching_domain(
    pool: &SqlitePool,
    domain: &str,
) -> Result<Option<Site>, DatabaseError> {
    let row = sqlx::query(&format!(
        "SELECT {SITE_COLUMNS} FROM sites
        WHERE instr(lower(site_url), lower(?)) > 0
        ORDER BY id
        LIMIT 1"
    ))
    .bind(domain)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(site_from_row).transpose()
}

/// Deletes the given sites (stats and snapshots cascade) in one transaction.
pub async fn delete_sites(pool: &SqlitePool, ids: &[i64]) -> Result<u64, DatabaseError> {
    let mut tx = pool.begin().await?;
    let mut deleted = 0;
    for id in ids {
        deleted += sqlx::query("DELETE FROM sites WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    tx.commit().await?;
    Ok(deleted)
}
