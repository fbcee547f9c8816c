//! `site_snapshots` table operations.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::models::{from_millis, SiteSnapshot};
use crate::error_handling::DatabaseError;

/// Stores the HTML of `domain` for `site_id`, replacing any earlier capture.
pub async fn upsert_snapshot(
    pool: &SqlitePool,
    site_id: i64,
    domain: &str,
    html_content: &str,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let now_ms = now.timestamp_millis();
    sqlx::query(
        "INSERT INTO site_snapshots (site_id, domain, html_content, created_at_ms, updated_at_ms)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(site_id, domain) DO UPDATE SET
            html_content=excluded.html_content,
            updated_at_ms=excluded.updated_at_ms",
    )
    .bind(site_id)
    .bind(domain)
    .bind(html_content)
    .bind(now_ms)
    .bind(now_ms)
    .execute(pool)
    .await?;
    Ok(())
}

/// When `domain` was last captured, across all sites.
pub async fn latest_snapshot_time(
    pool: &SqlitePool,
    domain: &str,
) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    let ms: Option<i64> =
        sqlx::query_scalar("SELECT MAX(updated_at_ms) FROM site_snapshots WHERE domain = ?")
            .bind(domain)
            .fetch_one(pool)
            .await?;
    Ok(ms.map(from_millis))
}

/// Most recently updated snapshot of a site.
pub async fn latest_snapshot_for_site(
    pool: &SqlitePool,
    site_id: i64,
) -> Result<Option<SiteSnapshot>, DatabaseError> {
    let row = sqlx::query(
        "SELECT id, site_id, domain, html_content, updated_at_ms
        FROM site_snapshots
        WHERE site_id = ?
        ORDER BY updated_at_ms DESC, id DESC
        LIMIT 1",
    )
    .bind(site_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| SiteSnapshot {
        id: row.get("id"),
        site_id: row.get("site_id"),
        domain: row.get("domain"),
        html_content: row.get("html_content"),
        updated_at: from_millis(row.get("updated_at_ms")),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::{create_test_pool, create_test_site};
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_upsert_snapshot_overwrites_per_site_and_domain() {
        let pool = create_test_pool().await;
        let site_id = create_test_site(&pool, "https://a.com", None).await;
        let t1 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();

        upsert_snapshot(&pool, site_id, "a.com", "<html>one</html>", t1)
            .await
            .unwrap();
        upsert_snapshot(&pool, site_id, "a.com", "<html>two</html>", t2)
            .await
            .unwrap();

        let snapshot = latest_snapshot_for_site(&pool, site_id)
            .await
            .unwrap()
            .expect("snapshot stored");
        assert_eq!(snapshot.html_content, "<html>two</html>");
        assert_eq!(snapshot.updated_at, t2);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site_snapshots")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_latest_snapshot_time_missing_domain() {
        let pool = create_test_pool().await;
        assert_eq!(latest_snapshot_time(&pool, "nowhere.com").await.unwrap(), None);
    }
}
