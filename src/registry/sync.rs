//! Reconciliation of registry records into the `sites` table.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde_json::Value;
use sqlx::SqlitePool;

use super::week::convert_week_to_date;
use crate::domain::{canonical_site_url, is_excluded_site};
use crate::error_handling::DatabaseError;
use crate::storage::{self, SiteUpsert};

/// Why a registry record was not written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The record is not a JSON object
    NotAnObject,
    /// `site_url` is missing or empty once trailing slashes are removed
    EmptyUrl,
    /// `site_url` matches an exclusion pattern
    Excluded(String),
}

/// Outcome of one [`sync_to_storage`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub received: usize,
    pub synced: usize,
    pub skipped_empty: usize,
    pub skipped_excluded: usize,
    /// Records that could not be written; the rest of the batch still ran
    pub failed: usize,
}

/// Reads a scalar field as text. Numbers are accepted because the registry
/// does not type its tokens consistently.
fn text_field(record: &Value, field: &str) -> Option<String> {
    let text = match record.get(field)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(text).filter(|s| !s.trim().is_empty())
}

/// Turns a raw registry record into the row to upsert.
pub fn prepare_site(record: &Value) -> Result<SiteUpsert, SkipReason> {
    if !record.is_object() {
        return Err(SkipReason::NotAnObject);
    }

    let site_url = canonical_site_url(&text_field(record, "site_url").unwrap_or_default());
    if site_url.is_empty() {
        return Err(SkipReason::EmptyUrl);
    }
    if is_excluded_site(&site_url) {
        return Err(SkipReason::Excluded(site_url));
    }

    let last_emailed_at = text_field(record, "last_emailed_at");
    let last_emailed_date = last_emailed_at.as_deref().and_then(convert_week_to_date);

    Ok(SiteUpsert {
        site_url,
        license_key: text_field(record, "license_key"),
        last_emailed_at,
        last_emailed_date,
        raw_data: record.clone(),
    })
}

/// Upserts every usable registry record by URL.
///
/// Records without a URL or matching an exclusion pattern are skipped. A
/// record that fails to write is logged and counted; the remaining records
/// are still processed.
pub async fn sync_to_storage(
    pool: &SqlitePool,
    records: &[Value],
    now: DateTime<Utc>,
) -> SyncReport {
    let mut report = SyncReport {
        received: records.len(),
        ..Default::default()
    };

    for record in records {
        match prepare_site(record) {
            Ok(site) => match storage::upsert_site(pool, &site, now).await {
                Ok(_) => report.synced += 1,
                Err(e) => {
                    warn!("Failed to store site {}: {e}", site.site_url);
                    report.failed += 1;
                }
            },
            Err(SkipReason::Excluded(url)) => {
                info!("Skipping local/staging site: {url}");
                report.skipped_excluded += 1;
            }
            Err(reason) => {
                debug!("Skipping registry record ({reason:?})");
                report.skipped_empty += 1;
            }
        }
    }

    info!(
        "Registry sync: {} received, {} synced, {} excluded, {} without URL, {} failed",
        report.received,
        report.synced,
        report.skipped_excluded,
        report.skipped_empty,
        report.failed
    );
    report
}

/// Deletes stored sites that match an exclusion pattern and returns how many
/// were removed.
///
/// Catches sites stored before an exclusion pattern existed.
pub async fn cleanup_excluded(pool: &SqlitePool) -> Result<u64, DatabaseError> {
    let excluded: Vec<i64> = storage::list_sites(pool)
        .await?
        .into_iter()
        .filter(|site| is_excluded_site(&site.site_url))
        .map(|site| site.id)
        .collect();

    if excluded.is_empty() {
        return Ok(0);
    }

    let deleted = storage::delete_sites(pool, &excluded).await?;
    if deleted > 0 {
        info!("Cleaned up {deleted} local/staging site(s)");
    }
    Ok(deleted)
}
