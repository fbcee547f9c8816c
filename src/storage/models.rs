// storage/models.rs
// Database models and types

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

/// A registered site as stored in the `sites` table.
///
/// `site_url` is canonical (no trailing slash) and unique. `raw_data` keeps the
/// registry record verbatim; its shape is not fixed by the upstream API.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub id: i64,
    pub site_url: String,
    pub license_key: Option<String>,
    /// Upstream year+ISO-week token, e.g. `"202507"`
    pub last_emailed_at: Option<String>,
    /// Monday of the ISO week named by `last_emailed_at`
    pub last_emailed_date: Option<NaiveDate>,
    pub raw_data: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Site {
    /// License key, treating an empty string as absent.
    pub fn license(&self) -> Option<&str> {
        self.license_key.as_deref().filter(|key| !key.trim().is_empty())
    }
}

/// Values written by a registry sync for one site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteUpsert {
    pub site_url: String,
    pub license_key: Option<String>,
    pub last_emailed_at: Option<String>,
    pub last_emailed_date: Option<NaiveDate>,
    pub raw_data: Value,
}

/// Latest probe outcome of a site (`site_stats` row).
#[derive(Debug, Clone, PartialEq)]
pub struct SiteStat {
    pub site_id: i64,
    pub available: bool,
    pub plugin_version: Option<String>,
    pub raw_response: Option<Value>,
    pub error_message: Option<String>,
    pub last_fetched_at: DateTime<Utc>,
}

/// Latest captured HTML of a site's domain (`site_snapshots` row).
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSnapshot {
    pub id: i64,
    pub site_id: i64,
    pub domain: String,
    pub html_content: String,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
