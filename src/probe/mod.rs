//! Site stats prober.
//!
//! Determines for every stored site whether the companion plugin is active
//! and, for licensed sites, which version it runs. Each probe writes exactly
//! one `site_stats` row; a failing site never aborts the pass.

mod outcome;

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use sqlx::SqlitePool;

use crate::clock::Clock;
use crate::config::{PLACEHOLDER_LICENSE_KEY, PLUGIN_NAMESPACE, STATS_REQUEST_TIMEOUT};
use crate::domain::canonical_site_url;
use crate::error_handling::{DatabaseError, ProcessingStats};
use crate::storage::{find_site_stat, list_sites, upsert_site_stat, Site, SiteStat};
use crate::utils::sanitize_and_truncate_error_message;

pub use outcome::{extract_plugin_version, interpret_licensed, interpret_unlicensed, ProbeOutcome};

/// Stats endpoint of the companion plugin on `site_url` for `license_key`.
pub fn stats_url(site_url: &str, license_key: &str) -> String {
    format!(
        "{}/wp-json/?rest_route=/{}/v1/get-stats/{}",
        canonical_site_url(site_url),
        PLUGIN_NAMESPACE,
        license_key
    )
}

/// Summary of one stats pass.
pub struct StatsReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub stats: ProcessingStats,
}

pub struct SiteStatsProber {
    client: reqwest::Client,
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    max_concurrency: usize,
}

impl SiteStatsProber {
    pub fn new(
        client: reqwest::Client,
        pool: SqlitePool,
        clock: Arc<dyn Clock>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            client,
            pool,
            clock,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Probes one site and records the outcome.
    ///
    /// Sites without a license key are probed with the placeholder key,
    /// which only tells whether the plugin is installed. Storage failures
    /// are logged; the outcome is returned either way.
    pub async fn probe_site(&self, site: &Site) -> ProbeOutcome {
        let outcome = match site.license() {
            Some(key) => {
                let url = stats_url(&site.site_url, key);
                self.request(&url, interpret_licensed).await
            }
            None => {
                let url = stats_url(&site.site_url, PLACEHOLDER_LICENSE_KEY);
                self.request(&url, interpret_unlicensed).await
            }
        };

        let stat = SiteStat {
            site_id: site.id,
            available: outcome.available,
            plugin_version: outcome.plugin_version.clone(),
            raw_response: outcome.raw_response.clone(),
            error_message: outcome
                .error_message
                .as_deref()
                .map(sanitize_and_truncate_error_message),
            last_fetched_at: self.clock.now(),
        };
        if let Err(e) = upsert_site_stat(&self.pool, &stat).await {
            warn!("Failed to store stats for {}: {}", site.site_url, e);
        }

        match (&outcome.failure, &outcome.plugin_version) {
            (Some(failure), _) => debug!("{}: {}", site.site_url, failure),
            (None, Some(version)) => debug!("{}: plugin version {}", site.site_url, version),
            (None, None) => debug!("{}: plugin active", site.site_url),
        }
        outcome
    }

    async fn request(&self, url: &str, interpret: fn(u16, &str) -> ProbeOutcome) -> ProbeOutcome {
        let response = match self
            .client
            .get(url)
            .timeout(STATS_REQUEST_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ProbeOutcome::transport_failure(&e),
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => interpret(status, &body),
            Err(e) => ProbeOutcome::transport_failure(&e),
        }
    }

    /// Probes every stored site, `max_concurrency` at a time.
    ///
    /// A site counts as successful when its freshly written stat row is
    /// marked available.
    ///
    /// # Errors
    ///
    /// Returns an error only if the site list cannot be loaded.
    pub async fn fetch_all_site_stats(&self) -> Result<StatsReport, DatabaseError> {
        let sites = list_sites(&self.pool).await?;
        let total = sites.len();
        info!("Probing {} sites ({} at a time)", total, self.max_concurrency);

        let stats = ProcessingStats::new();
        let counters = &stats;
        let available: Vec<bool> = stream::iter(sites.iter())
            .map(|site| async move {
                let outcome = self.probe_site(site).await;
                if let Some(failure) = outcome.failure {
                    counters.increment_failure(failure);
                }
                if let Some(info) = outcome.info {
                    counters.increment_info(info);
                }
                match find_site_stat(&self.pool, site.id).await {
                    Ok(Some(stat)) => stat.available,
                    Ok(None) => false,
                    Err(e) => {
                        warn!("Failed to reload stats for {}: {}", site.site_url, e);
                        false
                    }
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let successful = available.iter().filter(|ok| **ok).count();
        Ok(StatsReport {
            total,
            successful,
            failed: total - successful,
            stats,
        })
    }
}
