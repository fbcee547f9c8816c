//! HTML snapshot pipeline.
//!
//! Domains are submitted to an external rendering worker, which captures the
//! page out of band. After the fetch delay the coordinator retrieves each
//! result and stores it as the snapshot of the matching site. Between the two
//! phases a domain sits in the in-progress set and the pending map, both held
//! in the shared cache with a one hour TTL as a safety net.

mod state;
mod status;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::cache::CacheStore;
use crate::clock::Clock;
use crate::config::{FETCH_DELAY, SNAPSHOT_FRESHNESS, WORKER_REQUEST_TIMEOUT};
use crate::domain::extract_host;
use crate::error_handling::{describe_reqwest_error, CacheError, DatabaseError};
use crate::storage::{find_site_matching_domain, latest_snapshot_time, list_sites, upsert_snapshot};

pub use status::StatusReport;

/// Body of the worker's `fetch-domains` endpoint.
#[derive(Serialize)]
struct EnqueueRequest<'a> {
    domains: &'a [String],
}

/// Result of a [`SnapshotCoordinator::queue`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueOutcome {
    /// Every requested domain was already in progress
    NothingToQueue,
    /// The worker accepted these domains
    Queued(Vec<String>),
    /// The worker rejected the submission or could not be reached
    Failed(String),
}

/// Per-domain results of a [`SnapshotCoordinator::fetch`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub successful: Vec<String>,
    pub failed: Vec<String>,
}

pub struct SnapshotCoordinator {
    client: reqwest::Client,
    worker_url: String,
    pool: SqlitePool,
    cache: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
}

impl SnapshotCoordinator {
    pub fn new(
        client: reqwest::Client,
        worker_url: &str,
        pool: SqlitePool,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            worker_url: worker_url.trim_end_matches('/').to_string(),
            pool,
            cache,
            clock,
        }
    }

    fn now_secs(&self) -> i64 {
        self.clock.now().timestamp()
    }

    /// Submits the domains not already in progress to the worker.
    ///
    /// The domains are claimed in the in-progress set before the request goes
    /// out, so a concurrent caller sharing the cache skips them. On acceptance
    /// they are stamped pending at the current time; a rejected or failed
    /// submission releases the claim and leaves the state as it was.
    ///
    /// # Errors
    ///
    /// Returns an error only if the cache cannot be read or written.
    pub async fn queue(&self, domains: &[String]) -> Result<QueueOutcome, CacheError> {
        let to_queue = state::claim_in_progress(self.cache.as_ref(), domains).await?;
        if to_queue.is_empty() {
            info!("All domains already in progress, skipping queue");
            return Ok(QueueOutcome::NothingToQueue);
        }

        if let Err(message) = self.submit(&to_queue).await {
            error!("Failed to queue domains with worker: {message}");
            state::release_in_progress(self.cache.as_ref(), &to_queue).await?;
            return Ok(QueueOutcome::Failed(message));
        }

        state::stamp_pending(self.cache.as_ref(), &to_queue, self.now_secs()).await?;
        info!("Queued {} domains for HTML fetch", to_queue.len());
        Ok(QueueOutcome::Queued(to_queue))
    }

    async fn submit(&self, domains: &[String]) -> Result<(), String> {
        let url = format!("{}/fetch-domains", self.worker_url);
        let response = self
            .client
            .post(&url)
            .timeout(WORKER_REQUEST_TIMEOUT)
            .json(&EnqueueRequest { domains })
            .send()
            .await
            .map_err(|e| describe_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {}", status.as_u16(), body));
        }
        Ok(())
    }

    /// Pending domains whose enqueue time is at least the fetch delay ago.
    pub async fn ready_domains(&self) -> Result<Vec<String>, CacheError> {
        let now = self.now_secs();
        let delay = FETCH_DELAY.as_secs() as i64;
        Ok(state::pending(self.cache.as_ref())
            .await?
            .into_iter()
            .filter(|(_, queued_at)| now - queued_at >= delay)
            .map(|(domain, _)| domain)
            .collect())
    }

    /// Retrieves the rendered HTML of each domain and stores it.
    ///
    /// A domain leaves the transient state only once its content has been
    /// retrieved. Failed domains stay pending; nothing is retried here.
    ///
    /// # Errors
    ///
    /// Returns an error only if the cache cannot be written after a success.
    pub async fn fetch(&self, domains: &[String]) -> Result<FetchReport, CacheError> {
        let mut report = FetchReport::default();

        for domain in domains {
            let Some(html) = self.retrieve(domain).await else {
                report.failed.push(domain.clone());
                continue;
            };

            if let Err(e) = self.store_snapshot(domain, &html).await {
                error!("Failed to store HTML snapshot for {domain}: {e}");
                report.failed.push(domain.clone());
                continue;
            }

            state::mark_fetched(self.cache.as_ref(), domain).await?;
            report.successful.push(domain.clone());
        }

        Ok(report)
    }

    async fn retrieve(&self, domain: &str) -> Option<String> {
        let mut url = match url::Url::parse(&format!("{}/get-results", self.worker_url)) {
            Ok(url) => url,
            Err(e) => {
                error!("Invalid worker URL {}: {e}", self.worker_url);
                return None;
            }
        };
        url.query_pairs_mut().append_pair("domain", domain);

        let response = match self
            .client
            .get(url)
            .timeout(WORKER_REQUEST_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to fetch HTML for {domain}: {}", describe_reqwest_error(&e));
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!("Failed to fetch HTML for {domain}: HTTP {}", status.as_u16());
            return None;
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to fetch HTML for {domain}: {e}");
                return None;
            }
        };

        match body.get(domain).and_then(Value::as_str) {
            Some(html) => Some(html.to_string()),
            _ => {
                warn!("No HTML content returned for {domain}");
                None
            }
        }
    }

    async fn store_snapshot(&self, domain: &str, html: &str) -> Result<(), DatabaseError> {
        let Some(site) = find_site_matching_domain(&self.pool, domain).await? else {
            warn!("No registered site found for {domain}, snapshot discarded");
            return Ok(());
        };
        upsert_snapshot(&self.pool, site.id, domain, html, self.clock.now()).await?;
        info!("Stored HTML snapshot for {domain}");
        Ok(())
    }

    /// Hosts of all stored sites, first occurrence order.
    ///
    /// Unless `force` is set, hosts captured within the freshness window are
    /// left out.
    pub async fn domains_needing_fetch(&self, force: bool) -> Result<Vec<String>, DatabaseError> {
        let sites = list_sites(&self.pool).await?;

        let mut seen = HashSet::new();
        let hosts: Vec<String> = sites
            .iter()
            .filter_map(|site| extract_host(&site.site_url))
            .filter(|host| seen.insert(host.clone()))
            .collect();

        if force {
            return Ok(hosts);
        }

        let cutoff = self.clock.now()
            - ChronoDuration::from_std(SNAPSHOT_FRESHNESS).unwrap_or(ChronoDuration::hours(1));
        let mut needing = Vec::new();
        for host in hosts {
            match latest_snapshot_time(&self.pool, &host).await? {
                Some(updated_at) if updated_at >= cutoff => {
                    debug!("Snapshot of {host} is fresh, skipping");
                }
                _ => needing.push(host),
            }
        }
        Ok(needing)
    }

    /// Forgets the in-progress set and the pending map.
    pub async fn clear(&self) -> Result<(), CacheError> {
        state::clear(self.cache.as_ref()).await?;
        info!("Cleared HTML fetch state");
        Ok(())
    }

    /// Registers a delayed fetch due after the fetch delay; returns its fetch-at time.
    pub async fn schedule_fetch(&self) -> Result<i64, CacheError> {
        let fetch_at = self.now_secs() + FETCH_DELAY.as_secs() as i64;
        state::add_scheduled(self.cache.as_ref(), fetch_at).await?;
        Ok(fetch_at)
    }

    pub async fn finish_scheduled_fetch(&self, fetch_at: i64) -> Result<(), CacheError> {
        state::remove_scheduled(self.cache.as_ref(), fetch_at).await
    }

    pub async fn status(&self) -> Result<StatusReport, CacheError> {
        let now = self.now_secs();
        let cache = self.cache.as_ref();

        let in_progress = state::in_progress(cache).await?.into_iter().collect();
        let pending = state::pending(cache)
            .await?
            .into_iter()
            .map(|(domain, queued_at)| (domain, now - queued_at))
            .collect();
        let ready = self.ready_domains().await?;
        let scheduled_fetches = state::scheduled(cache).await?.len();

        Ok(StatusReport {
            in_progress,
            pending,
            ready,
            scheduled_fetches,
        })
    }
}
