//! Operator commands.
//!
//! Each command returns a summary for the CLI to print; only configuration,
//! database and cache failures surface as errors.

use anyhow::{bail, Context, Result};
use log::{info, warn};

use super::context::AppContext;
use crate::config::FETCH_DELAY;
use crate::domain::canonical_site_url;
use crate::probe::StatsReport;
use crate::registry::{cleanup_excluded, sync_to_storage, SyncReport};
use crate::snapshot::{FetchReport, QueueOutcome, SnapshotCoordinator, StatusReport};
use crate::storage::{find_site_by_url, latest_snapshot_for_site};

/// Registry sync followed by a stats pass.
pub struct SyncSummary {
    pub sync: SyncReport,
    /// Local/staging sites deleted afterwards (refetch only)
    pub removed: u64,
    pub stats: StatsReport,
}

impl SyncSummary {
    /// One-line result of the refetch action.
    pub fn refetch_message(&self) -> String {
        let mut message = format!(
            "Data refresh complete! {} sites synced. {} sites probed.",
            self.sync.received, self.stats.total
        );
        if self.removed > 0 {
            message.push_str(&format!(" {} local/staging site(s) removed.", self.removed));
        }
        message
    }
}

/// Fetches the registry, stores the sites and probes every stored site.
///
/// # Errors
///
/// Fails when the registry returned no sites, or the database cannot be read.
pub async fn sync(ctx: &AppContext, force_refresh: bool) -> Result<SyncSummary> {
    info!("Fetching registered sites...");
    let records = ctx.registry().fetch_sites(force_refresh).await;
    if records.is_empty() {
        bail!("No sites data retrieved from the registry");
    }
    info!("Found {} registered sites", records.len());

    let sync = sync_to_storage(&ctx.pool, &records, ctx.clock.now()).await;
    let stats = ctx
        .prober()
        .fetch_all_site_stats()
        .await
        .context("Failed to load sites for the stats pass")?;

    Ok(SyncSummary {
        sync,
        removed: 0,
        stats,
    })
}

/// Refresh action: forced registry fetch, sync, exclusion cleanup, stats pass.
///
/// Unlike [`sync`], an empty registry answer is not an error; the stored
/// sites are still cleaned up and probed.
pub async fn refetch(ctx: &AppContext) -> Result<SyncSummary> {
    let records = ctx.registry().fetch_sites(true).await;
    let sync = sync_to_storage(&ctx.pool, &records, ctx.clock.now()).await;
    let removed = cleanup_excluded(&ctx.pool)
        .await
        .context("Failed to clean up local/staging sites")?;
    let stats = ctx
        .prober()
        .fetch_all_site_stats()
        .await
        .context("Failed to load sites for the stats pass")?;

    Ok(SyncSummary {
        sync,
        removed,
        stats,
    })
}

pub async fn cleanup(ctx: &AppContext) -> Result<u64> {
    cleanup_excluded(&ctx.pool)
        .await
        .context("Failed to clean up local/staging sites")
}

/// Outcome of the two-phase snapshot pipeline.
#[derive(Debug, Default)]
pub struct FetchHtmlSummary {
    /// Domains accepted by the worker in this run
    pub queued: Vec<String>,
    /// Set when the worker rejected the submission
    pub queue_error: Option<String>,
    pub fetch: FetchReport,
}

/// Queues snapshots and fetches them once the settle delay has passed.
///
/// `domains` defaults to every site host whose snapshot is missing or stale
/// (every host when `force`). With `force` the in-flight state is cleared
/// first.
pub async fn fetch_html(
    ctx: &AppContext,
    force: bool,
    domains: Vec<String>,
) -> Result<FetchHtmlSummary> {
    let coordinator = ctx.coordinator()?;

    if force {
        coordinator.clear().await?;
    }

    let domains = if domains.is_empty() {
        coordinator.domains_needing_fetch(force).await?
    } else {
        domains
    };
    if domains.is_empty() {
        info!("No domains need an HTML snapshot");
        return Ok(FetchHtmlSummary::default());
    }

    let queued = match coordinator.queue(&domains).await? {
        QueueOutcome::Queued(queued) => queued,
        QueueOutcome::NothingToQueue => return Ok(FetchHtmlSummary::default()),
        QueueOutcome::Failed(message) => {
            return Ok(FetchHtmlSummary {
                queue_error: Some(message),
                ..Default::default()
            })
        }
    };

    let fetch_at = coordinator.schedule_fetch().await?;
    info!(
        "HTML content will be fetched in approximately {} seconds",
        FETCH_DELAY.as_secs()
    );
    ctx.clock.sleep(FETCH_DELAY).await;

    let result = fetch_queued(&coordinator, &queued).await;
    if let Err(e) = coordinator.finish_scheduled_fetch(fetch_at).await {
        warn!("Failed to clear scheduled fetch marker: {e}");
    }

    Ok(FetchHtmlSummary {
        queued,
        queue_error: None,
        fetch: result?,
    })
}

async fn fetch_queued(
    coordinator: &SnapshotCoordinator,
    queued: &[String],
) -> Result<FetchReport> {
    let ready = coordinator.ready_domains().await?;
    let targets: Vec<String> = queued
        .iter()
        .filter(|domain| ready.contains(*domain))
        .cloned()
        .collect();
    Ok(coordinator.fetch(&targets).await?)
}

/// Fetches every pending domain whose settle delay has passed.
pub async fn fetch_ready(ctx: &AppContext) -> Result<FetchReport> {
    let coordinator = ctx.coordinator()?;
    let ready = coordinator.ready_domains().await?;
    if ready.is_empty() {
        info!("No domains ready to fetch");
        return Ok(FetchReport::default());
    }
    info!("Fetching {} ready domains", ready.len());
    Ok(coordinator.fetch(&ready).await?)
}

/// Status report, or `None` after clearing the state when `clear` is set.
pub async fn html_status(ctx: &AppContext, clear: bool) -> Result<Option<StatusReport>> {
    let coordinator = ctx.coordinator()?;
    if clear {
        coordinator.clear().await?;
        return Ok(None);
    }
    Ok(Some(coordinator.status().await?))
}

/// Stored HTML of the latest snapshot of `site_url`.
///
/// # Errors
///
/// Fails when the site is unknown or has no snapshot with content.
pub async fn snapshot_html(ctx: &AppContext, site_url: &str) -> Result<String> {
    let site_url = canonical_site_url(site_url);
    let Some(site) = find_site_by_url(&ctx.pool, &site_url).await? else {
        bail!("No site registered as {site_url}");
    };
    match latest_snapshot_for_site(&ctx.pool, site.id).await? {
        Some(snapshot) if !snapshot.html_content.is_empty() => Ok(snapshot.html_content),
        _ => bail!("No HTML snapshot found for {site_url}"),
    }
}
