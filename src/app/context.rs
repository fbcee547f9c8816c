//! Shared resources for one command invocation.

use std::sync::Arc;

use log::{debug, warn};
use sqlx::SqlitePool;

use crate::cache::{CacheStore, SqliteCacheStore};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error_handling::InitializationError;
use crate::initialization::{init_client, init_storage};
use crate::probe::SiteStatsProber;
use crate::registry::RegistryClient;
use crate::snapshot::SnapshotCoordinator;

/// Database, cache, clock and HTTP client wired together from a [`Config`].
pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub cache: Arc<dyn CacheStore>,
    pub clock: Arc<dyn Clock>,
    pub client: reqwest::Client,
}

impl AppContext {
    /// Opens the configured database and builds the production wiring:
    /// wall clock, database-backed cache, shared HTTP client.
    pub async fn init(config: Config) -> Result<Self, InitializationError> {
        let pool = init_storage(&config.db_path).await?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let cache = SqliteCacheStore::new(pool.clone(), clock.clone());
        match cache.purge_expired().await {
            Ok(0) => {}
            Ok(purged) => debug!("Purged {purged} expired cache entries"),
            Err(e) => warn!("Failed to purge expired cache entries: {e}"),
        }

        let client = init_client(&config)?;
        Ok(Self::new(config, pool, Arc::new(cache), clock, client))
    }

    pub fn new(
        config: Config,
        pool: SqlitePool,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            config,
            pool,
            cache,
            clock,
            client,
        }
    }

    pub fn registry(&self) -> RegistryClient {
        RegistryClient::new(
            self.client.clone(),
            self.config.registry_url.clone(),
            self.config.registry_token.clone(),
            self.cache.clone(),
        )
    }

    pub fn prober(&self) -> SiteStatsProber {
        SiteStatsProber::new(
            self.client.clone(),
            self.pool.clone(),
            self.clock.clone(),
            self.config.max_concurrency,
        )
    }

    /// # Errors
    ///
    /// Returns `InitializationError::ConfigError` when no worker URL is configured.
    pub fn coordinator(&self) -> Result<SnapshotCoordinator, InitializationError> {
        let worker_url = self
            .config
            .worker_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                InitializationError::ConfigError(
                    "No worker URL configured (set --worker-url or WORKER_URL)".to_string(),
                )
            })?;
        Ok(SnapshotCoordinator::new(
            self.client.clone(),
            worker_url,
            self.pool.clone(),
            self.cache.clone(),
            self.clock.clone(),
        ))
    }
}
