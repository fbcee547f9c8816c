//! Registry sync.
//!
//! Fetches the authoritative list of registered sites from the upstream
//! registry, caches it for an hour, and reconciles it into the `sites` table.
//! Upstream failures never surface as errors: they resolve to an empty list.

mod sync;
mod week;

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::cache::CacheStore;
use crate::config::{CACHE_KEY_REGISTERED_SITES, CACHE_TTL, REGISTRY_TIMEOUT};

pub use sync::{cleanup_excluded, prepare_site, sync_to_storage, SkipReason, SyncReport};
pub use week::convert_week_to_date;

/// Client for the upstream site registry.
pub struct RegistryClient {
    client: reqwest::Client,
    registry_url: String,
    token: Option<String>,
    cache: Arc<dyn CacheStore>,
}

impl RegistryClient {
    pub fn new(
        client: reqwest::Client,
        registry_url: impl Into<String>,
        token: Option<String>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            client,
            registry_url: registry_url.into(),
            token,
            cache,
        }
    }

    /// Returns the registered site records, served from cache when possible.
    ///
    /// `force_refresh` drops the cached listing first. A failed or empty
    /// upstream response is not cached, so the next call retries.
    pub async fn fetch_sites(&self, force_refresh: bool) -> Vec<Value> {
        if force_refresh {
            if let Err(e) = self.cache.forget(CACHE_KEY_REGISTERED_SITES).await {
                warn!("Failed to clear cached registry listing: {e}");
            }
        } else {
            match self.cache.get(CACHE_KEY_REGISTERED_SITES).await {
                Ok(Some(Value::Array(sites))) => {
                    debug!("Using cached registry listing ({} sites)", sites.len());
                    return sites;
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to read cached registry listing: {e}"),
            }
        }

        let sites = self.fetch_from_upstream().await;
        if !sites.is_empty() {
            if let Err(e) = self
                .cache
                .put(
                    CACHE_KEY_REGISTERED_SITES,
                    Value::Array(sites.clone()),
                    CACHE_TTL,
                )
                .await
            {
                warn!("Failed to cache registry listing: {e}");
            }
        }
        sites
    }

    async fn fetch_from_upstream(&self) -> Vec<Value> {
        let mut url = match url::Url::parse(&self.registry_url) {
            Ok(url) => url,
            Err(e) => {
                error!("Invalid registry URL {}: {e}", self.registry_url);
                return Vec::new();
            }
        };
        if let Some(token) = &self.token {
            url.query_pairs_mut().append_pair("token", token);
        }

        let response = match self
            .client
            .get(url)
            .timeout(REGISTRY_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Exception fetching registered sites: {e}");
                return Vec::new();
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to read registry response body: {e}");
                return Vec::new();
            }
        };

        if !status.is_success() {
            error!(
                "Failed to fetch registered sites: HTTP {}: {}",
                status.as_u16(),
                body
            );
            return Vec::new();
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(sites)) => {
                info!("Fetched {} registered sites", sites.len());
                sites
            }
            Ok(_) | Err(_) => {
                error!("Invalid JSON format from registered sites API");
                Vec::new()
            }
        }
    }
}
