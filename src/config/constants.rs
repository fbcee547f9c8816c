//! Configuration constants.
//!
//! This module defines the operational parameters shared by the registry sync,
//! the stats prober and the snapshot coordinator: timeouts, TTLs, cache keys and
//! the identity of the companion plugin.

use std::time::Duration;

/// Default SQLite database path
pub const DB_PATH: &str = "./site_monitor.db";

/// Default registry endpoint listing the registered sites
pub const DEFAULT_REGISTRY_URL: &str =
    "https://progressplanner.com/wp-json/progress-planner-saas/v1/registered-sites";

/// Default User-Agent string for outbound HTTP requests.
pub const DEFAULT_USER_AGENT: &str = concat!("site_monitor/", env!("CARGO_PKG_VERSION"));

/// Default number of sites probed at the same time during a stats pass
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

// Network operation timeouts
/// Timeout for the registry listing request
pub const REGISTRY_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for a single plugin stats probe against a site
pub const STATS_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Timeout for requests to the snapshot worker (enqueue and result retrieval)
pub const WORKER_REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

// Transient state
/// TTL applied to every transient cache entry (registry list, in-progress set,
/// pending map, scheduled fetches)
pub const CACHE_TTL: Duration = Duration::from_secs(3600);
/// Cache key holding the last registry listing
pub const CACHE_KEY_REGISTERED_SITES: &str = "registered_sites_data";
/// Cache key holding the set of domains submitted to the worker
pub const CACHE_KEY_IN_PROGRESS: &str = "html_fetch_in_progress";
/// Cache key holding the domain -> enqueue timestamp map
pub const CACHE_KEY_PENDING: &str = "html_fetch_pending";
/// Cache key holding the fetch-at timestamps of scheduled delayed fetches
pub const CACHE_KEY_SCHEDULED: &str = "html_fetch_scheduled";

// Snapshot pipeline timing
/// Minimum age of a pending entry before its result is retrieved.
/// The worker renders pages out of band and needs this long to settle.
pub const FETCH_DELAY: Duration = Duration::from_secs(60);
/// Snapshots younger than this are not refetched unless forced
pub const SNAPSHOT_FRESHNESS: Duration = Duration::from_secs(3600);

// Companion plugin
/// REST namespace of the companion plugin
pub const PLUGIN_NAMESPACE: &str = "progress-planner";
/// Plugin identifier reported in the `plugins` list of the stats endpoint
pub const PLUGIN_SLUG: &str = "progress-planner/progress-planner.php";
/// Known-invalid license key used to detect the plugin on unlicensed sites
pub const PLACEHOLDER_LICENSE_KEY: &str = "123";
/// Error code the plugin answers with when the key fails validation
pub const INVALID_PARAM_CODE: &str = "rest_invalid_param";

/// Substrings (matched case-insensitively) marking local and staging sites
pub const EXCLUDED_SITE_PATTERNS: &[&str] =
    &[".test", ".local", "localhost", "playground.wordpress.net"];

// Error message size limits
/// Maximum error message length in characters (2000 chars)
/// Error messages longer than this are truncated with a note about the original length
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 2000;
