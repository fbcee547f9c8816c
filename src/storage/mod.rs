// storage/mod.rs
// Database operations module

pub mod migrations;
pub mod models;
pub mod pool;
pub mod sites;
pub mod snapshots;
pub mod stats;
pub mod test_helpers;

// Re-export commonly used items
pub use migrations::run_migrations;
pub use models::{Site, SiteSnapshot, SiteStat, SiteUpsert};
pub use pool::init_db_pool_with_path;
pub use sites::{
    count_sites, delete_sites, find_site_by_url, find_site_matching_domain, list_sites,
    upsert_site,
};
pub use snapshots::{latest_snapshot_for_site, latest_snapshot_time, upsert_snapshot};
pub use stats::{find_site_stat, last_stats_run, upsert_site_stat};
