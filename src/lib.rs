//! site_monitor library: registered site monitoring
//!
//! Keeps a local copy of the sites registered with an upstream registry,
//! probes each site for the companion WordPress plugin (and its version when
//! the site is licensed), and collects rendered HTML snapshots of every site
//! through an external rendering worker.
//!
//! # Example
//!
//! ```no_run
//! use site_monitor::{AppContext, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     registry_token: Some("secret".to_string()),
//!     ..Default::default()
//! };
//! let ctx = AppContext::init(config).await?;
//!
//! let sites = ctx.registry().fetch_sites(false).await;
//! site_monitor::registry::sync_to_storage(&ctx.pool, &sites, ctx.clock.now()).await;
//!
//! let report = ctx.prober().fetch_all_site_stats().await?;
//! println!("{} of {} sites run the plugin", report.successful, report.total);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

pub mod app;
pub mod cache;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error_handling;
pub mod initialization;
pub mod probe;
pub mod registry;
pub mod snapshot;
pub mod storage;
mod utils;

// Re-export public API
pub use app::{run_command, AppContext};
pub use cache::{CacheStore, MemoryCacheStore, SqliteCacheStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Cli, Command, Config, LogFormat, LogLevel};
pub use probe::{SiteStatsProber, StatsReport};
pub use registry::RegistryClient;
pub use snapshot::{FetchReport, QueueOutcome, SnapshotCoordinator, StatusReport};
pub use storage::run_migrations;
