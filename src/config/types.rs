//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration. Every option can also be supplied through an environment
//! variable (or a `.env` file loaded by the binary).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::constants::{
    DB_PATH, DEFAULT_MAX_CONCURRENCY, DEFAULT_REGISTRY_URL, DEFAULT_USER_AGENT,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Command-line entry point: global options followed by a subcommand.
#[derive(Debug, Parser)]
#[command(name = "site_monitor", version, about)]
pub struct Cli {
    /// Global configuration
    #[command(flatten)]
    pub config: Config,

    /// Operation to perform
    #[command(subcommand)]
    pub command: Command,
}

/// Library configuration.
///
/// Can be parsed from the command line (as part of [`Cli`]) or constructed
/// programmatically.
///
/// # Examples
///
/// ```no_run
/// use site_monitor::Config;
///
/// let config = Config {
///     worker_url: Some("https://worker.example.com".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// SQLite database path
    #[arg(long, env = "SITE_MONITOR_DB_PATH", default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Registry endpoint returning the registered sites
    #[arg(long, env = "REGISTRY_URL", default_value = DEFAULT_REGISTRY_URL)]
    pub registry_url: String,

    /// Token sent to the registry endpoint
    #[arg(long, env = "REGISTRY_TOKEN", hide_env_values = true)]
    pub registry_token: Option<String>,

    /// Base URL of the snapshot worker
    #[arg(long, env = "WORKER_URL")]
    pub worker_url: Option<String>,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Maximum number of sites probed concurrently
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DB_PATH),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            registry_token: None,
            worker_url: None,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Operator commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Sync registered sites and probe each one for the plugin
    Sync {
        /// Ignore the cached registry listing
        #[arg(long)]
        force: bool,
    },
    /// Force a registry refresh, purge local/staging sites and re-probe everything
    Refetch,
    /// Delete stored sites that match an exclusion pattern
    Cleanup,
    /// Queue HTML snapshots with the worker and fetch them after the settle delay
    FetchHtml {
        /// Clear in-flight state and fetch every domain regardless of snapshot age
        #[arg(long)]
        force: bool,
        /// Specific domains to fetch
        #[arg(long, num_args = 1..)]
        domains: Vec<String>,
    },
    /// Fetch results for every domain whose settle delay has elapsed
    FetchReady,
    /// Report the state of the snapshot pipeline
    HtmlStatus {
        /// Clear all pending/in-progress state
        #[arg(long)]
        clear: bool,
    },
    /// Print the stored HTML snapshot of a site
    Snapshot {
        /// Site URL as stored (trailing slash optional)
        site_url: String,
    },
}
