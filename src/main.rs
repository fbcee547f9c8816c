//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `site_monitor` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use site_monitor::initialization::init_logger_with;
use site_monitor::{run_command, AppContext, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Load REGISTRY_TOKEN, WORKER_URL etc. from .env in the current directory,
    // falling back to one next to the executable
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();

    let log_level = cli.config.log_level.clone();
    let log_format = cli.config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    let result = match AppContext::init(cli.config).await {
        Ok(ctx) => run_command(&ctx, cli.command).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("site_monitor error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}
