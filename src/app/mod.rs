//! Command layer.
//!
//! Wires configuration into the registry client, prober and snapshot
//! coordinator, runs one operator command and prints its result.

pub mod commands;
pub mod context;
pub mod statistics;

use anyhow::{bail, Result};
use log::{error, info, warn};

use crate::config::Command;
use crate::snapshot::FetchReport;

// Re-export public API
pub use context::AppContext;
pub use statistics::{format_stats_summary, format_table, print_probe_statistics};

fn print_fetch_report(report: &FetchReport) {
    println!(
        "HTML fetch finished: {} successful, {} failed",
        report.successful.len(),
        report.failed.len()
    );
    for domain in &report.failed {
        println!("  - failed: {domain}");
    }
}

/// Runs `command` against `ctx` and prints its outcome to stdout.
///
/// # Errors
///
/// Propagates configuration, database and cache failures, and reports an
/// empty registry on `sync` or a rejected worker submission as errors.
pub async fn run_command(ctx: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Sync { force } => {
            let summary = commands::sync(ctx, force).await?;
            print_probe_statistics(&summary.stats.stats);
            info!("Data fetch completed!");
            println!("{}", format_stats_summary(&summary.stats));
        }
        Command::Refetch => {
            let summary = commands::refetch(ctx).await?;
            print_probe_statistics(&summary.stats.stats);
            println!("{}", summary.refetch_message());
            println!("{}", format_stats_summary(&summary.stats));
        }
        Command::Cleanup => {
            let removed = commands::cleanup(ctx).await?;
            println!("{removed} local/staging site(s) removed");
        }
        Command::FetchHtml { force, domains } => {
            let summary = commands::fetch_html(ctx, force, domains).await?;
            if let Some(message) = summary.queue_error {
                error!("Worker rejected the submission: {message}");
                bail!("Failed to queue domains with the worker");
            }
            if summary.queued.is_empty() {
                println!("Nothing to fetch");
            } else {
                println!("Queued {} domains", summary.queued.len());
                print_fetch_report(&summary.fetch);
            }
        }
        Command::FetchReady => {
            let report = commands::fetch_ready(ctx).await?;
            print_fetch_report(&report);
        }
        Command::HtmlStatus { clear } => match commands::html_status(ctx, clear).await? {
            Some(report) => {
                for warning in report.warnings() {
                    warn!("{warning}");
                }
                print!("{report}");
            }
            None => println!("Cleared all HTML fetch state"),
        },
        Command::Snapshot { site_url } => {
            let html = commands::snapshot_html(ctx, &site_url).await?;
            println!("{html}");
        }
    }
    Ok(())
}
