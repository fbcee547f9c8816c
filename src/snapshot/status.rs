//! Snapshot pipeline status report.

use std::fmt;

/// Number of domains listed per section before the list is cut short.
const LIST_LIMIT: usize = 10;
/// Pending domains are listed individually up to this many.
const PENDING_DETAIL_LIMIT: usize = 5;

/// Point-in-time view of the transient snapshot state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Domains submitted to the worker
    pub in_progress: Vec<String>,
    /// Pending domains with their age in seconds
    pub pending: Vec<(String, i64)>,
    /// Pending domains at least the fetch delay old
    pub ready: Vec<String>,
    /// Delayed fetches registered and not yet finished
    pub scheduled_fetches: usize,
}

impl StatusReport {
    pub fn oldest_pending_age(&self) -> Option<i64> {
        self.pending.iter().map(|(_, age)| *age).max()
    }

    pub fn newest_pending_age(&self) -> Option<i64> {
        self.pending.iter().map(|(_, age)| *age).min()
    }

    /// Inconsistencies an operator should look at.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.ready.is_empty() && self.scheduled_fetches == 0 {
            warnings.push(
                "Domains are ready to fetch but no fetch is scheduled. Run `site_monitor fetch-ready`."
                    .to_string(),
            );
        }
        if !self.in_progress.is_empty() && self.pending.is_empty() {
            warnings.push(
                "Domains are in progress but not marked as pending. Consider `site_monitor html-status --clear`."
                    .to_string(),
            );
        }
        warnings
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[String]) -> fmt::Result {
    if items.len() > LIST_LIMIT {
        writeln!(f, "  (Showing first {} of {})", LIST_LIMIT, items.len())?;
    }
    for item in items.iter().take(LIST_LIMIT) {
        writeln!(f, "  - {item}")?;
    }
    Ok(())
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HTML Fetch Status Report")?;
        writeln!(f, "=========================")?;
        writeln!(f)?;

        writeln!(f, "Domains queued with worker: {}", self.in_progress.len())?;
        write_list(f, &self.in_progress)?;
        writeln!(f)?;

        writeln!(f, "Domains pending HTML fetch: {}", self.pending.len())?;
        if let (Some(oldest), Some(newest)) = (self.oldest_pending_age(), self.newest_pending_age()) {
            writeln!(f, "  Oldest: {oldest} seconds ago")?;
            writeln!(f, "  Newest: {newest} seconds ago")?;
            if self.pending.len() <= PENDING_DETAIL_LIMIT {
                for (domain, age) in &self.pending {
                    writeln!(f, "  - {domain} ({age} seconds ago)")?;
                }
            }
        }
        writeln!(f)?;

        writeln!(f, "Domains ready to fetch (>60s old): {}", self.ready.len())?;
        write_list(f, &self.ready)?;
        writeln!(f)?;

        writeln!(f, "Scheduled fetches: {}", self.scheduled_fetches)?;

        for warning in self.warnings() {
            writeln!(f)?;
            writeln!(f, "WARNING: {warning}")?;
        }
        Ok(())
    }
}
