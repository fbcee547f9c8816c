//! Error handling and processing statistics.
//!
//! This module provides:
//! - Error type definitions for initialization, database and cache failures
//! - Probe failure/info categories
//! - Processing statistics tracking
//! - Transport error categorization
//!
//! Only initialization, database and cache errors propagate to callers.
//! Upstream failures are recorded as probe outcomes instead.

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{categorize_reqwest_error, describe_reqwest_error};
pub use stats::ProcessingStats;
pub use types::{CacheError, DatabaseError, InitializationError, ProbeFailure, ProbeInfo};

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_processing_stats_initialization() {
        let stats = ProcessingStats::new();
        for failure in ProbeFailure::iter() {
            assert_eq!(stats.get_failure_count(failure), 0);
        }
        for info in ProbeInfo::iter() {
            assert_eq!(stats.get_info_count(info), 0);
        }
    }

    #[test]
    fn test_processing_stats_totals() {
        let stats = ProcessingStats::new();
        stats.increment_failure(ProbeFailure::PluginNotActive);
        stats.increment_failure(ProbeFailure::PluginNotActive);
        stats.increment_failure(ProbeFailure::ConnectionFailed);
        stats.increment_info(ProbeInfo::ActiveWithoutLicense);

        assert_eq!(stats.get_failure_count(ProbeFailure::PluginNotActive), 2);
        assert_eq!(stats.total_failures(), 3);
        assert_eq!(stats.total_info(), 1);
    }
}
