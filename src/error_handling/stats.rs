//! Processing statistics tracking.
//!
//! Thread-safe counters for probe failures and informational outcomes,
//! shared by the concurrently running probes of one stats pass.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::{ProbeFailure, ProbeInfo};

/// Thread-safe processing statistics tracker.
///
/// Every category is initialised to zero on creation, so lookups never miss.
pub struct ProcessingStats {
    failures: HashMap<ProbeFailure, AtomicUsize>,
    info: HashMap<ProbeInfo, AtomicUsize>,
}

impl ProcessingStats {
    pub fn new() -> Self {
        let mut failures = HashMap::new();
        for failure in ProbeFailure::iter() {
            failures.insert(failure, AtomicUsize::new(0));
        }

        let mut info = HashMap::new();
        for info_type in ProbeInfo::iter() {
            info.insert(info_type, AtomicUsize::new(0));
        }

        ProcessingStats { failures, info }
    }

    /// Increment a failure counter.
    pub fn increment_failure(&self, failure: ProbeFailure) {
        if let Some(counter) = self.failures.get(&failure) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment failure counter for {:?} which is not in the map",
                failure
            );
        }
    }

    /// Increment an info counter.
    pub fn increment_info(&self, info: ProbeInfo) {
        if let Some(counter) = self.info.get(&info) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment info counter for {:?} which is not in the map",
                info
            );
        }
    }

    pub fn get_failure_count(&self, failure: ProbeFailure) -> usize {
        self.failures
            .get(&failure)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn get_info_count(&self, info: ProbeInfo) -> usize {
        self.info
            .get(&info)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn total_failures(&self) -> usize {
        self.failures.values().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    pub fn total_info(&self) -> usize {
        self.info.values().map(|c| c.load(Ordering::Relaxed)).sum()
    }
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}
