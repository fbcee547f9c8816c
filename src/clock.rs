//! Time source abstraction.
//!
//! Pending timestamps, readiness checks, snapshot freshness and cache expiry all
//! read "now" through a [`Clock`], so the 60 second and one hour boundaries can
//! be exercised deterministically. Waits go through the clock too, so a
//! [`ManualClock`] can skip them.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Source of the current time.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Waits for `by` as measured by this clock.
    async fn sleep(&self, by: std::time::Duration);
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, by: std::time::Duration) {
        tokio::time::sleep(by).await;
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns immediately after moving the clock forward by `by`.
    async fn sleep(&self, by: std::time::Duration) {
        self.advance(Duration::from_std(by).unwrap_or(Duration::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::seconds(59));
        assert_eq!(clock.now(), start + Duration::seconds(59));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_advances_without_waiting() {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let began = std::time::Instant::now();
        clock.sleep(std::time::Duration::from_secs(60)).await;
        assert_eq!(clock.now(), start + Duration::seconds(60));
        assert!(began.elapsed() < std::time::Duration::from_secs(5));
    }
}
