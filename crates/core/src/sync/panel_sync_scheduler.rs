//! Core scheduler constants/helpers for panel sync.

use std::time::Duration;

/// Delay between the end of one refresh (or write) and the next refresh.
pub const DEVICE_POLL_INTERVAL_MS: u64 = 1000;

/// Upper bound on how long a deferred write sleeps before re-checking the
/// poll cursor when no wake-up arrives.
pub const WRITE_RETRY_DELAY_MS: u64 = 100;

/// Timing knobs for the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    pub write_retry_delay: Duration,
}

impl SyncConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_write_retry_delay(mut self, delay: Duration) -> Self {
        self.write_retry_delay = delay;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEVICE_POLL_INTERVAL_MS),
            write_retry_delay: Duration::from_millis(WRITE_RETRY_DELAY_MS),
        }
    }
}
