//! Reconciler tuning.

use std::time::Duration;

/// Retry behaviour for unsynced writes.
///
/// Retries are caller-initiated by default (`Reconciler::retry_unsynced`).
/// With `auto_retry` on, the app also runs a `RetryWorker` that replays the
/// ledger on `retry_interval`, backing off exponentially while the remote
/// keeps failing.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub auto_retry: bool,
    /// How often the worker checks the ledger when things are healthy.
    pub retry_interval: Duration,
    /// First backoff step after a failed pass.
    pub retry_base_delay: Duration,
    /// Backoff cap.
    pub retry_max_delay: Duration,
    /// A pending write that failed this many times is left for the caller;
    /// the worker stops replaying it. 0 = no limit.
    pub max_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_retry: false,
            retry_interval: Duration::from_secs(30),
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(300),
            max_attempts: 0,
        }
    }
}

impl SyncConfig {
    pub fn with_auto_retry(mut self, enabled: bool) -> Self {
        self.auto_retry = enabled;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base_delay = base;
        self.retry_max_delay = max.max(base);
        self
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// Delay before the next pass after `consecutive_failures` failed ones
    /// (exponential, capped). Zero failures means the regular interval.
    pub fn delay_after_failures(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return self.retry_interval;
        }
        let factor = 1u32 << (consecutive_failures - 1).min(16);
        self.retry_base_delay
            .saturating_mul(factor)
            .min(self.retry_max_delay)
    }

    /// Whether the worker may replay a write that already failed `attempts`
    /// times.
    pub fn should_retry(&self, attempts: u32) -> bool {
        self.max_attempts == 0 || attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = SyncConfig::default()
            .with_retry_interval(Duration::from_secs(30))
            .with_backoff(Duration::from_secs(1), Duration::from_secs(10));

        assert_eq!(config.delay_after_failures(0), Duration::from_secs(30));
        assert_eq!(config.delay_after_failures(1), Duration::from_secs(1));
        assert_eq!(config.delay_after_failures(2), Duration::from_secs(2));
        assert_eq!(config.delay_after_failures(4), Duration::from_secs(8));
        assert_eq!(config.delay_after_failures(5), Duration::from_secs(10));
        assert_eq!(config.delay_after_failures(40), Duration::from_secs(10));
    }

    #[test]
    fn attempt_limit_is_optional() {
        assert!(SyncConfig::default().should_retry(1_000));

        let limited = SyncConfig::default().with_max_attempts(3);
        assert!(limited.should_retry(2));
        assert!(!limited.should_retry(3));
    }
}
