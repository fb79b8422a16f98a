//! Session configuration.
//!
//! Pure domain type with no infrastructure dependencies; one instance is
//! injected into the session at construction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default capacity of a process log ring buffer (streamed output).
pub const DEFAULT_PROCESS_LOG_CAPACITY: usize = 1000;

/// Default capacity of a service log ring buffer.
pub const DEFAULT_SERVICE_LOG_CAPACITY: usize = 5000;

/// Default number of lines a pull-mode history fetch asks for.
pub const DEFAULT_HISTORY_FETCH_LIMIT: usize = 200;

/// Default pull-mode re-fetch interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

/// Default safety-timeout horizon in milliseconds (5 minutes).
pub const DEFAULT_SAFETY_TIMEOUT_MS: u64 = 300_000;

/// Tunables for one application session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Ring-buffer capacity for process logs, per (source, channel).
    pub process_log_capacity: usize,
    /// Ring-buffer capacity for service logs, per (source, channel).
    pub service_log_capacity: usize,
    /// Lines requested per pull-mode history fetch.
    pub history_fetch_limit: usize,
    /// Pull-mode re-fetch interval, milliseconds.
    pub poll_interval_ms: u64,
    /// Horizon after which a transient record without a terminal event is
    /// force-settled, milliseconds.
    pub safety_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            process_log_capacity: DEFAULT_PROCESS_LOG_CAPACITY,
            service_log_capacity: DEFAULT_SERVICE_LOG_CAPACITY,
            history_fetch_limit: DEFAULT_HISTORY_FETCH_LIMIT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            safety_timeout_ms: DEFAULT_SAFETY_TIMEOUT_MS,
        }
    }
}

impl SessionConfig {
    /// Pull-mode re-fetch interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Safety-timeout horizon as a [`Duration`].
    #[must_use]
    pub const fn safety_timeout(&self) -> Duration {
        Duration::from_millis(self.safety_timeout_ms)
    }

    /// Set the pull-mode re-fetch interval.
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, millis: u64) -> Self {
        self.poll_interval_ms = millis;
        self
    }

    /// Set the safety-timeout horizon.
    #[must_use]
    pub const fn with_safety_timeout_ms(mut self, millis: u64) -> Self {
        self.safety_timeout_ms = millis;
        self
    }

    /// Set the process log ring-buffer capacity.
    #[must_use]
    pub const fn with_process_log_capacity(mut self, capacity: usize) -> Self {
        self.process_log_capacity = capacity;
        self
    }
}
