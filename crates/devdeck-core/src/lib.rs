//! Core domain types and port definitions for devdeck.
//!
//! This crate is the pure domain layer of the devdeck workspace: the process
//! lifecycle model, the log data model, the inbound/outbound event unions,
//! and the port (trait) abstractions for the process host and the UI event
//! sink. It performs no I/O and owns no timers; the session engine in
//! `devdeck-session` drives everything defined here.

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod domain;
pub mod events;
pub mod ports;

// Re-export commonly used types for convenience
pub use config::{
    DEFAULT_HISTORY_FETCH_LIMIT, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PROCESS_LOG_CAPACITY,
    DEFAULT_SAFETY_TIMEOUT_MS, DEFAULT_SERVICE_LOG_CAPACITY, SessionConfig,
};
pub use domain::{
    DeliveryMode, LogChannel, LogEntry, LogLevel, ProcessPhase, ProcessRecord, ProcessSnapshot,
};
pub use events::{BuildStatus, HostEvent, SessionEvent};
pub use ports::{
    CommandError, HostError, NoopSink, ProcessHostPort, RunningProcess, SessionEventSink, SpawnAck,
};

// Silence unused dev-dependency warnings until we add mock-based tests
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tokio_test as _;
