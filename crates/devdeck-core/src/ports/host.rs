//! Process host port definition.
//!
//! The process host is the external collaborator that actually spawns and
//! kills OS processes and performs port/file I/O. The session core never
//! does any of that itself: it issues intent-based commands over this port
//! and tracks the asynchronous event feed the host emits in return.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{LogChannel, LogEntry};

/// Acknowledgement returned by a start/restart command.
///
/// The ack is optimistic: the pid and port it carries may be superseded by a
/// later lifecycle event for the same id, and callers reconcile per field by
/// arrival order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnAck {
    /// OS process id of the spawned process.
    pub pid: u32,
    /// Bound port, when the host already knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// One entry of the host's running-process snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningProcess {
    /// Tracked process id.
    pub id: String,
    /// OS process id.
    pub pid: u32,
    /// Bound port, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Errors reported by the process host.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host understood the command and refused it.
    #[error("Host rejected the command: {0}")]
    Rejected(String),

    /// The host could not be reached or the round trip failed.
    #[error("Host unreachable: {0}")]
    Unreachable(String),

    /// The host answered with something the session cannot interpret.
    #[error("Malformed host response: {0}")]
    Protocol(String),

    /// Internal host-side failure.
    #[error("Internal host error: {0}")]
    Internal(String),
}

impl HostError {
    /// Returns true if this error indicates a transport problem where the
    /// command may never have reached the host.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

/// Outbound command interface to the process host.
///
/// Every command suspends the caller only for the round-trip
/// acknowledgement, never for the duration of the process's own run;
/// lifecycle outcomes arrive asynchronously as [`crate::events::HostEvent`]s.
#[async_trait]
pub trait ProcessHostPort: Send + Sync {
    /// Start a tracked process.
    ///
    /// A successful ack means the host accepted and spawned; it does not
    /// mean the process finished building or launching.
    async fn start_process(&self, id: &str) -> Result<SpawnAck, HostError>;

    /// Stop a tracked process. Confirmation arrives as a `process_stopped`
    /// event, not in the ack.
    async fn stop_process(&self, id: &str) -> Result<(), HostError>;

    /// Restart a tracked process.
    async fn restart_process(&self, id: &str) -> Result<SpawnAck, HostError>;

    /// Snapshot of processes the host currently runs.
    ///
    /// Used once at session init to seed the tracker with processes that
    /// were already running before this session attached.
    async fn list_running(&self) -> Result<Vec<RunningProcess>, HostError>;

    /// Ask the host to push live log entries for `(source, channel)`.
    ///
    /// Returns `Ok(false)` when the stream is already active or the host
    /// refuses; callers fall back to pull mode in that case.
    async fn start_log_stream(&self, source: &str, channel: LogChannel)
    -> Result<bool, HostError>;

    /// Stop a live log stream. Returns whether a stream was actually active.
    async fn stop_log_stream(&self, source: &str, channel: LogChannel) -> Result<bool, HostError>;

    /// Fetch the most recent `max_lines` log entries for `(source, channel)`.
    async fn fetch_log_history(
        &self,
        source: &str,
        channel: LogChannel,
        max_lines: usize,
    ) -> Result<Vec<LogEntry>, HostError>;

    /// Clear the host-side log history for `(source, channel)`.
    async fn clear_log_history(&self, source: &str, channel: LogChannel) -> Result<(), HostError>;
}
