//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the session core expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - Express **intent**, not implementation detail
//! - No process-spawning, port-allocation, or config-file concerns in
//!   signatures — those belong to the host behind `ProcessHostPort`
//! - Must support mock hosts for tests and alternative transports
//!   (IPC bridge, local supervisor, remote agent)

mod event_sink;
mod host;

use thiserror::Error;

pub use event_sink::{NoopSink, SessionEventSink};
pub use host::{HostError, ProcessHostPort, RunningProcess, SpawnAck};

/// Errors surfaced to direct callers of manager commands.
///
/// Only command-issuance failures are returned as errors; asynchronous
/// event-path failures are contained and logged instead.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The process is already running; a second start is refused.
    #[error("Process {0} is already running")]
    AlreadyRunning(String),

    /// The process is not tracked, so there is nothing to stop.
    #[error("Process {0} is not running")]
    NotRunning(String),

    /// The host rejected or failed the underlying command.
    #[error(transparent)]
    Host(#[from] HostError),
}

impl CommandError {
    /// Returns true when the failure came from the host rather than from
    /// local state validation.
    #[must_use]
    pub const fn is_host_failure(&self) -> bool {
        matches!(self, Self::Host(_))
    }
}
