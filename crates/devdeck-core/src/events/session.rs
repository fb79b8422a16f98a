//! Outbound events published to the UI sink.

use serde::{Deserialize, Serialize};

use crate::domain::ProcessSnapshot;

/// State-change notifications for UI consumers.
///
/// Consumers read authoritative state through the manager and log store
/// accessors; these events only signal *that* something changed and carry the
/// fresh snapshot for convenience.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A tracked process's observable state changed.
    ProcessStatus {
        /// Fresh snapshot of the process.
        process: ProcessSnapshot,
    },

    /// Informational build progress for a process; no state change.
    ProcessProgress {
        /// Tracked process id.
        id: String,
        /// Progress text reported by the host.
        message: String,
    },

    /// A process left the table (confirmed stopped).
    ProcessRemoved {
        /// Tracked process id.
        id: String,
    },
}

impl SessionEvent {
    /// Get the event name for wire protocols.
    ///
    /// This provides consistent event naming across transports.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::ProcessStatus { .. } => "process:status",
            Self::ProcessProgress { .. } => "process:progress",
            Self::ProcessRemoved { .. } => "process:removed",
        }
    }

    /// Create a status event from a snapshot.
    #[must_use]
    pub const fn process_status(process: ProcessSnapshot) -> Self {
        Self::ProcessStatus { process }
    }

    /// Create a progress event.
    pub fn process_progress(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessProgress {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a removal event.
    pub fn process_removed(id: impl Into<String>) -> Self {
        Self::ProcessRemoved { id: id.into() }
    }
}
