//! Inbound events pushed by the process host.

use serde::{Deserialize, Serialize};

use crate::domain::LogChannel;

/// Build stage reported by a `build_status` event.
///
/// `progress` is a pseudo-stage: it never changes a process's phase, it only
/// republishes its message to observers (long build output without a true
/// phase change).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    /// The host accepted the start and is preparing the build.
    Starting,
    /// The build is running.
    Compiling,
    /// The build finished.
    Compiled,
    /// The process is up and serving.
    Launched,
    /// The build or launch failed.
    Error,
    /// Informational progress only; no phase change.
    Progress,
}

impl BuildStatus {
    /// The process phase this stage maps to, if it maps to one at all.
    #[must_use]
    pub const fn as_phase(self) -> Option<crate::domain::ProcessPhase> {
        use crate::domain::ProcessPhase;
        match self {
            Self::Starting => Some(ProcessPhase::Starting),
            Self::Compiling => Some(ProcessPhase::Compiling),
            Self::Compiled => Some(ProcessPhase::Compiled),
            Self::Launched => Some(ProcessPhase::Launched),
            Self::Error | Self::Progress => None,
        }
    }
}

/// Everything the host pushes at the session, as one closed union.
///
/// Delivery order for events sharing the same id is preserved by the host
/// (single-threaded emission per id); no ordering is guaranteed across ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// A process started (locally commanded or discovered).
    ProcessStarted {
        /// Tracked process id.
        id: String,
        /// OS process id.
        pid: u32,
    },

    /// A process stopped, for any reason (commanded, crashed, external).
    ProcessStopped {
        /// Tracked process id.
        id: String,
    },

    /// One line of process output.
    ProcessLog {
        /// Tracked process id.
        id: String,
        /// The line content.
        line: String,
        /// Channel the line was emitted on.
        channel: LogChannel,
    },

    /// Build/lifecycle stage notification.
    BuildStatus {
        /// Tracked process id.
        id: String,
        /// Reported stage.
        status: BuildStatus,
        /// Free-form status text, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// One line of service daemon output.
    ServiceLog {
        /// Owning service id.
        #[serde(rename = "sourceId")]
        source_id: String,
        /// Human-readable service name.
        #[serde(rename = "sourceName")]
        source_name: String,
        /// The line content.
        line: String,
        /// Channel the line was emitted on.
        channel: LogChannel,
        /// Free-form severity label; mapped into the closed set on dispatch.
        level: String,
        /// Unix ms the host recorded for the line.
        timestamp: u64,
    },
}

impl HostEvent {
    /// Create a `process_started` event.
    pub fn process_started(id: impl Into<String>, pid: u32) -> Self {
        Self::ProcessStarted { id: id.into(), pid }
    }

    /// Create a `process_stopped` event.
    pub fn process_stopped(id: impl Into<String>) -> Self {
        Self::ProcessStopped { id: id.into() }
    }

    /// Create a `process_log` event.
    pub fn process_log(
        id: impl Into<String>,
        line: impl Into<String>,
        channel: LogChannel,
    ) -> Self {
        Self::ProcessLog {
            id: id.into(),
            line: line.into(),
            channel,
        }
    }

    /// Create a `build_status` event.
    pub fn build_status(
        id: impl Into<String>,
        status: BuildStatus,
        message: Option<String>,
    ) -> Self {
        Self::BuildStatus {
            id: id.into(),
            status,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_status_serializes_with_type_tag() {
        let event = HostEvent::build_status("web", BuildStatus::Compiling, None);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"build_status\""));
        assert!(json.contains("\"status\":\"compiling\""));
        assert!(!json.contains("\"message\""));
    }

    #[test]
    fn service_log_fields_are_camel_case() {
        let event = HostEvent::ServiceLog {
            source_id: "db".into(),
            source_name: "postgres".into(),
            line: "ready".into(),
            channel: LogChannel::Stdout,
            level: "notice".into(),
            timestamp: 99,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"sourceId\":\"db\""));
        assert!(json.contains("\"sourceName\":\"postgres\""));
    }

    #[test]
    fn progress_maps_to_no_phase() {
        assert_eq!(BuildStatus::Progress.as_phase(), None);
        assert_eq!(BuildStatus::Error.as_phase(), None);
        assert!(BuildStatus::Launched.as_phase().is_some());
    }
}
