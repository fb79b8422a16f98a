//! Log data model.
//!
//! One `LogEntry` per emitted line, immutable once created. Process logs are
//! keyed by an output channel (stdout/stderr); service logs additionally
//! carry a severity from a small closed set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Output channel a log line originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogChannel {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl LogChannel {
    /// Wire/display name of the channel.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl fmt::Display for LogChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed severity set for service logs.
///
/// Hosts report free-form severity labels; `from_label` maps them into this
/// set so consumers never see an open string vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Neutral information (also the fallback for unknown labels).
    Info,
    /// A completed operation.
    Success,
    /// A recoverable problem.
    Warning,
    /// A failure.
    Error,
}

impl LogLevel {
    /// Map an arbitrary severity label into the closed set.
    ///
    /// Matching is case-insensitive and tolerant of common aliases; anything
    /// unrecognized maps to `Info`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "success" | "ok" | "done" => Self::Success,
            "warning" | "warn" => Self::Warning,
            "error" | "err" | "fatal" | "critical" => Self::Error,
            _ => Self::Info,
        }
    }
}

/// Delivery mode for a log subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Live host-side stream; entries arrive as they occur.
    Push,
    /// Timed re-fetch of recent history.
    Pull,
}

/// A single immutable log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// Owning process/service id.
    pub source: String,
    /// Channel the line was emitted on.
    pub channel: LogChannel,
    /// Severity, for service logs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
    /// The line content (without trailing newline).
    pub text: String,
}

impl LogEntry {
    /// Create a process log entry with the current timestamp.
    #[must_use]
    pub fn new(source: impl Into<String>, channel: LogChannel, text: impl Into<String>) -> Self {
        Self {
            timestamp: now_ms(),
            source: source.into(),
            channel,
            level: None,
            text: text.into(),
        }
    }

    /// Attach a severity level (service logs).
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Override the timestamp (service logs carry their own).
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Current time as Unix milliseconds.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_labels_collapse_to_closed_set() {
        assert_eq!(LogLevel::from_label("WARN"), LogLevel::Warning);
        assert_eq!(LogLevel::from_label("fatal"), LogLevel::Error);
        assert_eq!(LogLevel::from_label("ok"), LogLevel::Success);
        assert_eq!(LogLevel::from_label("verbose"), LogLevel::Info);
        assert_eq!(LogLevel::from_label(""), LogLevel::Info);
    }

    #[test]
    fn entry_serializes_camel_case_without_empty_level() {
        let entry = LogEntry::new("web", LogChannel::Stderr, "boom").with_timestamp(7);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"channel\":\"stderr\""));
        assert!(json.contains("\"timestamp\":7"));
        assert!(!json.contains("\"level\""));
    }
}
