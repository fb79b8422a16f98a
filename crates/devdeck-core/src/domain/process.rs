//! Process lifecycle domain types.
//!
//! A tracked process moves through build/run phases driven by host events,
//! while locally issued commands race against those events. `ProcessRecord`
//! is the authoritative per-id state; `ProcessSnapshot` is the read model
//! consumers (UI) observe. Reconciliation between command acknowledgements
//! and asynchronous events is keyed by a monotonic per-record sequence
//! counter so the later writer wins per field.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Build/run stage of a tracked process.
///
/// Forward order is `starting → compiling → compiled → launched`; `error` is
/// reachable from any transient phase. `launched` and `error` are terminal
/// for the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessPhase {
    /// Not running and no operation in flight (equivalent to "unknown").
    Idle,
    /// A start command was issued; the host has not reported build activity.
    Starting,
    /// The host reported an active build.
    Compiling,
    /// The build finished; the process is not yet serving.
    Compiled,
    /// The process is up. Terminal for the current run.
    Launched,
    /// A stop command was issued and is awaiting confirmation.
    Stopping,
    /// The run failed. Terminal for the current run.
    Error,
}

impl ProcessPhase {
    /// Position of this phase on the forward build path.
    ///
    /// Phases outside the path (`idle`, `stopping`, `error`) have no rank;
    /// build events never apply to them.
    #[must_use]
    pub const fn rank(self) -> Option<u8> {
        match self {
            Self::Starting => Some(0),
            Self::Compiling => Some(1),
            Self::Compiled => Some(2),
            Self::Launched => Some(3),
            Self::Idle | Self::Stopping | Self::Error => None,
        }
    }

    /// Whether this phase implies an in-flight operation.
    #[must_use]
    pub const fn implies_transient(self) -> bool {
        matches!(
            self,
            Self::Starting | Self::Compiling | Self::Compiled | Self::Stopping
        )
    }

    /// Whether this phase ends the current run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Launched | Self::Error)
    }
}

/// Authoritative per-id process state.
///
/// A record exists in the manager table iff the process is "known" (started
/// at least once and not yet confirmed stopped); absence of a record is
/// equivalent to "stopped". The `transient` flag is derived from the phase on
/// every command/event application but is stored explicitly because the
/// safety timeout clears it while retaining the phase.
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    /// Externally assigned stable identifier.
    pub id: String,
    /// OS process id, once reported by the host.
    pub pid: Option<u32>,
    /// Final bound port, once reported by the host.
    pub port: Option<u16>,
    /// Unix ms when the host first confirmed the process running.
    pub started_at: Option<u64>,
    /// Current build/run phase.
    pub phase: ProcessPhase,
    /// True while a start/stop/restart is in flight and unresolved.
    pub transient: bool,
    /// Set when the safety timeout force-settled a lost run; the phase is
    /// then last-known, not confirmed.
    pub stalled: bool,
    /// Unix ms when the current start/restart was issued; cleared on
    /// terminal resolution.
    pub build_started_at: Option<u64>,
    generation: u64,
    seq: u64,
    pid_seq: u64,
    port_seq: u64,
}

impl ProcessRecord {
    /// Create an empty record for `id` in the `idle` phase.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pid: None,
            port: None,
            started_at: None,
            phase: ProcessPhase::Idle,
            transient: false,
            stalled: false,
            build_started_at: None,
            generation: 0,
            seq: 0,
            pid_seq: 0,
            port_seq: 0,
        }
    }

    /// Current command generation. Bumped by every locally issued command so
    /// stale safety timers and stale failure paths recognize themselves.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Current mutation sequence number.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// Advance and return the mutation sequence number.
    pub fn bump_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Enter a new start/restart run: phase `starting`, transient, fresh
    /// generation, build timestamp stamped.
    pub fn begin_run(&mut self) {
        self.generation += 1;
        self.seq += 1;
        self.phase = ProcessPhase::Starting;
        self.transient = true;
        self.stalled = false;
        self.build_started_at = Some(now_ms());
    }

    /// Enter a stop operation: phase `stopping`, transient, fresh generation.
    pub fn begin_stop(&mut self) {
        self.generation += 1;
        self.seq += 1;
        self.phase = ProcessPhase::Stopping;
        self.transient = true;
        self.stalled = false;
    }

    /// Record a pid observed at `at_seq`. A stale write (an acknowledgement
    /// arriving after an event already wrote the field) is ignored.
    ///
    /// Returns `true` if the field was written.
    pub fn record_pid(&mut self, pid: u32, at_seq: u64) -> bool {
        if at_seq < self.pid_seq {
            return false;
        }
        self.pid = Some(pid);
        self.pid_seq = at_seq;
        if self.started_at.is_none() {
            self.started_at = Some(now_ms());
        }
        true
    }

    /// Record a bound port observed at `at_seq`; stale writes are ignored.
    ///
    /// Returns `true` if the field was written.
    pub fn record_port(&mut self, port: u16, at_seq: u64) -> bool {
        if at_seq < self.port_seq {
            return false;
        }
        self.port = Some(port);
        self.port_seq = at_seq;
        true
    }

    /// Move forward along the build path. Terminal phases also resolve the
    /// run (transient cleared, build timestamp dropped).
    pub fn advance_phase(&mut self, phase: ProcessPhase) {
        self.seq += 1;
        self.phase = phase;
        if phase.is_terminal() {
            self.transient = false;
            self.stalled = false;
            self.build_started_at = None;
        }
    }

    /// Resolve the run terminally (used for `error` and command rollback to
    /// a settled state).
    pub fn resolve_terminal(&mut self, phase: ProcessPhase) {
        self.seq += 1;
        self.phase = phase;
        self.transient = false;
        self.stalled = false;
        self.build_started_at = None;
    }

    /// Roll back a failed command: restore `phase`, clear transient, keep
    /// everything else last-known.
    pub fn revert_command(&mut self, phase: ProcessPhase) {
        self.seq += 1;
        self.phase = phase;
        self.transient = false;
    }

    /// Safety-timeout resolution: the terminal event never arrived, so the
    /// record settles as non-transient with its last-known phase and is
    /// flagged stalled ("unknown", not success or failure).
    pub fn force_settle(&mut self) {
        self.seq += 1;
        self.transient = false;
        self.stalled = true;
        self.build_started_at = None;
    }

    /// Adopt a process the host reported as already running (no local
    /// command involved).
    pub fn adopt_running(&mut self, pid: u32, port: Option<u16>) {
        let at = self.bump_seq();
        self.phase = ProcessPhase::Launched;
        self.transient = false;
        self.stalled = false;
        self.record_pid(pid, at);
        if let Some(port) = port {
            self.record_port(port, at);
        }
    }

    /// Read model of this record for consumers.
    #[must_use]
    pub fn snapshot(&self) -> ProcessSnapshot {
        ProcessSnapshot {
            id: self.id.clone(),
            phase: self.phase,
            transient: self.transient,
            stalled: self.stalled,
            pid: self.pid,
            port: self.port,
            started_at: self.started_at,
            build_started_at: self.build_started_at,
        }
    }
}

/// Consumer-facing view of one tracked process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSnapshot {
    /// Externally assigned stable identifier.
    pub id: String,
    /// Current build/run phase.
    pub phase: ProcessPhase,
    /// True while a start/stop/restart is in flight and unresolved.
    pub transient: bool,
    /// True when the safety timeout settled the record without confirmation.
    pub stalled: bool,
    /// OS process id (when known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Final bound port (when known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Unix ms when the host first confirmed the process running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    /// Unix ms when the current start/restart was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_started_at: Option<u64>,
}

impl ProcessSnapshot {
    /// Snapshot of a process the manager does not track (== stopped).
    #[must_use]
    pub fn unknown(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            phase: ProcessPhase::Idle,
            transient: false,
            stalled: false,
            pid: None,
            port: None,
            started_at: None,
            build_started_at: None,
        }
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
    fn phase_ranks_are_forward_ordered() {
        assert!(ProcessPhase::Starting.rank() < ProcessPhase::Compiling.rank());
        assert!(ProcessPhase::Compiling.rank() < ProcessPhase::Compiled.rank());
        assert!(ProcessPhase::Compiled.rank() < ProcessPhase::Launched.rank());
        assert_eq!(ProcessPhase::Stopping.rank(), None);
        assert_eq!(ProcessPhase::Error.rank(), None);
    }

    #[test]
    fn begin_run_marks_transient_and_stamps_build() {
        let mut record = ProcessRecord::new("web");
        record.begin_run();
        assert_eq!(record.phase, ProcessPhase::Starting);
        assert!(record.transient);
        assert!(record.build_started_at.is_some());
        assert_eq!(record.generation(), 1);
    }

    #[test]
    fn terminal_resolution_clears_transient_and_build_stamp() {
        let mut record = ProcessRecord::new("web");
        record.begin_run();
        record.advance_phase(ProcessPhase::Launched);
        assert!(!record.transient);
        assert_eq!(record.build_started_at, None);
        assert_eq!(record.phase, ProcessPhase::Launched);
    }

    #[test]
    fn stale_ack_does_not_overwrite_event_pid() {
        let mut record = ProcessRecord::new("web");
        record.begin_run();
        let issue_seq = record.seq();

        // Event arrives first and wins.
        let event_seq = record.bump_seq();
        assert!(record.record_pid(4242, event_seq));

        // The command acknowledgement was issued earlier; it must lose.
        assert!(!record.record_pid(1111, issue_seq));
        assert_eq!(record.pid, Some(4242));
    }

    #[test]
    fn force_settle_keeps_phase_and_flags_stalled() {
        let mut record = ProcessRecord::new("web");
        record.begin_run();
        record.advance_phase(ProcessPhase::Compiling);
        record.force_settle();
        assert_eq!(record.phase, ProcessPhase::Compiling);
        assert!(!record.transient);
        assert!(record.stalled);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let mut record = ProcessRecord::new("web");
        record.begin_run();
        let json = serde_json::to_string(&record.snapshot()).unwrap();
        assert!(json.contains("\"phase\":\"starting\""));
        assert!(json.contains("\"buildStartedAt\""));
        assert!(!json.contains("\"pid\""));
    }
}
