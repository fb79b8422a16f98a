//! Process lifecycle state machine.
//!
//! `ProcessManager` is the single source of truth for "is this process
//! running / building / failed". It orders command issuance against the
//! asynchronous confirmations the host emits, applying every mutation to a
//! single locked record table so readers always observe a consistent
//! snapshot. Commands suspend only for the host's round-trip
//! acknowledgement; run outcomes arrive later through the event-application
//! methods the bridge calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use devdeck_core::domain::{ProcessPhase, ProcessRecord, ProcessSnapshot};
use devdeck_core::events::{BuildStatus, SessionEvent};
use devdeck_core::ports::{CommandError, HostError, ProcessHostPort, SessionEventSink, SpawnAck};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::supervisor::SafetyTimeoutSupervisor;

/// Record table for one session. Single-writer-at-a-time by virtue of the
/// lock; every mutation is atomic per dispatched action.
#[derive(Default)]
pub(crate) struct TrackerState {
    pub(crate) records: HashMap<String, ProcessRecord>,
}

/// Authoritative state machine for all tracked processes.
pub struct ProcessManager {
    state: Arc<RwLock<TrackerState>>,
    host: Arc<dyn ProcessHostPort>,
    sink: Arc<dyn SessionEventSink>,
    supervisor: SafetyTimeoutSupervisor,
}

impl ProcessManager {
    /// Create a manager issuing commands to `host` and publishing state
    /// changes to `sink`. `safety_timeout` bounds how long a transient
    /// record may wait for a terminal event.
    pub fn new(
        host: Arc<dyn ProcessHostPort>,
        sink: Arc<dyn SessionEventSink>,
        safety_timeout: Duration,
    ) -> Self {
        let state = Arc::new(RwLock::new(TrackerState::default()));
        let supervisor =
            SafetyTimeoutSupervisor::new(Arc::clone(&state), Arc::clone(&sink), safety_timeout);
        Self {
            state,
            host,
            sink,
            supervisor,
        }
    }

    /// Start a tracked process.
    ///
    /// The returned snapshot is still transient: only a terminal lifecycle
    /// event, an external stop, or the safety timeout resolves the run.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if the record is currently launched, or the host's
    /// failure if the command round trip fails. A failed command never
    /// leaves a dangling transient record.
    pub async fn start(&self, id: &str) -> Result<ProcessSnapshot, CommandError> {
        let (generation, issue_seq, created) = {
            let mut state = self.state.write().await;
            if let Some(record) = state.records.get(id)
                && record.phase == ProcessPhase::Launched
                && !record.transient
            {
                return Err(CommandError::AlreadyRunning(id.to_string()));
            }
            self.begin_run_locked(&mut state, id)
        };

        info!(id = %id, "Starting process");
        self.supervisor.arm(id.to_string(), generation);

        let ack = self.host.start_process(id).await;
        self.settle_spawn_ack(id, generation, issue_seq, created, ack)
            .await
    }

    /// Restart a tracked process. Unlike [`Self::start`] this is accepted in
    /// any phase; an unknown id is treated as a fresh start.
    ///
    /// # Errors
    ///
    /// The host's failure if the command round trip fails; the record then
    /// reverts to its pre-command phase, non-transient.
    pub async fn restart(&self, id: &str) -> Result<ProcessSnapshot, CommandError> {
        let (generation, issue_seq, created, prev_phase) = {
            let mut state = self.state.write().await;
            let prev_phase = state.records.get(id).map(|record| record.phase);
            let (generation, issue_seq, created) = self.begin_run_locked(&mut state, id);
            (generation, issue_seq, created, prev_phase)
        };

        info!(id = %id, "Restarting process");
        self.supervisor.arm(id.to_string(), generation);

        match self.host.restart_process(id).await {
            ack @ Ok(_) => {
                self.settle_spawn_ack(id, generation, issue_seq, created, ack)
                    .await
            }
            Err(error) => {
                warn!(id = %id, error = %error, "Restart command failed");
                let mut state = self.state.write().await;
                let same_run = state
                    .records
                    .get(id)
                    .is_some_and(|record| record.generation() == generation);
                if same_run {
                    if created {
                        state.records.remove(id);
                        self.sink.emit(SessionEvent::process_removed(id));
                    } else if let Some(record) = state.records.get_mut(id) {
                        record.revert_command(prev_phase.unwrap_or(ProcessPhase::Idle));
                        self.sink.emit(SessionEvent::process_status(record.snapshot()));
                    }
                }
                Err(error.into())
            }
        }
    }

    /// Stop a tracked process. The record stays in a transient `stopping`
    /// phase until the host confirms with a `process_stopped` event, which
    /// removes it entirely.
    ///
    /// # Errors
    ///
    /// `NotRunning` if the id is not tracked, or the host's failure; the
    /// record then reverts to its pre-command phase, non-transient.
    pub async fn stop(&self, id: &str) -> Result<(), CommandError> {
        let (generation, prev_phase) = {
            let mut state = self.state.write().await;
            let record = state
                .records
                .get_mut(id)
                .ok_or_else(|| CommandError::NotRunning(id.to_string()))?;
            let prev_phase = record.phase;
            record.begin_stop();
            self.sink.emit(SessionEvent::process_status(record.snapshot()));
            (record.generation(), prev_phase)
        };

        info!(id = %id, "Stopping process");
        self.supervisor.arm(id.to_string(), generation);

        match self.host.stop_process(id).await {
            Ok(()) => Ok(()),
            Err(error) => {
                warn!(id = %id, error = %error, "Stop command failed");
                let mut state = self.state.write().await;
                if let Some(record) = state.records.get_mut(id)
                    && record.generation() == generation
                {
                    record.revert_command(prev_phase);
                    self.sink.emit(SessionEvent::process_status(record.snapshot()));
                }
                Err(error.into())
            }
        }
    }

    /// Apply a build/lifecycle stage event. Called only by the event bridge.
    ///
    /// Phases only move forward along the allowed transition graph; `error`
    /// is accepted from any transient phase; `progress` never changes the
    /// phase and only republishes its message. Anything else — duplicates,
    /// backward events, unknown ids — is logged and dropped, never raised.
    pub async fn apply_phase_event(&self, id: &str, status: BuildStatus, message: Option<String>) {
        match status {
            BuildStatus::Progress => {
                let state = self.state.read().await;
                if state.records.contains_key(id) {
                    self.sink.emit(SessionEvent::process_progress(
                        id,
                        message.unwrap_or_default(),
                    ));
                } else {
                    debug!(id = %id, "Progress event for unknown process dropped");
                }
            }
            BuildStatus::Error => {
                let mut state = self.state.write().await;
                match state.records.get_mut(id) {
                    Some(record) if record.transient => {
                        warn!(id = %id, message = ?message, "Build failed");
                        record.resolve_terminal(ProcessPhase::Error);
                        self.sink.emit(SessionEvent::process_status(record.snapshot()));
                    }
                    Some(_) => {
                        debug!(id = %id, "Error event outside a transient phase dropped");
                    }
                    None => debug!(id = %id, "Error event for unknown process dropped"),
                }
            }
            _ => {
                // Stages that map onto the forward phase path.
                let Some(phase) = status.as_phase() else {
                    return;
                };
                let mut state = self.state.write().await;
                let Some(record) = state.records.get_mut(id) else {
                    debug!(id = %id, status = ?status, "Build event for unknown process dropped");
                    return;
                };
                match (record.phase.rank(), phase.rank()) {
                    (Some(current), Some(next)) if next > current => {
                        debug!(id = %id, from = ?record.phase, to = ?phase, "Phase advanced");
                        record.advance_phase(phase);
                        self.sink.emit(SessionEvent::process_status(record.snapshot()));
                    }
                    _ => {
                        debug!(
                            id = %id,
                            current = ?record.phase,
                            event = ?phase,
                            "Out-of-order build event dropped"
                        );
                    }
                }
            }
        }
    }

    /// Apply a host-originated start (spawn confirmation for a local
    /// command, or discovery of a process started outside this session).
    /// Idempotent; field writes reconcile by arrival order.
    pub async fn apply_external_start(&self, id: &str, pid: u32, port: Option<u16>) {
        let mut state = self.state.write().await;
        match state.records.get_mut(id) {
            Some(record) => {
                let at = record.bump_seq();
                record.record_pid(pid, at);
                if let Some(port) = port {
                    record.record_port(port, at);
                }
                debug!(id = %id, pid = %pid, "Process start confirmed");
                self.sink.emit(SessionEvent::process_status(record.snapshot()));
            }
            None => {
                let mut record = ProcessRecord::new(id);
                record.adopt_running(pid, port);
                info!(id = %id, pid = %pid, "Discovered externally started process");
                self.sink.emit(SessionEvent::process_status(record.snapshot()));
                state.records.insert(id.to_string(), record);
            }
        }
    }

    /// Apply a host-originated stop (commanded, crashed, or external). The
    /// record is removed entirely: absence is equivalent to "stopped".
    /// Idempotent.
    pub async fn apply_external_stop(&self, id: &str) {
        let mut state = self.state.write().await;
        if state.records.remove(id).is_some() {
            info!(id = %id, "Process stopped");
            self.sink.emit(SessionEvent::process_removed(id));
        } else {
            debug!(id = %id, "Stop event for unknown process dropped");
        }
    }

    /// Seed the record table from the host's running-process snapshot.
    ///
    /// # Errors
    ///
    /// The host's failure if the snapshot fetch fails.
    pub async fn seed_from_host(&self) -> Result<usize, CommandError> {
        let running = self.host.list_running().await?;
        let count = running.len();
        for process in running {
            self.apply_external_start(&process.id, process.pid, process.port)
                .await;
        }
        info!(count = %count, "Seeded process table from host snapshot");
        Ok(count)
    }

    /// Snapshot of one tracked process, `None` if unknown (== stopped).
    pub async fn snapshot(&self, id: &str) -> Option<ProcessSnapshot> {
        let state = self.state.read().await;
        state.records.get(id).map(ProcessRecord::snapshot)
    }

    /// Snapshots of all tracked processes.
    pub async fn snapshots(&self) -> Vec<ProcessSnapshot> {
        let state = self.state.read().await;
        state.records.values().map(ProcessRecord::snapshot).collect()
    }

    /// Whether an operation is in flight and unresolved for `id`.
    pub async fn is_transient(&self, id: &str) -> bool {
        let state = self.state.read().await;
        state.records.get(id).is_some_and(|record| record.transient)
    }

    /// Whether `id` is tracked at all.
    pub async fn is_known(&self, id: &str) -> bool {
        let state = self.state.read().await;
        state.records.contains_key(id)
    }

    fn begin_run_locked(&self, state: &mut TrackerState, id: &str) -> (u64, u64, bool) {
        let created = !state.records.contains_key(id);
        let record = state
            .records
            .entry(id.to_string())
            .or_insert_with(|| ProcessRecord::new(id));
        record.begin_run();
        self.sink.emit(SessionEvent::process_status(record.snapshot()));
        (record.generation(), record.seq(), created)
    }

    /// Apply a spawn acknowledgement, or roll back a failed start.
    ///
    /// The ack's pid/port go through the per-field reconciliation rule: an
    /// event that already wrote the field after command issuance wins over
    /// the acknowledgement.
    async fn settle_spawn_ack(
        &self,
        id: &str,
        generation: u64,
        issue_seq: u64,
        created: bool,
        ack: Result<SpawnAck, HostError>,
    ) -> Result<ProcessSnapshot, CommandError> {
        match ack {
            Ok(ack) => {
                let mut state = self.state.write().await;
                let Some(record) = state.records.get_mut(id) else {
                    // An external stop won the race; the process is gone.
                    debug!(id = %id, "Record removed before spawn ack applied");
                    return Ok(ProcessSnapshot::unknown(id));
                };
                record.record_pid(ack.pid, issue_seq);
                if let Some(port) = ack.port {
                    record.record_port(port, issue_seq);
                }
                self.sink.emit(SessionEvent::process_status(record.snapshot()));
                Ok(record.snapshot())
            }
            Err(error) => {
                warn!(id = %id, error = %error, "Start command failed");
                let mut state = self.state.write().await;
                let same_run = state
                    .records
                    .get(id)
                    .is_some_and(|record| record.generation() == generation);
                if same_run {
                    if created {
                        state.records.remove(id);
                        self.sink.emit(SessionEvent::process_removed(id));
                    } else if let Some(record) = state.records.get_mut(id) {
                        record.resolve_terminal(ProcessPhase::Error);
                        self.sink.emit(SessionEvent::process_status(record.snapshot()));
                    }
                }
                Err(error.into())
            }
        }
    }
}
