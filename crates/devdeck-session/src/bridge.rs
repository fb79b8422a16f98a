//! Host event normalization and dispatch.
//!
//! The bridge is the only consumer of the host's event feed. It matches the
//! closed [`HostEvent`] union exhaustively — a new event kind is a compile
//! error here, not a silently ignored string — and turns each event into
//! calls on the process manager and the log stores. Failures on this path
//! are contained per event: delivery must never be interrupted for other
//! ids.

use std::sync::Arc;

use devdeck_core::domain::{LogEntry, LogLevel};
use devdeck_core::events::HostEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::logs::LogStore;
use crate::manager::ProcessManager;

/// Normalizes host events into state mutations.
pub struct EventBridge {
    manager: Arc<ProcessManager>,
    process_logs: Arc<LogStore>,
    service_logs: Arc<LogStore>,
}

impl EventBridge {
    /// Create a bridge dispatching into `manager` and the two log stores.
    pub fn new(
        manager: Arc<ProcessManager>,
        process_logs: Arc<LogStore>,
        service_logs: Arc<LogStore>,
    ) -> Self {
        Self {
            manager,
            process_logs,
            service_logs,
        }
    }

    /// Apply one host event.
    ///
    /// Events sharing an id arrive in emission order; this method preserves
    /// that order by applying each event fully before returning.
    pub async fn dispatch(&self, event: HostEvent) {
        match event {
            HostEvent::ProcessStarted { id, pid } => {
                self.manager.apply_external_start(&id, pid, None).await;
            }
            HostEvent::ProcessStopped { id } => {
                self.manager.apply_external_stop(&id).await;
                // Process output is session-scoped; drop it with the source.
                self.process_logs.clear_source(&id);
            }
            HostEvent::ProcessLog { id, line, channel } => {
                self.process_logs.append(LogEntry::new(id, channel, line));
            }
            HostEvent::BuildStatus {
                id,
                status,
                message,
            } => {
                self.manager.apply_phase_event(&id, status, message).await;
            }
            HostEvent::ServiceLog {
                source_id,
                source_name,
                line,
                channel,
                level,
                timestamp,
            } => {
                debug!(source = %source_id, name = %source_name, "Service log line");
                let entry = LogEntry::new(source_id, channel, line)
                    .with_level(LogLevel::from_label(&level))
                    .with_timestamp(timestamp);
                self.service_logs.append(entry);
            }
        }
    }

    /// Drain `feed` on a background task until the feed closes or the
    /// returned handle is closed.
    pub fn spawn(self: Arc<Self>, mut feed: mpsc::Receiver<HostEvent>) -> BridgeHandle {
        let bridge = self;
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = task_cancel.cancelled() => break,
                    event = feed.recv() => match event {
                        Some(event) => bridge.dispatch(event).await,
                        None => break,
                    },
                }
            }
            debug!("Event bridge task exiting");
        });

        BridgeHandle { cancel, task }
    }
}

/// Scoped handle to a running bridge task.
///
/// Dropping the handle without calling [`BridgeHandle::close`] leaves the
/// task draining the feed; closing it is the single teardown path.
pub struct BridgeHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl BridgeHandle {
    /// Stop the drain task and wait for it to finish.
    pub async fn close(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devdeck_core::domain::{LogChannel, ProcessPhase};
    use devdeck_core::events::BuildStatus;
    use devdeck_core::ports::{
        HostError, NoopSink, ProcessHostPort, RunningProcess, SpawnAck,
    };
    use async_trait::async_trait;
    use std::time::Duration;

    struct InertHost;

    #[async_trait]
    impl ProcessHostPort for InertHost {
        async fn start_process(&self, _id: &str) -> Result<SpawnAck, HostError> {
            Ok(SpawnAck { pid: 1, port: None })
        }
        async fn stop_process(&self, _id: &str) -> Result<(), HostError> {
            Ok(())
        }
        async fn restart_process(&self, _id: &str) -> Result<SpawnAck, HostError> {
            Ok(SpawnAck { pid: 1, port: None })
        }
        async fn list_running(&self) -> Result<Vec<RunningProcess>, HostError> {
            Ok(vec![])
        }
        async fn start_log_stream(
            &self,
            _source: &str,
            _channel: LogChannel,
        ) -> Result<bool, HostError> {
            Ok(false)
        }
        async fn stop_log_stream(
            &self,
            _source: &str,
            _channel: LogChannel,
        ) -> Result<bool, HostError> {
            Ok(false)
        }
        async fn fetch_log_history(
            &self,
            _source: &str,
            _channel: LogChannel,
            _max_lines: usize,
        ) -> Result<Vec<LogEntry>, HostError> {
            Ok(vec![])
        }
        async fn clear_log_history(
            &self,
            _source: &str,
            _channel: LogChannel,
        ) -> Result<(), HostError> {
            Ok(())
        }
    }

    fn bridge() -> (Arc<EventBridge>, Arc<ProcessManager>, Arc<LogStore>, Arc<LogStore>) {
        let manager = Arc::new(ProcessManager::new(
            Arc::new(InertHost),
            Arc::new(NoopSink::new()),
            Duration::from_secs(300),
        ));
        let process_logs = Arc::new(LogStore::new(100));
        let service_logs = Arc::new(LogStore::new(100));
        let bridge = Arc::new(EventBridge::new(
            Arc::clone(&manager),
            Arc::clone(&process_logs),
            Arc::clone(&service_logs),
        ));
        (bridge, manager, process_logs, service_logs)
    }

    #[tokio::test]
    async fn process_log_events_land_in_the_process_store() {
        let (bridge, _manager, process_logs, service_logs) = bridge();
        bridge
            .dispatch(HostEvent::process_log("web", "listening", LogChannel::Stdout))
            .await;

        assert_eq!(process_logs.len("web", LogChannel::Stdout), 1);
        assert_eq!(service_logs.len("web", LogChannel::Stdout), 0);
    }

    #[tokio::test]
    async fn service_log_levels_map_into_the_closed_set() {
        let (bridge, _manager, _process_logs, service_logs) = bridge();
        bridge
            .dispatch(HostEvent::ServiceLog {
                source_id: "db".into(),
                source_name: "postgres".into(),
                line: "checkpoint".into(),
                channel: LogChannel::Stderr,
                level: "NOTICE".into(),
                timestamp: 5,
            })
            .await;

        let entries = service_logs.entries("db", LogChannel::Stderr);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, Some(LogLevel::Info));
        assert_eq!(entries[0].timestamp, 5);
    }

    #[tokio::test]
    async fn stop_event_removes_record_and_session_logs() {
        let (bridge, manager, process_logs, _service_logs) = bridge();
        bridge
            .dispatch(HostEvent::process_started("web", 42))
            .await;
        bridge
            .dispatch(HostEvent::process_log("web", "hello", LogChannel::Stdout))
            .await;
        bridge.dispatch(HostEvent::process_stopped("web")).await;

        assert!(!manager.is_known("web").await);
        assert_eq!(process_logs.len("web", LogChannel::Stdout), 0);
    }

    #[tokio::test]
    async fn build_events_drive_the_phase_machine() {
        let (bridge, manager, _process_logs, _service_logs) = bridge();
        manager.start("web").await.unwrap();
        bridge
            .dispatch(HostEvent::build_status("web", BuildStatus::Compiling, None))
            .await;

        assert_eq!(
            manager.snapshot("web").await.unwrap().phase,
            ProcessPhase::Compiling
        );
    }

    #[tokio::test]
    async fn spawned_bridge_drains_the_feed() {
        let (bridge, _manager, process_logs, _service_logs) = bridge();
        let (tx, rx) = mpsc::channel(16);
        let handle = Arc::clone(&bridge).spawn(rx);

        tx.send(HostEvent::process_log("web", "one", LogChannel::Stdout))
            .await
            .unwrap();
        tx.send(HostEvent::process_log("web", "two", LogChannel::Stdout))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(process_logs.len("web", LogChannel::Stdout), 2);
        handle.close().await;
    }
}
