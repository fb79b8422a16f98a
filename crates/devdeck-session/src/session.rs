//! Session composition root.
//!
//! One `Session` per application session. It owns the process manager, the
//! two log stores, the stream controller, and the event bridge, all wired
//! against the injected host port and UI sink — there is no ambient global
//! state anywhere in the engine.

use std::sync::Arc;

use devdeck_core::config::SessionConfig;
use devdeck_core::domain::LogChannel;
use devdeck_core::events::HostEvent;
use devdeck_core::ports::{CommandError, ProcessHostPort, SessionEventSink};
use tokio::sync::{Mutex, mpsc};

use crate::bridge::{BridgeHandle, EventBridge};
use crate::logs::LogStore;
use crate::manager::ProcessManager;
use crate::stream::StreamController;

/// The session facade.
///
/// Process output (stdout/stderr lines) is always push-fed by the host's
/// event feed into the process store. Service logs are dual-mode: the
/// [`StreamController`] decides per source between a live stream and timed
/// history pulls, both landing in the service store.
pub struct Session {
    host: Arc<dyn ProcessHostPort>,
    manager: Arc<ProcessManager>,
    process_logs: Arc<LogStore>,
    service_logs: Arc<LogStore>,
    streams: Arc<StreamController>,
    bridge: Arc<EventBridge>,
    bridge_handle: Mutex<Option<BridgeHandle>>,
}

impl Session {
    /// Wire a session against a host port and a UI event sink.
    pub fn new(
        host: Arc<dyn ProcessHostPort>,
        sink: Arc<dyn SessionEventSink>,
        config: SessionConfig,
    ) -> Self {
        let manager = Arc::new(ProcessManager::new(
            Arc::clone(&host),
            sink,
            config.safety_timeout(),
        ));
        let process_logs = Arc::new(LogStore::new(config.process_log_capacity));
        let service_logs = Arc::new(LogStore::new(config.service_log_capacity));
        let streams = Arc::new(StreamController::new(
            Arc::clone(&host),
            Arc::clone(&service_logs),
            config.poll_interval(),
            config.history_fetch_limit,
        ));
        let bridge = Arc::new(EventBridge::new(
            Arc::clone(&manager),
            Arc::clone(&process_logs),
            Arc::clone(&service_logs),
        ));

        Self {
            host,
            manager,
            process_logs,
            service_logs,
            streams,
            bridge,
            bridge_handle: Mutex::new(None),
        }
    }

    /// Attach the host's event feed. A previously attached feed is closed
    /// first; the bridge drains the new one on a background task.
    pub async fn attach(&self, feed: mpsc::Receiver<HostEvent>) {
        let handle = Arc::clone(&self.bridge).spawn(feed);
        let mut slot = self.bridge_handle.lock().await;
        if let Some(previous) = slot.replace(handle) {
            previous.close().await;
        }
    }

    /// Seed the process table with what the host already runs.
    ///
    /// # Errors
    ///
    /// The host's failure if the snapshot fetch fails.
    pub async fn seed_from_host(&self) -> Result<usize, CommandError> {
        self.manager.seed_from_host().await
    }

    /// Clear the host-side history and the local buffer for a service log
    /// source. Any active subscription keeps running.
    ///
    /// # Errors
    ///
    /// The host's failure if clearing the remote history fails; the local
    /// buffer is left untouched in that case.
    pub async fn clear_service_history(
        &self,
        source: &str,
        channel: LogChannel,
    ) -> Result<(), CommandError> {
        self.host.clear_log_history(source, channel).await?;
        self.service_logs.clear(source, channel);
        Ok(())
    }

    /// Clear the local buffer for one process log channel (display action).
    pub fn clear_process_logs(&self, source: &str, channel: LogChannel) {
        self.process_logs.clear(source, channel);
    }

    /// Access the process lifecycle manager.
    #[must_use]
    pub const fn manager(&self) -> &Arc<ProcessManager> {
        &self.manager
    }

    /// Access the process log store.
    #[must_use]
    pub const fn process_logs(&self) -> &Arc<LogStore> {
        &self.process_logs
    }

    /// Access the service log store.
    #[must_use]
    pub const fn service_logs(&self) -> &Arc<LogStore> {
        &self.service_logs
    }

    /// Access the stream controller for service log sources.
    #[must_use]
    pub const fn streams(&self) -> &Arc<StreamController> {
        &self.streams
    }

    /// Access the event bridge (for embedders that dispatch synchronously
    /// instead of attaching a feed).
    #[must_use]
    pub const fn bridge(&self) -> &Arc<EventBridge> {
        &self.bridge
    }

    /// Dispose of the session: every log subscription is released and the
    /// event feed is detached. Leaked host-side subscriptions are a defect,
    /// so embedders must call this on teardown.
    pub async fn shutdown(&self) {
        self.streams.close_all().await;
        let handle = self.bridge_handle.lock().await.take();
        if let Some(handle) = handle {
            handle.close().await;
        }
    }
}
