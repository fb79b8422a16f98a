//! Safety-timeout recovery for lost terminal events.
//!
//! A tracked process enters a transient phase on every start/stop/restart
//! and normally leaves it when a terminal lifecycle event arrives. When that
//! event is lost (host hiccup, dropped bridge message), nothing else would
//! ever resolve the record — so every command arms exactly one deferred
//! check here. At the horizon, a record that is still transient for the same
//! command generation is force-settled: transient cleared, phase retained,
//! `stalled` set so the UI shows "unknown" rather than a false positive.

use std::sync::Arc;
use std::time::Duration;

use devdeck_core::events::SessionEvent;
use devdeck_core::ports::SessionEventSink;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::manager::TrackerState;

/// Bounds the lifetime of transient process states.
pub struct SafetyTimeoutSupervisor {
    state: Arc<RwLock<TrackerState>>,
    sink: Arc<dyn SessionEventSink>,
    horizon: Duration,
}

impl SafetyTimeoutSupervisor {
    pub(crate) fn new(
        state: Arc<RwLock<TrackerState>>,
        sink: Arc<dyn SessionEventSink>,
        horizon: Duration,
    ) -> Self {
        Self {
            state,
            sink,
            horizon,
        }
    }

    /// Schedule one deferred check for the command that just bumped `id` to
    /// `generation`.
    ///
    /// Timers are idempotent no-ops when the run resolved in time or when a
    /// newer command superseded the one that armed them, so a stale timer
    /// can never clear a newer run.
    pub(crate) fn arm(&self, id: String, generation: u64) {
        let state = Arc::clone(&self.state);
        let sink = Arc::clone(&self.sink);
        let horizon = self.horizon;

        tokio::spawn(async move {
            tokio::time::sleep(horizon).await;

            let mut state = state.write().await;
            match state.records.get_mut(&id) {
                Some(record) if record.transient && record.generation() == generation => {
                    warn!(
                        id = %id,
                        phase = ?record.phase,
                        "No terminal event within safety horizon; settling as stalled"
                    );
                    record.force_settle();
                    sink.emit(SessionEvent::process_status(record.snapshot()));
                }
                _ => debug!(id = %id, "Safety timer expired with nothing to settle"),
            }
        });
    }
}
