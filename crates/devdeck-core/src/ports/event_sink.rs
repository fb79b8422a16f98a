//! Event sink trait for publishing session events.
//!
//! This module defines the abstraction for emitting session events toward
//! the UI. Implementations handle transport details (channels, IPC bridge
//! emission, SSE, etc.).

use crate::events::SessionEvent;

/// Trait for emitting session events.
///
/// This abstraction keeps event plumbing consistent and prevents channel
/// types from becoming part of the public API surface.
///
/// # Implementations
///
/// - [`NoopSink`] - For tests and headless contexts that don't need events
/// - Adapter-specific implementations (desktop bridge, SSE, etc.)
pub trait SessionEventSink: Send + Sync {
    /// Emit a session event.
    ///
    /// Implementations should handle the event asynchronously or buffer it.
    /// This method must not block.
    fn emit(&self, event: SessionEvent);
}

/// A no-op event sink for tests and headless contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl NoopSink {
    /// Create a new no-op sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SessionEventSink for NoopSink {
    fn emit(&self, _event: SessionEvent) {
        // Intentionally do nothing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProcessSnapshot;
    use std::sync::Arc;

    #[test]
    fn noop_sink_discards_events() {
        let sink = NoopSink::new();
        sink.emit(SessionEvent::process_removed("web"));
    }

    #[test]
    fn arc_dyn_sink_is_usable() {
        let sink: Arc<dyn SessionEventSink> = Arc::new(NoopSink::new());
        sink.emit(SessionEvent::process_status(ProcessSnapshot::unknown(
            "web",
        )));
    }
}
