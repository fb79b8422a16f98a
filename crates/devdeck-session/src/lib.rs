//! Session-side process tracking and log delivery engine.
//!
//! This crate reconciles three independent, racing information sources —
//! locally issued commands, asynchronous lifecycle/build events from the
//! process host, and two log-delivery mechanisms (push streams and timed
//! pulls) — into one authoritative, UI-safe state per tracked process.
//!
//! # Structure
//!
//! - [`ProcessManager`] - the per-process lifecycle state machine
//! - [`LogStore`] - bounded, ordered ring buffers per (source, channel)
//! - [`StreamController`] - push-first log delivery with silent pull fallback
//! - [`SafetyTimeoutSupervisor`] - bounded recovery for lost terminal events
//! - [`EventBridge`] - normalizes the host event feed into state mutations
//! - [`Session`] - composition root wiring the above for one app session

mod bridge;
mod logs;
mod manager;
mod session;
mod stream;
mod supervisor;

pub use bridge::{BridgeHandle, EventBridge};
pub use logs::{LogBuffer, LogStore};
pub use manager::ProcessManager;
pub use session::Session;
pub use stream::StreamController;
pub use supervisor::SafetyTimeoutSupervisor;
