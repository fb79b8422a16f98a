//! Domain types for process lifecycle and log tracking.
//!
//! These are pure data types shared by the session engine and its adapters.
//! They carry no I/O and no timers.

mod log;
mod process;

pub use log::{DeliveryMode, LogChannel, LogEntry, LogLevel};
pub use process::{ProcessPhase, ProcessRecord, ProcessSnapshot};
