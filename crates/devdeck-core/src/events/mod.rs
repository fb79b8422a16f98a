//! Canonical event unions for the session core.
//!
//! `HostEvent` is the inbound side: everything the process host pushes at the
//! session, normalized into one closed discriminated union so dispatch is an
//! exhaustive `match` and new event kinds are compiler-detected rather than
//! silently ignored.
//!
//! `SessionEvent` is the outbound side: state-change notifications the
//! session publishes to its UI sink.
//!
//! # Wire Format
//!
//! Both unions serialize with a `type` tag and camelCase fields for frontend
//! compatibility:
//!
//! ```json
//! { "type": "build_status", "id": "web", "status": "compiling" }
//! ```

mod host;
mod session;

pub use host::{BuildStatus, HostEvent};
pub use session::SessionEvent;
