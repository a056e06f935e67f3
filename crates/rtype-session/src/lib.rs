//! Session management for the R-Type client.
//!
//! This crate holds the pieces of a session that are independent of the
//! socket itself:
//!
//! 1. **Connection state** ([`SessionState`], [`ConnectionState`]):
//!    atomic flags with an exactly-once teardown claim.
//! 2. **Liveness** ([`HeartbeatMonitor`]): interval ticks and a silence
//!    timeout measured against the last inbound frame.
//! 3. **Authentication** ([`AuthFlow`]): cached credentials replayed when
//!    the server prompts, and ack interpretation.
//!
//! # How it fits in the stack
//!
//! ```text
//! Client façade (above)  ← owns the I/O worker, applies outcomes, emits events
//!     ↕
//! Session layer (this crate)  ← decides what a frame means for the session
//!     ↕
//! Protocol layer (below)  ← Frame, MessageType, auth payloads
//! ```

mod auth;
mod error;
mod heartbeat;
mod session;

pub use auth::{AuthFlow, AuthSuccess, PendingCredentials};
pub use error::SessionError;
pub use heartbeat::HeartbeatMonitor;
pub use session::{ConnectionState, SessionConfig, SessionState, duration_ms};
