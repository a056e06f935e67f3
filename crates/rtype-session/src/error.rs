//! Error types for the session layer.

use std::time::Duration;

/// Errors that can occur while running a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The server answered a login or registration with `success = false`.
    #[error("authentication rejected ({error_code}): {message}")]
    AuthRejected { error_code: String, message: String },

    /// A `LoginAck`/`RegisterAck` payload was too short to decode.
    #[error("malformed auth response: {len} bytes")]
    MalformedAuthResponse { len: usize },

    /// Nothing was heard from the peer for longer than the timeout.
    #[error("heartbeat timeout: no response for {} ms", elapsed.as_millis())]
    HeartbeatTimeout { elapsed: Duration },

    /// An operation needed an established connection.
    #[error("not connected")]
    NotConnected,
}
