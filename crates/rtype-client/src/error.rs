//! Unified error type for the session client.

use rtype_protocol::ProtocolError;
use rtype_session::SessionError;
use rtype_transport::TransportError;
use serde::Serialize;

/// Top-level error that wraps all crate-specific errors.
///
/// Errors never cross the I/O thread boundary as `Result`s; the worker
/// turns each one into a [`ClientEvent::Error`](crate::ClientEvent::Error)
/// carrying its [`ErrorKind`] and display text.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error (resolve, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (oversized or malformed frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (heartbeat timeout, bad auth ack).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The I/O worker could not be started.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Coarse error category carried by error events.
///
/// Lets consumers branch on what went wrong without matching strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Name resolution or the TCP connect failed.
    Connect,
    /// Reading from the socket failed.
    Read,
    /// Writing to the socket failed, or there was no socket to write to.
    Write,
    /// The peer closed the connection.
    Closed,
    /// The peer went silent for longer than the heartbeat timeout.
    HeartbeatTimeout,
    /// The peer sent bytes that violate the wire format.
    Protocol,
    /// Local failure: thread or runtime creation, bad configuration.
    Runtime,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(e) => match e {
                TransportError::Resolve { .. }
                | TransportError::ConnectFailed { .. }
                | TransportError::Timeout { .. } => ErrorKind::Connect,
                TransportError::ConnectionClosed(_) => ErrorKind::Closed,
                TransportError::SendFailed(_) => ErrorKind::Write,
                TransportError::ReceiveFailed(_) => ErrorKind::Read,
            },
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Session(e) => match e {
                SessionError::HeartbeatTimeout { .. } => ErrorKind::HeartbeatTimeout,
                SessionError::NotConnected => ErrorKind::Write,
                SessionError::AuthRejected { .. } | SessionError::MalformedAuthResponse { .. } => {
                    ErrorKind::Protocol
                }
            },
            Self::Config(_) | Self::Runtime(_) => ErrorKind::Runtime,
        }
    }
}
