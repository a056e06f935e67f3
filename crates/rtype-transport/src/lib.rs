//! Transport layer for the R-Type session client.
//!
//! Provides the [`Dialer`] trait, which abstracts "open a byte stream to
//! `host:port`", and [`TcpDialer`], the production implementation over
//! `tokio::net::TcpStream`.
//!
//! The session client is generic over its dialer so tests can hand it
//! in-memory streams (e.g. `tokio::io::duplex`) or a dialer that always
//! fails, without touching the network.

#![allow(async_fn_in_trait)]

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::TcpDialer;

use std::fmt;

use tokio::io::{AsyncRead, AsyncWrite};

/// Opaque identifier for one connection attempt.
///
/// Each call to `connect` gets a fresh id so that log lines from a
/// reconnect can be told apart from the previous session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opens outbound byte streams.
///
/// The future returned by [`dial`](Self::dial) is driven on the session's
/// own single-threaded runtime, so it does not need to be `Send`. The
/// stream it produces is split into read and write halves that live on
/// separate tasks of that runtime.
pub trait Dialer: Send + Sync + 'static {
    /// The stream type produced by this dialer.
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Connects to `host:port`.
    async fn dial(&self, host: &str, port: u16) -> Result<Self::Stream, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_equality() {
        assert_eq!(ConnectionId::new(1), ConnectionId::new(1));
        assert_ne!(ConnectionId::new(1), ConnectionId::new(2));
    }
}
