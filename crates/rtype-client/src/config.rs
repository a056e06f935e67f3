//! Client configuration.
//!
//! Everything tunable lives in one explicit [`ClientConfig`] value handed
//! to [`SessionClient::new`](crate::SessionClient::new). There is no
//! global state; two clients in one process can run with different
//! settings.

use std::time::Duration;

use rtype_protocol::{DEFAULT_MAX_PAYLOAD_SIZE, VersionInfo};
use rtype_session::{SessionConfig, duration_ms};
use rtype_transport::TcpDialer;
use serde::{Deserialize, Serialize};

use crate::ClientError;

/// Settings for one [`SessionClient`](crate::SessionClient).
///
/// Missing JSON fields fall back to their defaults, so
/// `{"session": {"heartbeat_timeout_ms": 3000}}` is a complete config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Heartbeat timing and auth retry policy.
    pub session: SessionConfig,

    /// Largest payload accepted from the server. A header announcing
    /// more is a protocol violation and drops the connection.
    ///
    /// Default: 64 KiB.
    pub max_payload_size: usize,

    /// Size of the socket read buffer.
    ///
    /// Default: 4096 bytes.
    pub read_buffer_size: usize,

    /// `None` for an unbounded event queue; `Some(n)` keeps at most `n`
    /// events and drops the oldest on overflow.
    ///
    /// Default: `None`.
    pub event_queue_capacity: Option<usize>,

    /// Disable Nagle's algorithm on the socket.
    ///
    /// Default: `true`.
    pub tcp_nodelay: bool,

    /// Upper bound on resolve + connect.
    ///
    /// Default: 5000 ms.
    #[serde(rename = "connect_timeout_ms", with = "duration_ms")]
    pub connect_timeout: Duration,

    /// This client's version, compared against the one the server
    /// reports on a successful login.
    pub client_version: VersionInfo,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            read_buffer_size: 4096,
            event_queue_capacity: None,
            tcp_nodelay: true,
            connect_timeout: Duration::from_millis(5000),
            client_version: crate_version(),
        }
    }
}

impl ClientConfig {
    /// Parses a (possibly partial) JSON document.
    ///
    /// # Errors
    /// [`ClientError::Config`] if the JSON is malformed or a field has
    /// the wrong type.
    pub fn from_json_str(json: &str) -> Result<Self, ClientError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The dialer these settings describe.
    pub fn dialer(&self) -> TcpDialer {
        TcpDialer::new(self.tcp_nodelay, self.connect_timeout)
    }
}

/// This crate's version as a [`VersionInfo`].
fn crate_version() -> VersionInfo {
    let parse = |s: &str| s.parse::<u8>().unwrap_or(0);
    VersionInfo::new(
        parse(env!("CARGO_PKG_VERSION_MAJOR")),
        parse(env!("CARGO_PKG_VERSION_MINOR")),
        parse(env!("CARGO_PKG_VERSION_PATCH")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = ClientConfig::default();
        assert_eq!(config.session.heartbeat_interval, Duration::from_millis(1000));
        assert_eq!(config.session.heartbeat_timeout, Duration::from_millis(5000));
        assert_eq!(config.max_payload_size, 64 * 1024);
        assert_eq!(config.read_buffer_size, 4096);
        assert_eq!(config.event_queue_capacity, None);
        assert!(config.tcp_nodelay);
        assert_eq!(config.connect_timeout, Duration::from_millis(5000));
        assert_eq!(config.client_version, VersionInfo::new(0, 1, 0));
    }

    #[test]
    fn test_from_json_str_partial_document_keeps_defaults() {
        let config = ClientConfig::from_json_str(
            r#"{"session": {"heartbeat_timeout_ms": 3000}, "event_queue_capacity": 64}"#,
        )
        .unwrap();
        assert_eq!(config.session.heartbeat_timeout, Duration::from_millis(3000));
        assert_eq!(config.session.heartbeat_interval, Duration::from_millis(1000));
        assert_eq!(config.event_queue_capacity, Some(64));
        assert_eq!(config.max_payload_size, 64 * 1024);
    }

    #[test]
    fn test_from_json_str_empty_object_is_default() {
        assert_eq!(ClientConfig::from_json_str("{}").unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_from_json_str_wrong_type_returns_config_error() {
        let err = ClientConfig::from_json_str(r#"{"tcp_nodelay": "yes"}"#).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_serialized_durations_are_milliseconds() {
        let json = serde_json::to_value(ClientConfig::default()).unwrap();
        assert_eq!(json["connect_timeout_ms"], 5000);
        assert_eq!(json["session"]["heartbeat_interval_ms"], 1000);
    }

    #[test]
    fn test_dialer_carries_socket_options() {
        let config = ClientConfig {
            tcp_nodelay: false,
            connect_timeout: Duration::from_millis(250),
            ..ClientConfig::default()
        };
        let dialer = config.dialer();
        assert!(!dialer.nodelay());
        assert_eq!(dialer.connect_timeout(), Duration::from_millis(250));
    }
}
