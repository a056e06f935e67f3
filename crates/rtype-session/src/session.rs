//! Session configuration and the connection state machine.
//!
//! The state machine is a handful of atomic flags rather than a
//! mutex-guarded enum: the application thread polls `is_connected()`
//! and `is_authenticated()` every frame, and those reads must never
//! wait on the I/O thread. Only the transitions themselves take a
//! short lock, so a connect completing and a teardown starting cannot
//! interleave.
//!
//! ```text
//!   Disconnected ──connect()──→ Connecting ──tcp ok──→ Connected ─┐
//!        ↑                          │                      │      │ auth ack
//!        │                          └──dial failed─────────┤      ↓
//!        └────────── teardown (error, EOF, timeout, disconnect()) ─ Connected + authenticated
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Timing and retry knobs for one session.
///
/// Durations serialize as whole milliseconds under `*_ms` keys, so a
/// JSON config reads `{"heartbeat_interval_ms": 1000}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How often a heartbeat is sent once connected.
    ///
    /// Default: 1000 ms.
    #[serde(rename = "heartbeat_interval_ms", with = "duration_ms")]
    pub heartbeat_interval: Duration,

    /// How long the peer may stay silent before the connection is
    /// considered dead. Any inbound frame counts as a response.
    ///
    /// Default: 5000 ms.
    #[serde(rename = "heartbeat_timeout_ms", with = "duration_ms")]
    pub heartbeat_timeout: Duration,

    /// Consecutive failed auth acks after which cached credentials are
    /// dropped. `0` keeps them forever.
    ///
    /// Default: 0.
    pub max_auth_failures: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(1000),
            heartbeat_timeout: Duration::from_millis(5000),
            max_auth_failures: 0,
        }
    }
}

/// `serde(with = ...)` helper storing a `Duration` as integer milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// The externally visible connection state.
///
/// Authentication is tracked separately: it is a flag on top of
/// `Connected`, not a state of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Connection flags shared between the I/O thread and callers.
///
/// Reads are plain atomic loads; transitions serialize on a private lock.
///
/// Every successful [`begin_connect`](Self::begin_connect) starts a new
/// *epoch*. Transitions made on behalf of a connection carry its epoch
/// and are ignored once a newer connection exists, so a worker that is
/// still winding down cannot touch its successor.
#[derive(Debug, Default)]
pub struct SessionState {
    connecting: AtomicBool,
    connected: AtomicBool,
    authenticated: AtomicBool,
    tearing_down: AtomicBool,
    epoch: AtomicU64,
    transition: Mutex<()>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    fn transition(&self) -> MutexGuard<'_, ()> {
        self.transition
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Moves `Disconnected → Connecting` and returns the new epoch.
    ///
    /// Returns `None` (and changes nothing) if a connection is already
    /// in progress or established.
    pub fn begin_connect(&self) -> Option<u64> {
        let _t = self.transition();
        if self.is_connected() || self.is_connecting() {
            return None;
        }
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        self.connecting.store(true, Ordering::Release);
        self.authenticated.store(false, Ordering::Release);
        self.tearing_down.store(false, Ordering::Release);
        Some(epoch)
    }

    /// Moves `Connecting → Connected` for `epoch`.
    ///
    /// Returns `false` if that attempt was torn down or superseded while
    /// the dial was in flight; the caller must then drop the fresh stream.
    pub fn mark_connected(&self, epoch: u64) -> bool {
        let _t = self.transition();
        if !self.is_live(epoch) || !self.is_connecting() {
            return false;
        }
        self.connected.store(true, Ordering::Release);
        self.connecting.store(false, Ordering::Release);
        true
    }

    /// Claims the teardown of connection `epoch`.
    ///
    /// Only the first caller wins; it gets back `Some(was_connected)` and
    /// every flag is cleared. Later callers, and callers holding a stale
    /// epoch, get `None` and must do nothing.
    pub fn begin_teardown(&self, epoch: u64) -> Option<bool> {
        let _t = self.transition();
        if self.epoch() != epoch || self.tearing_down.swap(true, Ordering::AcqRel) {
            return None;
        }
        let was_connected = self.connected.swap(false, Ordering::AcqRel);
        self.connecting.store(false, Ordering::Release);
        self.authenticated.store(false, Ordering::Release);
        Some(was_connected)
    }

    pub fn set_authenticated(&self, value: bool) {
        self.authenticated.store(value, Ordering::Release);
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::Acquire)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// Whether the current connection is already being torn down.
    pub fn is_tearing_down(&self) -> bool {
        self.tearing_down.load(Ordering::Acquire)
    }

    /// The epoch of the most recent connection attempt (0 before any).
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Whether `epoch` is the current connection and not yet torn down.
    pub fn is_live(&self, epoch: u64) -> bool {
        self.epoch() == epoch && !self.is_tearing_down()
    }

    /// Derived snapshot of the three-state machine.
    pub fn connection_state(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::Connected
        } else if self.is_connecting() {
            ConnectionState::Connecting
        } else {
            ConnectionState::Disconnected
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    // =====================================================================
    // SessionConfig
    // =====================================================================

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_millis(1000));
        assert_eq!(config.heartbeat_timeout, Duration::from_millis(5000));
        assert_eq!(config.max_auth_failures, 0);
    }

    #[test]
    fn test_session_config_json_uses_millisecond_keys() {
        let json = serde_json::to_value(SessionConfig::default()).unwrap();
        assert_eq!(json["heartbeat_interval_ms"], 1000);
        assert_eq!(json["heartbeat_timeout_ms"], 5000);
    }

    #[test]
    fn test_session_config_partial_json_keeps_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"heartbeat_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.heartbeat_timeout, Duration::from_millis(250));
        assert_eq!(config.heartbeat_interval, Duration::from_millis(1000));
    }

    // =====================================================================
    // SessionState transitions
    // =====================================================================

    /// Connects and returns the epoch of the new connection.
    fn connected(state: &SessionState) -> u64 {
        let epoch = state.begin_connect().unwrap();
        assert!(state.mark_connected(epoch));
        epoch
    }

    #[test]
    fn test_new_state_is_disconnected() {
        let state = SessionState::new();
        assert_eq!(state.connection_state(), ConnectionState::Disconnected);
        assert!(!state.is_authenticated());
        assert_eq!(state.epoch(), 0);
    }

    #[test]
    fn test_begin_connect_twice_second_is_rejected() {
        let state = SessionState::new();
        assert_eq!(state.begin_connect(), Some(1));
        assert_eq!(state.connection_state(), ConnectionState::Connecting);
        assert_eq!(state.begin_connect(), None);
        assert_eq!(state.epoch(), 1);
    }

    #[test]
    fn test_begin_connect_while_connected_is_rejected() {
        let state = SessionState::new();
        connected(&state);
        assert_eq!(state.begin_connect(), None);
        assert_eq!(state.connection_state(), ConnectionState::Connected);
    }

    #[test]
    fn test_begin_teardown_clears_every_flag() {
        let state = SessionState::new();
        let epoch = connected(&state);
        state.set_authenticated(true);

        assert_eq!(state.begin_teardown(epoch), Some(true));
        assert_eq!(state.connection_state(), ConnectionState::Disconnected);
        assert!(!state.is_authenticated());
        assert!(!state.is_live(epoch));
    }

    #[test]
    fn test_begin_teardown_second_call_returns_none() {
        let state = SessionState::new();
        let epoch = connected(&state);
        assert_eq!(state.begin_teardown(epoch), Some(true));
        assert_eq!(state.begin_teardown(epoch), None);
    }

    #[test]
    fn test_mark_connected_after_teardown_is_refused() {
        let state = SessionState::new();
        let epoch = state.begin_connect().unwrap();
        state.begin_teardown(epoch);
        assert!(!state.mark_connected(epoch));
        assert_eq!(state.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_begin_teardown_during_connecting_reports_not_connected() {
        let state = SessionState::new();
        let epoch = state.begin_connect().unwrap();
        assert_eq!(state.begin_teardown(epoch), Some(false));
    }

    #[test]
    fn test_begin_connect_after_teardown_starts_new_epoch() {
        let state = SessionState::new();
        let first = connected(&state);
        state.begin_teardown(first);

        let second = connected(&state);
        assert_eq!(second, first + 1);
        assert_eq!(state.begin_teardown(second), Some(true));
    }

    #[test]
    fn test_begin_teardown_with_stale_epoch_leaves_new_connection_alone() {
        let state = SessionState::new();
        let old = connected(&state);
        state.begin_teardown(old);
        let new = connected(&state);

        assert_eq!(state.begin_teardown(old), None);
        assert!(state.is_connected());
        assert!(state.is_live(new));
        assert!(!state.is_live(old));
    }

    #[test]
    fn test_mark_connected_with_stale_epoch_is_refused() {
        let state = SessionState::new();
        let old = state.begin_connect().unwrap();
        state.begin_teardown(old);
        let new = state.begin_connect().unwrap();

        assert!(!state.mark_connected(old));
        assert_eq!(state.connection_state(), ConnectionState::Connecting);
        assert!(state.mark_connected(new));
    }

    #[test]
    fn test_begin_teardown_concurrent_exactly_one_winner() {
        let state = Arc::new(SessionState::new());
        let epoch = connected(&state);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || state.begin_teardown(epoch))
            })
            .collect();
        let winners = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .count();
        assert_eq!(winners, 1);
    }
}
