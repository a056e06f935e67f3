//! Events handed from the I/O thread to the application thread.
//!
//! The I/O worker never calls into application state directly. Instead
//! it pushes a [`ClientEvent`] onto an [`EventQueue`], and the
//! application drains it once per update tick with
//! [`SessionClient::poll_event`](crate::SessionClient::poll_event).
//! Events come out in exactly the order they went in.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use rtype_protocol::{LeaderboardEntry, VersionInfo};
use serde::Serialize;

use crate::ErrorKind;

// ---------------------------------------------------------------------------
// ClientEvent
// ---------------------------------------------------------------------------

/// Something the application should know about.
///
/// Serializes as a JSON object tagged by `"type"`, e.g.
/// `{"type":"auth_success","server_version":{...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// The TCP connection is up. Authentication has not happened yet.
    Connected,
    /// The connection is gone. Emitted once per established connection.
    Disconnected,

    // -- Authentication --
    AuthSuccess {
        server_version: VersionInfo,
    },
    AuthFailed {
        error_code: String,
        message: String,
    },
    /// Queued just before `AuthSuccess` when major/minor versions differ.
    VersionMismatch {
        client: VersionInfo,
        server: VersionInfo,
    },

    // -- Rooms --
    RoomCreated {
        code: String,
    },
    RoomCreateFailed {
        error_code: String,
        message: String,
    },
    RoomJoined {
        slot_id: u8,
        name: String,
        code: String,
        max_players: u8,
        is_host: bool,
    },
    RoomJoinFailed {
        error_code: String,
        message: String,
    },
    RoomLeft,
    ReadyChanged {
        ready: bool,
    },
    GameStartConfirmed,
    GameStarting {
        countdown_seconds: u8,
    },

    // -- Social --
    ChatMessage {
        display_name: String,
        message: String,
        timestamp: u64,
    },
    Leaderboard {
        period: u8,
        your_rank: u32,
        entries: Vec<LeaderboardEntry>,
    },
    PrivateMessage {
        sender_email: String,
        sender_display_name: String,
        message: String,
        timestamp: u64,
    },

    /// A failure on the I/O thread. Fatal kinds are followed by
    /// `Disconnected`.
    Error {
        kind: ErrorKind,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// EventQueue
// ---------------------------------------------------------------------------

/// Mutex-guarded FIFO shared between one producer and one consumer.
///
/// Neither side ever blocks for long: both `push` and `poll` hold the
/// lock only for a single `VecDeque` operation. A poisoned lock is
/// recovered, since a `VecDeque` cannot be left half-modified by a
/// panicking `push_back`.
#[derive(Debug)]
pub struct EventQueue<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: Option<usize>,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T> EventQueue<T> {
    pub fn unbounded() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            capacity: None,
        }
    }

    /// A queue holding at most `capacity` entries. When full, `push`
    /// drops the oldest entry to make room.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            Some(n) => Self::bounded(n),
            None => Self::unbounded(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends an entry. Never blocks on a full queue.
    pub fn push(&self, item: T) {
        let mut queue = self.lock();
        if let Some(cap) = self.capacity {
            while queue.len() >= cap {
                queue.pop_front();
                tracing::warn!(capacity = cap, "event queue full, dropped oldest event");
            }
        }
        queue.push_back(item);
    }

    /// Removes and returns the oldest entry, if any.
    pub fn poll(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Discards every pending entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
