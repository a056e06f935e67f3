//! State shared between the application thread and the I/O worker.
//!
//! [`Shared`] lives behind an `Arc` held by both the
//! [`SessionClient`](crate::SessionClient) and its worker thread. The
//! application side reads flags, sets credentials and enqueues outbound
//! frames; the worker side dispatches inbound frames, pushes events and
//! runs teardown.

use std::sync::{Arc, Mutex, MutexGuard};

use rtype_protocol::{
    ChatMessagePayload, CreateRoomAck, Frame, GameStarting, JoinRoomAck, JoinRoomNack,
    LeaderboardData, MessageType, PrivateMessageReceived, ProtocolError, SetReadyRequest,
};
use rtype_session::{AuthFlow, SessionError, SessionState};
use rtype_transport::TransportError;
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::{ClientConfig, ClientError, ClientEvent, ErrorKind, EventQueue};

/// Locks `m`, recovering the data if a panicking thread poisoned it.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

pub(crate) type Hook = Arc<dyn Fn() + Send + Sync>;
pub(crate) type FrameHook = Arc<dyn Fn(&Frame) + Send + Sync>;
pub(crate) type ErrorHook = Arc<dyn Fn(&ClientError) + Send + Sync>;

/// Optional hooks run synchronously on the I/O thread.
///
/// Each hook is cloned out of the lock before it is called, so a hook
/// may itself register or replace hooks.
#[derive(Default)]
pub(crate) struct Callbacks {
    pub(crate) on_connected: Option<Hook>,
    pub(crate) on_disconnected: Option<Hook>,
    pub(crate) on_receive: Option<FrameHook>,
    pub(crate) on_error: Option<ErrorHook>,
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// The lobby room this client is in, as last confirmed by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoomStatus {
    pub current_room_code: Option<String>,
    pub is_host: bool,
    pub is_ready: bool,
}

impl RoomStatus {
    pub fn in_room(&self) -> bool {
        self.current_room_code.is_some()
    }
}

// ---------------------------------------------------------------------------
// IoHandle
// ---------------------------------------------------------------------------

/// Application-side ends of the worker's channels for one connection.
pub(crate) struct IoHandle {
    /// The connection these channels belong to.
    pub(crate) epoch: u64,
    /// Encoded frames waiting for the writer task.
    pub(crate) outbound: mpsc::UnboundedSender<Vec<u8>>,
    /// Flipped to `true` to stop the worker.
    pub(crate) shutdown: watch::Sender<bool>,
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

pub(crate) struct Shared {
    pub(crate) config: ClientConfig,
    pub(crate) state: SessionState,
    pub(crate) auth: AuthFlow,
    pub(crate) events: EventQueue<ClientEvent>,
    pub(crate) callbacks: Mutex<Callbacks>,
    room: Mutex<RoomStatus>,
    io: Mutex<Option<IoHandle>>,
}

impl Shared {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self {
            state: SessionState::new(),
            auth: AuthFlow::new(config.session.max_auth_failures),
            events: EventQueue::with_capacity(config.event_queue_capacity),
            callbacks: Mutex::new(Callbacks::default()),
            room: Mutex::new(RoomStatus::default()),
            io: Mutex::new(None),
            config,
        }
    }

    pub(crate) fn room_status(&self) -> RoomStatus {
        lock(&self.room).clone()
    }

    // -- Event emission --

    fn emit(&self, event: ClientEvent) {
        self.events.push(event);
    }

    /// Queues an error event and runs the error hook.
    pub(crate) fn report(&self, err: &ClientError) {
        let kind = err.kind();
        match kind {
            ErrorKind::Closed => tracing::info!(error = %err, "connection closed by peer"),
            _ => tracing::warn!(?kind, error = %err, "session error"),
        }
        self.emit(ClientEvent::Error {
            kind,
            message: err.to_string(),
        });
        self.run_error_hook(err);
    }

    fn run_error_hook(&self, err: &ClientError) {
        let hook = lock(&self.callbacks).on_error.clone();
        if let Some(hook) = hook {
            hook(err);
        }
    }

    /// Like [`report`](Self::report), but only while `epoch` is still the
    /// live connection. A superseded worker has nobody left to tell.
    pub(crate) fn report_live(&self, epoch: u64, err: &ClientError) {
        if self.state.is_live(epoch) {
            self.report(err);
        } else {
            tracing::debug!(error = %err, "dropping error from a superseded connection");
        }
    }

    pub(crate) fn notify_connected(&self) {
        self.emit(ClientEvent::Connected);
        let hook = lock(&self.callbacks).on_connected.clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    // -- Connection lifecycle --

    /// Installs the channels of connection `handle.epoch`.
    ///
    /// Returns `false`, dropping the handle, if that connection was torn
    /// down before its channels could be installed.
    pub(crate) fn install_io(&self, handle: IoHandle) -> bool {
        let mut io = lock(&self.io);
        if !self.state.is_live(handle.epoch) {
            return false;
        }
        if let Some(stale) = io.replace(handle) {
            let _ = stale.shutdown.send(true);
        }
        true
    }

    /// Tears connection `epoch` down. Safe to call any number of times
    /// from any thread; only the first call for the current connection
    /// acts, and calls for a superseded connection do nothing.
    ///
    /// Stops the worker, drops the send queue, forgets the room, and
    /// emits `Disconnected` if the connection had been established.
    pub(crate) fn teardown(&self, epoch: u64) {
        let Some(was_connected) = self.state.begin_teardown(epoch) else {
            return;
        };

        let mut io = lock(&self.io);
        if io.as_ref().is_some_and(|h| h.epoch == epoch) {
            if let Some(handle) = io.take() {
                // The worker may already be gone, in which case nobody is
                // listening and that is fine.
                let _ = handle.shutdown.send(true);
            }
        }
        drop(io);
        *lock(&self.room) = RoomStatus::default();

        if was_connected {
            tracing::info!("disconnected");
            self.emit(ClientEvent::Disconnected);
            let hook = lock(&self.callbacks).on_disconnected.clone();
            if let Some(hook) = hook {
                hook();
            }
        }
    }

    // -- Outbound --

    /// Hands an encoded frame to the writer task.
    pub(crate) fn enqueue(&self, frame: &Frame) -> Result<(), ClientError> {
        let io = lock(&self.io);
        let Some(io) = io.as_ref() else {
            return Err(SessionError::NotConnected.into());
        };
        io.outbound
            .send(frame.to_bytes())
            .map_err(|_| TransportError::ConnectionClosed("send queue closed".into()))?;
        tracing::trace!(kind = ?frame.kind(), bytes = frame.wire_len(), "frame queued");
        Ok(())
    }

    /// Enqueues a frame, turning failure into an error event.
    pub(crate) fn send_or_report(&self, frame: &Frame) {
        if let Err(e) = self.enqueue(frame) {
            self.report(&e);
        }
    }

    /// Queues a heartbeat for connection `epoch`. A tick racing a
    /// teardown or a reconnect finds no matching send queue and does
    /// nothing.
    pub(crate) fn send_heartbeat(&self, epoch: u64) {
        let frame = Frame::empty(MessageType::HeartBeat, self.state.is_authenticated());
        let io = lock(&self.io);
        let Some(io) = io.as_ref().filter(|h| h.epoch == epoch) else {
            return;
        };
        if io.outbound.send(frame.to_bytes()).is_err() {
            tracing::debug!("heartbeat dropped: send queue closed");
        }
    }

    /// Sends an application message that requires an authenticated
    /// session. Anything else is dropped with a debug log.
    pub(crate) fn send_authenticated(&self, kind: MessageType, payload: Vec<u8>) {
        if !self.state.is_connected() || !self.state.is_authenticated() {
            tracing::debug!(%kind, "dropping send: session not authenticated");
            return;
        }
        match Frame::new(kind, true, payload) {
            Ok(frame) => self.send_or_report(&frame),
            Err(e) => self.report(&e.into()),
        }
    }

    // -- Inbound --

    /// Routes one inbound frame read by connection `epoch`. Runs on the
    /// I/O thread.
    ///
    /// Undecodable payloads are reported and skipped; they do not
    /// desynchronize the stream, so the connection stays up.
    pub(crate) fn dispatch(&self, frame: &Frame, epoch: u64) {
        if !self.state.is_live(epoch) {
            tracing::debug!("dropping frame read by a superseded connection");
            return;
        }
        let hook = lock(&self.callbacks).on_receive.clone();
        if let Some(hook) = hook {
            hook(frame);
        }

        let Some(kind) = frame.kind() else {
            tracing::debug!(
                code = frame.header.message_type,
                size = frame.payload.len(),
                "ignoring unknown message type"
            );
            return;
        };
        tracing::debug!(%kind, size = frame.payload.len(), "frame received");

        if let Err(e) = self.handle(kind, frame) {
            self.report(&e);
        }
    }

    fn handle(&self, kind: MessageType, frame: &Frame) -> Result<(), ClientError> {
        match kind {
            MessageType::HeartBeat | MessageType::HeartBeatAck => {}

            MessageType::Login | MessageType::Register => {
                if let Some(reply) = self.auth.on_prompt(kind, self.state.is_authenticated())? {
                    tracing::info!(%kind, "answering server prompt with cached credentials");
                    self.enqueue(&reply)?;
                }
            }
            MessageType::LoginAck | MessageType::RegisterAck => self.handle_auth_ack(frame)?,

            MessageType::CreateRoomAck => {
                let ack = frame.decode::<CreateRoomAck>()?;
                if ack.success {
                    tracing::info!(code = %ack.room_code, "room created");
                    *lock(&self.room) = RoomStatus {
                        current_room_code: Some(ack.room_code.clone()),
                        is_host: true,
                        is_ready: false,
                    };
                    self.emit(ClientEvent::RoomCreated {
                        code: ack.room_code,
                    });
                } else {
                    self.emit(ClientEvent::RoomCreateFailed {
                        error_code: ack.error_code,
                        message: ack.message,
                    });
                }
            }
            MessageType::JoinRoomAck => {
                let ack = frame.decode::<JoinRoomAck>()?;
                tracing::info!(code = %ack.room_code, slot = ack.slot_id, "joined room");
                *lock(&self.room) = RoomStatus {
                    current_room_code: Some(ack.room_code.clone()),
                    is_host: ack.is_host,
                    is_ready: false,
                };
                self.emit(ClientEvent::RoomJoined {
                    slot_id: ack.slot_id,
                    name: ack.room_name,
                    code: ack.room_code,
                    max_players: ack.max_players,
                    is_host: ack.is_host,
                });
            }
            MessageType::JoinRoomNack | MessageType::QuickJoinNack => {
                let nack = frame.decode::<JoinRoomNack>()?;
                self.emit(ClientEvent::RoomJoinFailed {
                    error_code: nack.error_code,
                    message: nack.message,
                });
            }
            MessageType::LeaveRoomAck => {
                *lock(&self.room) = RoomStatus::default();
                self.emit(ClientEvent::RoomLeft);
            }
            MessageType::SetReadyAck => {
                let ack = frame.decode::<SetReadyRequest>()?;
                lock(&self.room).is_ready = ack.is_ready;
                self.emit(ClientEvent::ReadyChanged {
                    ready: ack.is_ready,
                });
            }
            MessageType::StartGameAck => self.emit(ClientEvent::GameStartConfirmed),
            MessageType::GameStarting => {
                let msg = frame.decode::<GameStarting>()?;
                self.emit(ClientEvent::GameStarting {
                    countdown_seconds: msg.countdown_seconds,
                });
            }

            MessageType::ChatMessageBroadcast => {
                let msg = frame.decode::<ChatMessagePayload>()?;
                self.emit(ClientEvent::ChatMessage {
                    display_name: msg.display_name,
                    message: msg.message,
                    timestamp: msg.timestamp,
                });
            }
            MessageType::LeaderboardData => {
                let data = LeaderboardData::from_bytes(&frame.payload).ok_or_else(|| {
                    ProtocolError::Malformed {
                        message_type: kind,
                        reason: format!(
                            "{} bytes is shorter than the declared entry count",
                            frame.payload.len()
                        ),
                    }
                })?;
                self.emit(ClientEvent::Leaderboard {
                    period: data.period,
                    your_rank: data.your_rank,
                    entries: data.entries,
                });
            }
            MessageType::PrivateMessageReceived => {
                let msg = frame.decode::<PrivateMessageReceived>()?;
                self.emit(ClientEvent::PrivateMessage {
                    sender_email: msg.sender_email,
                    sender_display_name: msg.sender_display_name,
                    message: msg.message,
                    timestamp: msg.timestamp,
                });
            }
            MessageType::SendChatMessageAck | MessageType::SendPrivateMessageAck => {}

            // Client → server requests; a server has no business sending them.
            MessageType::CreateRoom
            | MessageType::JoinRoomByCode
            | MessageType::LeaveRoom
            | MessageType::SetReady
            | MessageType::StartGame
            | MessageType::QuickJoin
            | MessageType::SendChatMessage
            | MessageType::GetLeaderboard
            | MessageType::SendPrivateMessage => {
                tracing::debug!(%kind, "ignoring client-bound request type");
            }
        }
        Ok(())
    }

    fn handle_auth_ack(&self, frame: &Frame) -> Result<(), ClientError> {
        if !self.state.is_connected() {
            tracing::debug!("ignoring auth ack outside an established connection");
            return Ok(());
        }
        match self.auth.on_ack(&frame.payload) {
            Ok(success) => {
                let client = &self.config.client_version;
                if success.version_mismatch(client) {
                    tracing::warn!(
                        %client,
                        server = %success.server_version,
                        "server version differs from client"
                    );
                    self.emit(ClientEvent::VersionMismatch {
                        client: client.clone(),
                        server: success.server_version.clone(),
                    });
                }
                self.state.set_authenticated(true);
                tracing::info!(server_version = %success.server_version, "authenticated");
                self.emit(ClientEvent::AuthSuccess {
                    server_version: success.server_version,
                });
                Ok(())
            }
            Err(SessionError::AuthRejected {
                error_code,
                message,
            }) => {
                tracing::warn!(%error_code, %message, "authentication rejected");
                self.emit(ClientEvent::AuthFailed {
                    error_code: error_code.clone(),
                    message: message.clone(),
                });
                // The queue already carries `AuthFailed`; the hook still
                // hears about it, without a second `Error` event.
                self.run_error_hook(&ClientError::Session(SessionError::AuthRejected {
                    error_code,
                    message,
                }));
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
