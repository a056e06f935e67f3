//! `SessionClient`: the public façade over the session layers.
//!
//! This is what a game loop holds. It ties together transport →
//! protocol → session and exposes them as a small, non-blocking API:
//!
//! - lifecycle: [`connect`](SessionClient::connect),
//!   [`disconnect`](SessionClient::disconnect), state queries;
//! - credentials for the server-prompted login flow;
//! - fire-and-forget sends for rooms, chat, leaderboard and private
//!   messages;
//! - [`poll_event`](SessionClient::poll_event), drained once per tick.
//!
//! No method blocks on the network. The only blocking call is the
//! worker thread join inside `connect`/`disconnect`/`drop`, which waits
//! for a teardown that has already been signalled. No lock is held
//! across that join.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use rtype_protocol::{
    CreateRoomRequest, Frame, JoinRoomByCodeRequest, LeaderboardRequest, LoginMessage,
    MessageType, RegisterMessage, SendChatMessageRequest, SendPrivateMessageRequest,
    SessionToken, SetReadyRequest, WirePayload,
    social::CHAT_MESSAGE_LEN,
};
use rtype_session::{ConnectionState, SessionError};
use rtype_transport::{ConnectionId, Dialer, TcpDialer};
use tokio::sync::{mpsc, watch};

use crate::shared::{IoHandle, RoomStatus, Shared, lock};
use crate::worker::{self, Target, WorkerChannels};
use crate::{ClientConfig, ClientError, ClientEvent};

/// Counter for labelling connection attempts in logs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// An authenticated TCP session with the R-Type lobby server.
///
/// Generic over its [`Dialer`] so tests can substitute the network;
/// production code uses the default [`TcpDialer`].
///
/// # Callbacks vs. events
///
/// Every notification is pushed onto the event queue. The `set_on_*`
/// hooks fire in addition, synchronously on the I/O thread at the
/// moment the event is produced. Hooks must therefore be `Send + Sync`
/// and must not touch single-threaded application state; use
/// [`poll_event`](Self::poll_event) for that.
///
/// # Example
///
/// ```rust,no_run
/// use rtype_client::prelude::*;
///
/// let client = SessionClient::new(ClientConfig::default());
/// client.set_login_credentials("alice", "secret");
/// client.connect("127.0.0.1", 4125);
///
/// // Once per frame:
/// while let Some(event) = client.poll_event() {
///     println!("{event:?}");
/// }
/// ```
pub struct SessionClient<D: Dialer = TcpDialer> {
    shared: Arc<Shared>,
    dialer: Arc<D>,
    worker: Mutex<Option<Worker>>,
    /// Workers retired from their own thread, joined later.
    detached: Mutex<Vec<JoinHandle<()>>>,
}

/// The running worker thread and the session epoch it serves.
struct Worker {
    epoch: u64,
    handle: JoinHandle<()>,
}

impl SessionClient<TcpDialer> {
    /// Creates a client that dials plain TCP with the socket options
    /// from `config`.
    pub fn new(config: ClientConfig) -> Self {
        let dialer = config.dialer();
        Self::with_dialer(config, dialer)
    }
}

impl<D: Dialer> SessionClient<D> {
    pub fn with_dialer(config: ClientConfig, dialer: D) -> Self {
        Self {
            shared: Arc::new(Shared::new(config)),
            dialer: Arc::new(dialer),
            worker: Mutex::new(None),
            detached: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Starts connecting to `host:port` in the background.
    ///
    /// An existing connection is torn down first and its worker thread
    /// is joined before a new one starts. The outcome arrives as a
    /// `Connected` or `Error` event.
    ///
    /// May be called from a hook. The current worker cannot join itself
    /// there, so its handle is parked and joined by the next `connect`,
    /// `disconnect` or drop made from the application thread.
    pub fn connect(&self, host: &str, port: u16) {
        let previous = lock(&self.worker).take();
        if let Some(previous) = previous {
            self.shared.teardown(previous.epoch);
            self.reap(previous.handle);
        }
        if self.shared.state.connection_state() != ConnectionState::Disconnected {
            tracing::info!("connect requested while active, tearing down first");
            self.shared.teardown(self.shared.state.epoch());
        }
        self.reap_detached();

        let Some(epoch) = self.shared.state.begin_connect() else {
            tracing::debug!("connect ignored: another attempt won the race");
            return;
        };
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let installed = self.shared.install_io(IoHandle {
            epoch,
            outbound: outbound_tx,
            shutdown: shutdown_tx,
        });
        if !installed {
            tracing::debug!("connect ignored: torn down before the worker started");
            return;
        }

        let target = Target {
            host: host.to_owned(),
            port,
            id: ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)),
            epoch,
        };
        let channels = WorkerChannels {
            outbound: outbound_rx,
            shutdown: shutdown_rx,
        };
        let handle = match worker::spawn(
            Arc::clone(&self.shared),
            Arc::clone(&self.dialer),
            target,
            channels,
        ) {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.report_live(
                    epoch,
                    &ClientError::Runtime(format!("failed to spawn I/O worker: {e}")),
                );
                self.shared.teardown(epoch);
                return;
            }
        };

        // A racing `connect` may have stored its worker meanwhile. Keep
        // the newer one and retire the other.
        let retired = {
            let mut slot = lock(&self.worker);
            let started = Worker { epoch, handle };
            match slot.take() {
                Some(other) if other.epoch > epoch => {
                    *slot = Some(other);
                    Some(started)
                }
                other => {
                    *slot = Some(started);
                    other
                }
            }
        };
        if let Some(retired) = retired {
            self.shared.teardown(retired.epoch);
            self.reap(retired.handle);
        }
    }

    /// Closes the connection and waits for the I/O worker to exit.
    ///
    /// Idempotent and safe to call from several threads at once: only
    /// the first call per connection emits `Disconnected`, and only if
    /// the connection had been established. Called from a hook, the
    /// worker's handle is parked instead of joined.
    pub fn disconnect(&self) {
        self.shared.teardown(self.shared.state.epoch());
        let current = lock(&self.worker).take();
        if let Some(current) = current {
            self.shared.teardown(current.epoch);
            self.reap(current.handle);
        }
        self.reap_detached();
    }

    /// Joins `handle`, or parks it when called on that very thread.
    fn reap(&self, handle: JoinHandle<()>) {
        if is_current_thread(&handle) {
            tracing::debug!("called from the I/O thread, deferring join");
            lock(&self.detached).push(handle);
            return;
        }
        join_worker(handle);
    }

    /// Joins every parked worker that is not the calling thread.
    fn reap_detached(&self) {
        let parked = std::mem::take(&mut *lock(&self.detached));
        let (own, others): (Vec<_>, Vec<_>) = parked.into_iter().partition(is_current_thread);
        lock(&self.detached).extend(own);
        for handle in others {
            join_worker(handle);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state.is_connected()
    }

    pub fn is_connecting(&self) -> bool {
        self.shared.state.is_connecting()
    }

    pub fn is_authenticated(&self) -> bool {
        self.shared.state.is_authenticated()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state.connection_state()
    }

    // -----------------------------------------------------------------------
    // Callbacks
    // -----------------------------------------------------------------------

    pub fn set_on_connected(&self, hook: impl Fn() + Send + Sync + 'static) {
        lock(&self.shared.callbacks).on_connected = Some(Arc::new(hook));
    }

    pub fn set_on_disconnected(&self, hook: impl Fn() + Send + Sync + 'static) {
        lock(&self.shared.callbacks).on_disconnected = Some(Arc::new(hook));
    }

    /// Runs for every complete inbound frame, before it is interpreted.
    pub fn set_on_receive(&self, hook: impl Fn(&Frame) + Send + Sync + 'static) {
        lock(&self.shared.callbacks).on_receive = Some(Arc::new(hook));
    }

    pub fn set_on_error(&self, hook: impl Fn(&ClientError) + Send + Sync + 'static) {
        lock(&self.shared.callbacks).on_error = Some(Arc::new(hook));
    }

    // -----------------------------------------------------------------------
    // Authentication
    // -----------------------------------------------------------------------

    /// Caches credentials to answer the server's next `Login` prompt.
    /// They survive reconnects.
    pub fn set_login_credentials(&self, username: &str, password: &str) {
        self.shared.auth.set_login_credentials(username, password);
    }

    /// Caches credentials to answer the server's next `Register` prompt.
    pub fn set_register_credentials(&self, username: &str, email: &str, password: &str) {
        self.shared
            .auth
            .set_register_credentials(username, email, password);
    }

    /// Forgets cached credentials and the session token, and drops the
    /// authenticated flag.
    pub fn clear_credentials(&self) {
        self.shared.auth.clear_credentials();
        self.shared.state.set_authenticated(false);
    }

    /// The token from the last successful extended auth ack.
    pub fn session_token(&self) -> Option<SessionToken> {
        self.shared.auth.session_token()
    }

    /// Sends a login form immediately, without waiting for a prompt.
    ///
    /// The credentials are also cached for later prompts. Failures
    /// (including not being connected) arrive as a `Write` error event.
    pub fn send_login_data(&self, username: &str, password: &str) {
        self.shared.auth.set_login_credentials(username, password);
        self.send_auth_form(MessageType::Login, &LoginMessage::new(username, password));
    }

    /// Sends a registration form immediately. See
    /// [`send_login_data`](Self::send_login_data).
    pub fn send_register_data(&self, username: &str, email: &str, password: &str) {
        self.shared
            .auth
            .set_register_credentials(username, email, password);
        self.send_auth_form(
            MessageType::Register,
            &RegisterMessage::new(username, email, password),
        );
    }

    fn send_auth_form<P: WirePayload>(&self, kind: MessageType, form: &P) {
        if !self.is_connected() {
            self.shared.report(&SessionError::NotConnected.into());
            return;
        }
        match Frame::with_payload(kind, self.is_authenticated(), form) {
            Ok(frame) => self.shared.send_or_report(&frame),
            Err(e) => self.shared.report(&e.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Rooms
    // -----------------------------------------------------------------------

    pub fn create_room(&self, name: &str, max_players: u8, is_private: bool) {
        let req = CreateRoomRequest {
            name: name.to_owned(),
            max_players,
            is_private,
        };
        self.shared
            .send_authenticated(MessageType::CreateRoom, req.to_bytes());
    }

    pub fn join_room_by_code(&self, code: &str) {
        let req = JoinRoomByCodeRequest {
            room_code: code.to_owned(),
        };
        self.shared
            .send_authenticated(MessageType::JoinRoomByCode, req.to_bytes());
    }

    pub fn leave_room(&self) {
        self.shared
            .send_authenticated(MessageType::LeaveRoom, Vec::new());
    }

    pub fn set_ready(&self, is_ready: bool) {
        self.shared.send_authenticated(
            MessageType::SetReady,
            SetReadyRequest { is_ready }.to_bytes(),
        );
    }

    /// Host only; the server rejects it from anyone else.
    pub fn start_game(&self) {
        self.shared
            .send_authenticated(MessageType::StartGame, Vec::new());
    }

    pub fn quick_join(&self) {
        self.shared
            .send_authenticated(MessageType::QuickJoin, Vec::new());
    }

    /// The room state as last confirmed by server acks.
    pub fn room_status(&self) -> RoomStatus {
        self.shared.room_status()
    }

    // -----------------------------------------------------------------------
    // Social
    // -----------------------------------------------------------------------

    /// Sends a room chat line. Empty messages and messages that do not
    /// fit the 255-byte field are dropped.
    pub fn send_chat_message(&self, message: &str) {
        if !fits_message_field(message) {
            tracing::debug!(len = message.len(), "dropping chat message: empty or too long");
            return;
        }
        let req = SendChatMessageRequest {
            message: message.to_owned(),
        };
        self.shared
            .send_authenticated(MessageType::SendChatMessage, req.to_bytes());
    }

    /// `period`: 0 all time, 1 weekly, 2 monthly.
    pub fn request_leaderboard(&self, period: u8, limit: u8) {
        let req = LeaderboardRequest { period, limit };
        self.shared
            .send_authenticated(MessageType::GetLeaderboard, req.to_bytes());
    }

    pub fn send_private_message(&self, recipient_email: &str, message: &str) {
        if recipient_email.is_empty() || !fits_message_field(message) {
            tracing::debug!("dropping private message: empty or too long");
            return;
        }
        let req = SendPrivateMessageRequest {
            recipient_email: recipient_email.to_owned(),
            message: message.to_owned(),
        };
        self.shared
            .send_authenticated(MessageType::SendPrivateMessage, req.to_bytes());
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Pops the oldest pending event. Never blocks.
    pub fn poll_event(&self) -> Option<ClientEvent> {
        self.shared.events.poll()
    }

    /// Discards all pending events.
    pub fn clear_events(&self) {
        self.shared.events.clear();
    }
}

impl<D: Dialer> Drop for SessionClient<D> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn fits_message_field(message: &str) -> bool {
    !message.is_empty() && message.len() < CHAT_MESSAGE_LEN
}

fn is_current_thread(handle: &JoinHandle<()>) -> bool {
    handle.thread().id() == std::thread::current().id()
}

fn join_worker(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::warn!("session worker panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client_is_disconnected() {
        let client = SessionClient::new(ClientConfig::default());
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
        assert!(!client.is_authenticated());
        assert!(client.poll_event().is_none());
    }

    #[test]
    fn test_disconnect_without_connect_emits_nothing() {
        let client = SessionClient::new(ClientConfig::default());
        client.disconnect();
        client.disconnect();
        assert!(client.poll_event().is_none());
    }

    #[test]
    fn test_send_login_data_while_disconnected_reports_write_error() {
        let client = SessionClient::new(ClientConfig::default());
        client.send_login_data("alice", "secret");
        match client.poll_event() {
            Some(ClientEvent::Error { kind, .. }) => assert_eq!(kind, crate::ErrorKind::Write),
            other => panic!("expected write error, got {other:?}"),
        }
    }

    #[test]
    fn test_application_sends_while_disconnected_are_silently_dropped() {
        let client = SessionClient::new(ClientConfig::default());
        client.create_room("lobby", 4, false);
        client.send_chat_message("hello");
        client.request_leaderboard(0, 10);
        assert!(client.poll_event().is_none());
    }

    #[test]
    fn test_fits_message_field_bounds() {
        assert!(!fits_message_field(""));
        assert!(fits_message_field(&"a".repeat(255)));
        assert!(!fits_message_field(&"a".repeat(256)));
    }

    #[test]
    fn test_clear_credentials_resets_token() {
        let client = SessionClient::new(ClientConfig::default());
        client.set_login_credentials("alice", "secret");
        client.clear_credentials();
        assert_eq!(client.session_token(), None);
        assert!(!client.is_authenticated());
    }
}
