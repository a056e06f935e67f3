//! Server-prompted authentication.
//!
//! The server drives the handshake, not the client. After connecting,
//! the server sends an empty `Login` or `Register` prompt; the client
//! answers with credentials the application cached beforehand. The
//! server then replies with `LoginAck`/`RegisterAck`.
//!
//! ```text
//!   app: set_login_credentials("alice", "secret")
//!   server → Login (empty)
//!   client → Login { username: "alice", password: "secret" }
//!   server → LoginAck { success: true, ... }
//! ```
//!
//! [`AuthFlow`] holds the cached credentials and turns prompts into
//! reply frames and acks into outcomes. It owns no socket and no state
//! flags; the client applies the outcome.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use rtype_protocol::{
    AuthResponseWithToken, Frame, LoginMessage, MessageType, ProtocolError, RegisterMessage,
    SessionToken, VersionInfo,
};

use crate::SessionError;

// ---------------------------------------------------------------------------
// PendingCredentials
// ---------------------------------------------------------------------------

/// Credentials waiting for a server prompt.
///
/// Login uses `username` + `password`; registration also needs `email`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PendingCredentials {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl PendingCredentials {
    /// The login form, if username and password are both set.
    pub fn login(&self) -> Option<LoginMessage> {
        if self.username.is_empty() || self.password.is_empty() {
            return None;
        }
        Some(LoginMessage::new(&self.username, &self.password))
    }

    /// The registration form, if username, email and password are all set.
    pub fn register(&self) -> Option<RegisterMessage> {
        if self.username.is_empty() || self.email.is_empty() || self.password.is_empty() {
            return None;
        }
        Some(RegisterMessage::new(&self.username, &self.email, &self.password))
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.email.is_empty() && self.password.is_empty()
    }
}

impl std::fmt::Debug for PendingCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCredentials")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AuthSuccess
// ---------------------------------------------------------------------------

/// What a successful ack carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSuccess {
    /// Present only when the server used the extended ack.
    pub token: Option<SessionToken>,
    /// [`VersionInfo::default`] when the server did not report one.
    pub server_version: VersionInfo,
}

impl AuthSuccess {
    /// `true` when the server reported a version whose major/minor differ
    /// from `client`. An unreported version never mismatches.
    pub fn version_mismatch(&self, client: &VersionInfo) -> bool {
        !self.server_version.is_unknown() && !client.is_compatible_with(&self.server_version)
    }
}

// ---------------------------------------------------------------------------
// AuthFlow
// ---------------------------------------------------------------------------

/// Credential cache plus prompt/ack handling.
///
/// Shared between the application thread (setters) and the I/O thread
/// (prompts and acks), so every field is behind a lock or an atomic.
#[derive(Debug, Default)]
pub struct AuthFlow {
    pending: Mutex<PendingCredentials>,
    token: Mutex<Option<SessionToken>>,
    consecutive_failures: AtomicU32,
    /// 0 disables purging.
    max_failures: u32,
}

/// Locks `m`, recovering the data if a panicking thread poisoned it.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AuthFlow {
    /// `max_failures` consecutive rejected acks purge the credentials;
    /// `0` keeps them forever.
    pub fn new(max_failures: u32) -> Self {
        Self {
            max_failures,
            ..Self::default()
        }
    }

    // -- Credential cache --

    pub fn set_login_credentials(&self, username: &str, password: &str) {
        let mut pending = lock(&self.pending);
        pending.username = username.to_owned();
        pending.password = password.to_owned();
        self.consecutive_failures.store(0, Ordering::Release);
    }

    pub fn set_register_credentials(&self, username: &str, email: &str, password: &str) {
        let mut pending = lock(&self.pending);
        pending.username = username.to_owned();
        pending.email = email.to_owned();
        pending.password = password.to_owned();
        self.consecutive_failures.store(0, Ordering::Release);
    }

    /// Drops the cached credentials and the session token.
    pub fn clear_credentials(&self) {
        *lock(&self.pending) = PendingCredentials::default();
        *lock(&self.token) = None;
        self.consecutive_failures.store(0, Ordering::Release);
    }

    /// A snapshot of the cached credentials.
    pub fn pending(&self) -> PendingCredentials {
        lock(&self.pending).clone()
    }

    /// The token from the last successful extended ack, if any.
    pub fn session_token(&self) -> Option<SessionToken> {
        *lock(&self.token)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    // -- Inbound handling --

    /// Builds the reply to a server prompt.
    ///
    /// Returns `None` for non-prompt types and when the credentials the
    /// prompt needs are incomplete.
    pub fn on_prompt(
        &self,
        kind: MessageType,
        is_authenticated: bool,
    ) -> Result<Option<Frame>, ProtocolError> {
        let pending = lock(&self.pending);
        match kind {
            MessageType::Login => match pending.login() {
                Some(form) => Frame::with_payload(kind, is_authenticated, &form).map(Some),
                None => {
                    tracing::debug!("login prompt without cached credentials");
                    Ok(None)
                }
            },
            MessageType::Register => match pending.register() {
                Some(form) => Frame::with_payload(kind, is_authenticated, &form).map(Some),
                None => {
                    tracing::debug!("register prompt without cached credentials");
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }

    /// Interprets a `LoginAck`/`RegisterAck` payload.
    ///
    /// On success the token is stored and the failure count reset. On
    /// rejection the failure count grows and, once it reaches the
    /// configured limit, the cached credentials are purged.
    ///
    /// # Errors
    /// - [`SessionError::AuthRejected`] if the server said no.
    /// - [`SessionError::MalformedAuthResponse`] if the payload is too
    ///   short for either ack form.
    pub fn on_ack(&self, payload: &[u8]) -> Result<AuthSuccess, SessionError> {
        let ack = AuthResponseWithToken::from_ack_payload(payload)
            .ok_or(SessionError::MalformedAuthResponse { len: payload.len() })?;

        if !ack.response.success {
            self.record_failure();
            return Err(SessionError::AuthRejected {
                error_code: ack.response.error_code,
                message: ack.response.message,
            });
        }

        self.consecutive_failures.store(0, Ordering::Release);
        let token = (!ack.token.is_empty()).then_some(ack.token);
        if token.is_some() {
            *lock(&self.token) = token;
        }
        Ok(AuthSuccess {
            token,
            server_version: ack.server_version,
        })
    }

    fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if self.max_failures > 0 && failures >= self.max_failures {
            tracing::warn!(
                failures,
                "authentication rejected too many times, dropping cached credentials"
            );
            *lock(&self.pending) = PendingCredentials::default();
            self.consecutive_failures.store(0, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use rtype_protocol::{AuthResponse, WirePayload};

    use super::*;

    fn rejected() -> Vec<u8> {
        AuthResponse {
            success: false,
            error_code: "BAD_PASSWORD".into(),
            message: "wrong password".into(),
        }
        .to_bytes()
    }

    fn accepted() -> Vec<u8> {
        AuthResponse {
            success: true,
            ..AuthResponse::default()
        }
        .to_bytes()
    }

    // =====================================================================
    // Prompts
    // =====================================================================

    #[test]
    fn test_on_prompt_login_with_credentials_replays_exact_bytes() {
        let flow = AuthFlow::new(0);
        flow.set_login_credentials("alice", "secret");

        let frame = flow.on_prompt(MessageType::Login, false).unwrap().unwrap();
        assert_eq!(frame.kind(), Some(MessageType::Login));
        assert_eq!(frame.payload, LoginMessage::new("alice", "secret").to_bytes());
    }

    #[test]
    fn test_on_prompt_login_without_password_returns_none() {
        let flow = AuthFlow::new(0);
        flow.set_login_credentials("alice", "");
        assert!(flow.on_prompt(MessageType::Login, false).unwrap().is_none());
    }

    #[test]
    fn test_on_prompt_register_needs_email() {
        let flow = AuthFlow::new(0);
        flow.set_login_credentials("bob", "pw");
        assert!(flow.on_prompt(MessageType::Register, false).unwrap().is_none());

        flow.set_register_credentials("bob", "bob@example.com", "pw");
        let frame = flow.on_prompt(MessageType::Register, false).unwrap().unwrap();
        let form = frame.decode::<RegisterMessage>().unwrap();
        assert_eq!(form.email, "bob@example.com");
    }

    #[test]
    fn test_on_prompt_non_prompt_type_returns_none() {
        let flow = AuthFlow::new(0);
        flow.set_login_credentials("alice", "secret");
        assert!(flow.on_prompt(MessageType::HeartBeat, false).unwrap().is_none());
    }

    // =====================================================================
    // Acks
    // =====================================================================

    #[test]
    fn test_on_ack_plain_success_has_no_token() {
        let flow = AuthFlow::new(0);
        let success = flow.on_ack(&accepted()).unwrap();
        assert_eq!(success.token, None);
        assert!(success.server_version.is_unknown());
        assert_eq!(flow.session_token(), None);
    }

    #[test]
    fn test_on_ack_extended_success_stores_token() {
        let flow = AuthFlow::new(0);
        let ext = AuthResponseWithToken {
            response: AuthResponse {
                success: true,
                ..AuthResponse::default()
            },
            token: SessionToken::new([7; 32]),
            server_version: VersionInfo::new(1, 2, 0),
        };
        let success = flow.on_ack(&ext.to_bytes()).unwrap();
        assert_eq!(success.token, Some(SessionToken::new([7; 32])));
        assert_eq!(flow.session_token(), Some(SessionToken::new([7; 32])));
        assert_eq!(success.server_version, VersionInfo::new(1, 2, 0));
    }

    #[test]
    fn test_on_ack_rejected_carries_server_message() {
        let flow = AuthFlow::new(0);
        match flow.on_ack(&rejected()) {
            Err(SessionError::AuthRejected {
                error_code,
                message,
            }) => {
                assert_eq!(error_code, "BAD_PASSWORD");
                assert_eq!(message, "wrong password");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_on_ack_short_payload_is_malformed() {
        let flow = AuthFlow::new(0);
        assert!(matches!(
            flow.on_ack(&[1, 0, 0]),
            Err(SessionError::MalformedAuthResponse { len: 3 })
        ));
    }

    #[test]
    fn test_on_ack_failures_without_limit_keep_credentials() {
        let flow = AuthFlow::new(0);
        flow.set_login_credentials("alice", "wrong");
        for _ in 0..10 {
            let _ = flow.on_ack(&rejected());
        }
        assert!(flow.pending().login().is_some());
    }

    #[test]
    fn test_on_ack_failures_at_limit_purge_credentials() {
        let flow = AuthFlow::new(3);
        flow.set_login_credentials("alice", "wrong");

        let _ = flow.on_ack(&rejected());
        let _ = flow.on_ack(&rejected());
        assert!(flow.pending().login().is_some());
        let _ = flow.on_ack(&rejected());
        assert!(flow.pending().is_empty());
    }

    #[test]
    fn test_on_ack_success_resets_failure_count() {
        let flow = AuthFlow::new(2);
        flow.set_login_credentials("alice", "secret");
        let _ = flow.on_ack(&rejected());
        assert_eq!(flow.consecutive_failures(), 1);
        flow.on_ack(&accepted()).unwrap();
        assert_eq!(flow.consecutive_failures(), 0);
        let _ = flow.on_ack(&rejected());
        assert!(flow.pending().login().is_some());
    }

    #[test]
    fn test_clear_credentials_drops_token() {
        let flow = AuthFlow::new(0);
        flow.set_login_credentials("alice", "secret");
        let ext = AuthResponseWithToken {
            response: AuthResponse {
                success: true,
                ..AuthResponse::default()
            },
            token: SessionToken::new([1; 32]),
            server_version: VersionInfo::default(),
        };
        flow.on_ack(&ext.to_bytes()).unwrap();

        flow.clear_credentials();
        assert!(flow.pending().is_empty());
        assert_eq!(flow.session_token(), None);
    }

    #[test]
    fn test_version_mismatch_ignores_unknown_server_version() {
        let client = VersionInfo::new(1, 0, 0);
        let unknown = AuthSuccess {
            token: None,
            server_version: VersionInfo::default(),
        };
        assert!(!unknown.version_mismatch(&client));

        let newer = AuthSuccess {
            token: None,
            server_version: VersionInfo::new(1, 1, 0),
        };
        assert!(newer.version_mismatch(&client));
    }

    #[test]
    fn test_pending_credentials_debug_hides_password() {
        let flow = AuthFlow::new(0);
        flow.set_login_credentials("alice", "hunter2");
        assert!(!format!("{:?}", flow.pending()).contains("hunter2"));
    }
}
