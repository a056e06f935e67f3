//! Authentication payloads: credentials, acks, session tokens and the
//! server version block that rides along with a successful ack.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::wire::{WirePayload, WireReader, WireWriter};

/// Capacity of the username field.
pub const USERNAME_LEN: usize = 32;
/// Capacity of password and email fields.
pub const CREDENTIAL_LEN: usize = 64;
/// Capacity of the error code field in every ack/nack.
pub const ERROR_CODE_LEN: usize = 32;
/// Capacity of the human-readable message field in every ack/nack.
pub const MESSAGE_LEN: usize = 128;
/// Raw session token length.
pub const TOKEN_LEN: usize = 32;
/// Capacity of the git hash field in [`VersionInfo`].
pub const GIT_HASH_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Client → server login form, sent in answer to a `Login` prompt.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginMessage {
    pub username: String,
    pub password: String,
}

impl LoginMessage {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Passwords never reach a log line.
impl fmt::Debug for LoginMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginMessage")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl WirePayload for LoginMessage {
    const WIRE_SIZE: usize = USERNAME_LEN + CREDENTIAL_LEN;

    fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.username, USERNAME_LEN);
        w.put_str(&self.password, CREDENTIAL_LEN);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            username: r.get_str(USERNAME_LEN)?,
            password: r.get_str(CREDENTIAL_LEN)?,
        })
    }
}

/// Client → server registration form, sent in answer to a `Register` prompt.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterMessage {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterMessage {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for RegisterMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterMessage")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl WirePayload for RegisterMessage {
    const WIRE_SIZE: usize = USERNAME_LEN + CREDENTIAL_LEN * 2;

    fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.username, USERNAME_LEN);
        w.put_str(&self.email, CREDENTIAL_LEN);
        w.put_str(&self.password, CREDENTIAL_LEN);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            username: r.get_str(USERNAME_LEN)?,
            email: r.get_str(CREDENTIAL_LEN)?,
            password: r.get_str(CREDENTIAL_LEN)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Acks
// ---------------------------------------------------------------------------

/// Server → client answer to a login or registration attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthResponse {
    pub success: bool,
    pub error_code: String,
    pub message: String,
}

impl WirePayload for AuthResponse {
    const WIRE_SIZE: usize = 1 + ERROR_CODE_LEN + MESSAGE_LEN;

    fn encode(&self, w: &mut WireWriter) {
        w.put_bool(self.success);
        w.put_str(&self.error_code, ERROR_CODE_LEN);
        w.put_str(&self.message, MESSAGE_LEN);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            success: r.get_bool()?,
            error_code: r.get_str(ERROR_CODE_LEN)?,
            message: r.get_str(MESSAGE_LEN)?,
        })
    }
}

/// Semantic version plus a short git hash, as reported by the server.
///
/// The all-zero value means "the server did not say".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    #[serde(default)]
    pub git_hash: String,
}

impl VersionInfo {
    pub fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
            git_hash: String::new(),
        }
    }

    /// Returns `true` for the default value (no version reported).
    pub fn is_unknown(&self) -> bool {
        *self == Self::default()
    }

    /// Two versions interoperate when major and minor agree.
    pub fn is_compatible_with(&self, other: &VersionInfo) -> bool {
        self.major == other.major && self.minor == other.minor
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.git_hash.is_empty() {
            write!(f, " ({})", self.git_hash)?;
        }
        Ok(())
    }
}

impl WirePayload for VersionInfo {
    const WIRE_SIZE: usize = 3 + GIT_HASH_LEN;

    fn encode(&self, w: &mut WireWriter) {
        w.put_u8(self.major);
        w.put_u8(self.minor);
        w.put_u8(self.patch);
        w.put_str(&self.git_hash, GIT_HASH_LEN);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            major: r.get_u8()?,
            minor: r.get_u8()?,
            patch: r.get_u8()?,
            git_hash: r.get_str(GIT_HASH_LEN)?,
        })
    }
}

/// Opaque session token handed out on successful authentication.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionToken([u8; TOKEN_LEN]);

impl SessionToken {
    pub fn new(bytes: [u8; TOKEN_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }

    /// An all-zero token means the server did not issue one.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Lowercase hex rendering, handy for logs and diagnostics.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a prefix, enough to correlate log lines.
        let hex = self.to_hex();
        write!(f, "SessionToken({}…)", &hex[..8])
    }
}

/// Extended ack: the plain response plus token and server version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthResponseWithToken {
    pub response: AuthResponse,
    pub token: SessionToken,
    pub server_version: VersionInfo,
}

impl WirePayload for AuthResponseWithToken {
    const WIRE_SIZE: usize = AuthResponse::WIRE_SIZE + TOKEN_LEN + VersionInfo::WIRE_SIZE;

    fn encode(&self, w: &mut WireWriter) {
        self.response.encode(w);
        w.put_bytes(self.token.as_bytes());
        self.server_version.encode(w);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            response: AuthResponse::decode(r)?,
            token: SessionToken::new(r.get_array()?),
            server_version: VersionInfo::decode(r)?,
        })
    }
}

impl AuthResponseWithToken {
    /// Decodes either ack form.
    ///
    /// Payloads long enough for the extended form are read as such;
    /// shorter ones fall back to a plain [`AuthResponse`] with an empty
    /// token and an unknown server version. Returns `None` only when the
    /// payload is too short for either.
    pub fn from_ack_payload(payload: &[u8]) -> Option<Self> {
        if payload.len() >= Self::WIRE_SIZE {
            return Self::from_bytes(payload);
        }
        AuthResponse::from_bytes(payload).map(|response| Self {
            response,
            ..Self::default()
        })
    }
}
