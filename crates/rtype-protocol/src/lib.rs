//! Wire protocol for the R-Type session channel.
//!
//! This crate is the "language" the client and the auth/lobby server
//! speak over TCP:
//!
//! - **Wire primitives** ([`WirePayload`], [`WireWriter`], [`WireReader`]):
//!   big-endian integers and fixed-width NUL-terminated strings.
//! - **Frames** ([`Header`], [`Frame`]): a 7-byte header plus payload.
//! - **Registry** ([`MessageType`]): the 16-bit type codes.
//! - **Payloads** ([`auth`], [`room`], [`social`]): one struct per
//!   message body.
//! - **Reassembly** ([`Reassembler`]): chunked bytes in, whole frames out.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sockets or sessions. It only
//! turns bytes into frames and frames into typed payloads.
//!
//! ```text
//! Transport (bytes) → Protocol (Frame) → Session (auth, liveness)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

pub mod auth;
mod error;
mod frame;
mod message;
mod reassembler;
pub mod room;
pub mod social;
mod wire;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use auth::{
    AuthResponse, AuthResponseWithToken, LoginMessage, RegisterMessage, SessionToken,
    VersionInfo,
};
pub use error::ProtocolError;
pub use frame::{Frame, Header};
pub use message::MessageType;
pub use reassembler::{DEFAULT_MAX_PAYLOAD_SIZE, Reassembler};
pub use room::{
    CreateRoomAck, CreateRoomRequest, GameStarting, JoinRoomAck, JoinRoomByCodeRequest,
    JoinRoomNack, SetReadyRequest,
};
pub use social::{
    ChatMessagePayload, LeaderboardData, LeaderboardEntry, LeaderboardRequest,
    PrivateMessageReceived, SendChatMessageRequest, SendPrivateMessageRequest,
};
pub use wire::{WirePayload, WireReader, WireWriter};
