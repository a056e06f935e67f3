//! Error types for the protocol layer.
//!
//! Like every crate in the workspace, the protocol layer owns its own
//! error enum. A `ProtocolError` always means "the bytes were wrong",
//! never "the socket broke" (that is a `TransportError`).

use crate::MessageType;

/// Errors that can occur while framing or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A header declared a payload larger than the configured cap.
    ///
    /// This is a hard protocol violation: waiting for the rest of the
    /// frame could mean buffering gigabytes for a hostile or corrupt
    /// peer, so the connection is torn down instead.
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// The size the header claimed (or the caller tried to send).
        size: usize,
        /// The configured maximum.
        max: usize,
    },

    /// A complete frame arrived but its payload could not be decoded
    /// as the structure its message type calls for.
    #[error("malformed {message_type:?} payload: {reason}")]
    Malformed {
        /// The type the header announced.
        message_type: MessageType,
        /// Human-readable description of what was wrong.
        reason: String,
    },

    /// The frame carries a type code this client does not know.
    #[error("unknown message type 0x{0:04x}")]
    UnknownType(u16),
}
