//! Frame header and the complete frame type.
//!
//! Every unit on the wire is a [`Frame`]: a 7-byte [`Header`] followed by
//! `payload_size` bytes whose meaning depends on the header's type.
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────────────┬───────────────────┐
//! │ auth (u8)    │ type (u16 BE)│ payload_size     │ payload           │
//! │ 0 or 1       │              │ (u32 BE)         │ payload_size bytes│
//! └──────────────┴──────────────┴──────────────────┴───────────────────┘
//!  byte 0         bytes 1..3     bytes 3..7         bytes 7..
//! ```

use crate::wire::{WirePayload, WireReader, WireWriter};
use crate::{MessageType, ProtocolError};

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// The fixed-size prefix of every frame.
///
/// `message_type` is kept as the raw code rather than a [`MessageType`]
/// so that frames of unknown types can still be framed (and skipped)
/// without desynchronizing the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Whether the sender considers the session authenticated.
    pub is_authenticated: bool,
    /// Raw message type code.
    pub message_type: u16,
    /// Number of payload bytes that follow the header.
    pub payload_size: u32,
}

impl Header {
    /// Creates a header for a known message type.
    pub fn new(kind: MessageType, is_authenticated: bool, payload_size: u32) -> Self {
        Self {
            is_authenticated,
            message_type: kind.code(),
            payload_size,
        }
    }

    /// The message type, if the code is in the registry.
    pub fn kind(&self) -> Option<MessageType> {
        MessageType::from_code(self.message_type)
    }

    /// Total frame length (header + payload) this header announces.
    pub fn frame_len(&self) -> usize {
        Self::WIRE_SIZE + self.payload_size as usize
    }
}

impl WirePayload for Header {
    const WIRE_SIZE: usize = 7;

    fn encode(&self, w: &mut WireWriter) {
        w.put_bool(self.is_authenticated);
        w.put_u16(self.message_type);
        w.put_u32(self.payload_size);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            is_authenticated: r.get_bool()?,
            message_type: r.get_u16()?,
            payload_size: r.get_u32()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One complete header + payload unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Builds a frame around raw payload bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::PayloadTooLarge`] if the payload length
    /// cannot be expressed in the header's 32-bit size field.
    pub fn new(
        kind: MessageType,
        is_authenticated: bool,
        payload: Vec<u8>,
    ) -> Result<Self, ProtocolError> {
        let payload_size = u32::try_from(payload.len()).map_err(|_| {
            ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: u32::MAX as usize,
            }
        })?;
        Ok(Self {
            header: Header::new(kind, is_authenticated, payload_size),
            payload,
        })
    }

    /// A frame with no payload (prompts, heartbeats, simple requests).
    pub fn empty(kind: MessageType, is_authenticated: bool) -> Self {
        Self {
            header: Header::new(kind, is_authenticated, 0),
            payload: Vec::new(),
        }
    }

    /// A frame carrying one fixed-size payload structure.
    pub fn with_payload<P: WirePayload>(
        kind: MessageType,
        is_authenticated: bool,
        payload: &P,
    ) -> Result<Self, ProtocolError> {
        Self::new(kind, is_authenticated, payload.to_bytes())
    }

    /// The frame's message type, if known.
    pub fn kind(&self) -> Option<MessageType> {
        self.header.kind()
    }

    /// Decodes the payload as `P`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Malformed`] if the payload is shorter
    /// than `P::WIRE_SIZE`, and [`ProtocolError::UnknownType`] if the
    /// header's type is not in the registry.
    pub fn decode<P: WirePayload>(&self) -> Result<P, ProtocolError> {
        let kind = MessageType::try_from(self.header.message_type)?;
        P::from_bytes(&self.payload).ok_or_else(|| ProtocolError::Malformed {
            message_type: kind,
            reason: format!(
                "expected at least {} bytes, got {}",
                P::WIRE_SIZE,
                self.payload.len()
            ),
        })
    }

    /// Serializes header and payload into one contiguous buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::with_capacity(self.wire_len());
        self.header.encode(&mut w);
        w.put_bytes(&self.payload);
        w.into_inner()
    }

    /// Number of bytes this frame occupies on the wire.
    pub fn wire_len(&self) -> usize {
        Header::WIRE_SIZE + self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_wire_layout() {
        let header = Header::new(MessageType::LoginAck, true, 0x0000_00A1);
        assert_eq!(
            header.to_bytes(),
            vec![0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0xA1]
        );
    }

    #[test]
    fn test_header_from_bytes_short_buffer_returns_none() {
        assert!(Header::from_bytes(&[0x00, 0x01, 0x00]).is_none());
        assert!(Header::from_bytes(&[]).is_none());
    }

    #[test]
    fn test_header_round_trip() {
        let header = Header {
            is_authenticated: false,
            message_type: 0xBEEF,
            payload_size: 70_000,
        };
        assert_eq!(Header::from_bytes(&header.to_bytes()), Some(header));
    }

    #[test]
    fn test_header_unknown_type_has_no_kind() {
        let header = Header {
            is_authenticated: false,
            message_type: 0xBEEF,
            payload_size: 0,
        };
        assert_eq!(header.kind(), None);
    }

    #[test]
    fn test_frame_empty_has_zero_payload_size() {
        let frame = Frame::empty(MessageType::HeartBeat, false);
        assert_eq!(frame.header.payload_size, 0);
        assert_eq!(frame.to_bytes(), vec![0x00, 0x00, 0x01, 0, 0, 0, 0]);
    }

    #[test]
    fn test_frame_new_sets_payload_size() {
        let frame = Frame::new(MessageType::SetReady, true, vec![1]).unwrap();
        assert_eq!(frame.header.payload_size, 1);
        assert_eq!(frame.wire_len(), Header::WIRE_SIZE + 1);
    }

    #[test]
    fn test_frame_decode_short_payload_is_malformed() {
        let frame = Frame::new(MessageType::LoginAck, false, vec![1, 2]).unwrap();
        let result = frame.decode::<Header>();
        assert!(matches!(
            result,
            Err(ProtocolError::Malformed {
                message_type: MessageType::LoginAck,
                ..
            })
        ));
    }
}
