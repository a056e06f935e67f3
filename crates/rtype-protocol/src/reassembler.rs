//! Turns an arbitrary chunked byte stream back into whole frames.
//!
//! TCP has no message boundaries: one `read` may return half a header,
//! or three frames and a bit. The [`Reassembler`] owns a growable buffer,
//! accepts whatever bytes arrive via [`feed`](Reassembler::feed), and
//! hands back complete frames one at a time via
//! [`try_extract_frame`](Reassembler::try_extract_frame).
//!
//! ## Size cap
//!
//! A header declaring a payload above the configured maximum is rejected
//! as soon as the header is readable, without waiting for the payload.
//! After such an error the buffer contents are meaningless (the stream is
//! out of sync), so the caller is expected to drop the connection.

use crate::frame::{Frame, Header};
use crate::wire::WirePayload;
use crate::ProtocolError;

/// Default cap on a single payload: 64 KiB.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Incremental frame decoder over a byte stream.
#[derive(Debug)]
pub struct Reassembler {
    buf: Vec<u8>,
    max_payload_size: usize,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD_SIZE)
    }
}

impl Reassembler {
    pub fn new(max_payload_size: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_payload_size,
        }
    }

    /// Appends freshly received bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        tracing::trace!(received = bytes.len(), buffered = self.buf.len(), "fed reassembler");
    }

    /// Pops the next complete frame, if one is fully buffered.
    ///
    /// Returns `Ok(None)` when more bytes are needed. Call in a loop
    /// after every [`feed`](Self::feed) until it returns `Ok(None)`.
    ///
    /// # Errors
    /// [`ProtocolError::PayloadTooLarge`] if the next header declares a
    /// payload above the cap.
    pub fn try_extract_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        let Some(header) = Header::from_bytes(&self.buf) else {
            return Ok(None);
        };

        let size = header.payload_size as usize;
        if size > self.max_payload_size {
            return Err(ProtocolError::PayloadTooLarge {
                size,
                max: self.max_payload_size,
            });
        }

        let total = header.frame_len();
        if self.buf.len() < total {
            return Ok(None);
        }

        let payload = self.buf[Header::WIRE_SIZE..total].to_vec();
        self.buf.drain(..total);
        Ok(Some(Frame { header, payload }))
    }

    /// Bytes currently held (a partial frame, or frames not yet extracted).
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    /// Discards everything buffered. Used when a connection is reset.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageType;

    fn login_ack_frame() -> Frame {
        Frame::new(MessageType::LoginAck, false, vec![0xAA; 161]).unwrap()
    }

    #[test]
    fn test_try_extract_frame_empty_buffer_returns_none() {
        let mut r = Reassembler::default();
        assert_eq!(r.try_extract_frame().unwrap(), None);
    }

    #[test]
    fn test_try_extract_frame_one_byte_chunks_yields_single_frame() {
        let frame = login_ack_frame();
        let bytes = frame.to_bytes();
        let mut r = Reassembler::default();

        for (i, b) in bytes.iter().enumerate() {
            r.feed(std::slice::from_ref(b));
            let extracted = r.try_extract_frame().unwrap();
            if i + 1 < bytes.len() {
                assert!(extracted.is_none(), "frame surfaced early at byte {i}");
            } else {
                assert_eq!(extracted, Some(frame.clone()));
            }
        }
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn test_try_extract_frame_concatenated_frames_in_order() {
        let frames = vec![
            Frame::empty(MessageType::HeartBeatAck, false),
            login_ack_frame(),
            Frame::new(MessageType::SetReadyAck, true, vec![1]).unwrap(),
        ];
        let mut r = Reassembler::default();
        r.feed(&frames.iter().flat_map(Frame::to_bytes).collect::<Vec<_>>());

        let mut out = Vec::new();
        while let Some(f) = r.try_extract_frame().unwrap() {
            out.push(f);
        }
        assert_eq!(out, frames);
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn test_try_extract_frame_keeps_trailing_partial() {
        let mut bytes = Frame::empty(MessageType::Login, false).to_bytes();
        bytes.extend_from_slice(&[0x00, 0x01]);
        let mut r = Reassembler::default();
        r.feed(&bytes);

        assert!(r.try_extract_frame().unwrap().is_some());
        assert_eq!(r.try_extract_frame().unwrap(), None);
        assert_eq!(r.buffered(), 2);
    }

    #[test]
    fn test_try_extract_frame_oversized_header_errors_before_payload() {
        let mut r = Reassembler::new(1024);
        let header = Header::new(MessageType::ChatMessageBroadcast, false, 1025);
        r.feed(&header.to_bytes());

        let err = r.try_extract_frame().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::PayloadTooLarge {
                size: 1025,
                max: 1024
            }
        ));
    }

    #[test]
    fn test_try_extract_frame_payload_at_cap_is_accepted() {
        let mut r = Reassembler::new(4);
        r.feed(&Frame::new(MessageType::SetReady, false, vec![1, 2, 3, 4]).unwrap().to_bytes());
        assert!(r.try_extract_frame().unwrap().is_some());
    }

    #[test]
    fn test_try_extract_frame_unknown_type_is_still_framed() {
        let mut bytes = Header {
            is_authenticated: false,
            message_type: 0x7FFF,
            payload_size: 3,
        }
        .to_bytes();
        bytes.extend_from_slice(b"xyz");
        let mut r = Reassembler::default();
        r.feed(&bytes);

        let frame = r.try_extract_frame().unwrap().unwrap();
        assert_eq!(frame.kind(), None);
        assert_eq!(frame.payload, b"xyz");
    }

    #[test]
    fn test_clear_discards_partial_frame() {
        let mut r = Reassembler::default();
        r.feed(&[0x00, 0x01]);
        r.clear();
        assert_eq!(r.buffered(), 0);
    }
}
