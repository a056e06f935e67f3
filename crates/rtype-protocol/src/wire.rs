//! Byte-level building blocks shared by every wire structure.
//!
//! The protocol is a fixed-layout binary format: every field sits at a
//! known offset and every struct has a compile-time [`WirePayload::WIRE_SIZE`].
//! Two tiny cursor types do all the byte shuffling:
//!
//! - [`WireWriter`] appends big-endian integers and fixed-width strings
//!   to a `Vec<u8>`.
//! - [`WireReader`] reads them back from a borrowed slice, returning
//!   `None` instead of panicking when the slice runs out.
//!
//! # Byte order
//!
//! All multi-byte integers are **big-endian** (network byte order).
//!
//! # Fixed-width strings
//!
//! A string field of capacity `N` always occupies exactly `N` bytes on
//! the wire. The writer keeps at most `N - 1` bytes of text (cut on a
//! UTF-8 character boundary), then pads with NULs, so the field is
//! always NUL-terminated. The reader stops at the first NUL.

// ---------------------------------------------------------------------------
// WirePayload
// ---------------------------------------------------------------------------

/// A structure with a fixed on-the-wire size and symmetric conversions.
///
/// Implementors provide [`encode`](Self::encode) and
/// [`decode`](Self::decode); the provided methods add the length checks
/// so no implementation can read past the end of a short buffer.
pub trait WirePayload: Sized {
    /// Exact number of bytes this structure occupies on the wire.
    const WIRE_SIZE: usize;

    /// Appends exactly `WIRE_SIZE` bytes to the writer.
    fn encode(&self, w: &mut WireWriter);

    /// Reads the fields back. Only called with at least `WIRE_SIZE` bytes.
    fn decode(r: &mut WireReader<'_>) -> Option<Self>;

    /// Serializes into a freshly allocated buffer of `WIRE_SIZE` bytes.
    fn to_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::with_capacity(Self::WIRE_SIZE);
        self.encode(&mut w);
        w.into_inner()
    }

    /// Parses from the front of `buf`.
    ///
    /// Returns `None` if `buf` is shorter than `WIRE_SIZE`. Extra
    /// trailing bytes are ignored.
    fn from_bytes(buf: &[u8]) -> Option<Self> {
        let body = buf.get(..Self::WIRE_SIZE)?;
        Self::decode(&mut WireReader::new(body))
    }
}

// ---------------------------------------------------------------------------
// WireWriter
// ---------------------------------------------------------------------------

/// Append-only encoder over a growable buffer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a NUL-terminated string field of exactly `capacity` bytes.
    ///
    /// Text longer than `capacity - 1` bytes is truncated.
    pub fn put_str(&mut self, s: &str, capacity: usize) {
        if capacity == 0 {
            return;
        }
        let text = truncate_utf8(s, capacity - 1);
        self.buf.extend_from_slice(text.as_bytes());
        self.buf.resize(self.buf.len() + capacity - text.len(), 0);
    }

    /// Writes a zero-padded field of exactly `capacity` bytes without
    /// reserving a terminator (used for short codes such as room codes).
    pub fn put_padded(&mut self, s: &str, capacity: usize) {
        let text = truncate_utf8(s, capacity);
        self.buf.extend_from_slice(text.as_bytes());
        self.buf.resize(self.buf.len() + capacity - text.len(), 0);
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the writer and returns the encoded bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

// ---------------------------------------------------------------------------
// WireReader
// ---------------------------------------------------------------------------

/// Bounds-checked decoder over a borrowed slice.
///
/// Every getter returns `None` once the slice is exhausted, so decode
/// functions can be written as a chain of `?` without ever indexing
/// out of bounds.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.take(N)?.try_into().ok()
    }

    pub fn get_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    /// Any non-zero byte reads as `true`.
    pub fn get_bool(&mut self) -> Option<bool> {
        self.get_u8().map(|b| b != 0)
    }

    pub fn get_u16(&mut self) -> Option<u16> {
        self.take_array().map(u16::from_be_bytes)
    }

    pub fn get_u32(&mut self) -> Option<u32> {
        self.take_array().map(u32::from_be_bytes)
    }

    pub fn get_u64(&mut self) -> Option<u64> {
        self.take_array().map(u64::from_be_bytes)
    }

    pub fn get_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.take_array()
    }

    /// Reads a string field of `capacity` bytes, stopping at the first NUL.
    ///
    /// Invalid UTF-8 is replaced rather than rejected: a garbled
    /// display name should not drop an otherwise valid message.
    pub fn get_str(&mut self, capacity: usize) -> Option<String> {
        let field = self.take(capacity)?;
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        Some(String::from_utf8_lossy(&field[..end]).into_owned())
    }

    /// Reads a zero-padded field written by [`WireWriter::put_padded`].
    pub fn get_padded(&mut self, capacity: usize) -> Option<String> {
        self.get_str(capacity)
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

/// Cuts `s` to at most `max` bytes without splitting a character.
fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
