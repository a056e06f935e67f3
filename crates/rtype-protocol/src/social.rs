//! Room chat, leaderboard and private message payloads.

use serde::Serialize;

use crate::auth::{CREDENTIAL_LEN, USERNAME_LEN};
use crate::wire::{WirePayload, WireReader, WireWriter};

/// Capacity of a chat or private message body.
pub const CHAT_MESSAGE_LEN: usize = 256;

// ---------------------------------------------------------------------------
// Room chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendChatMessageRequest {
    pub message: String,
}

impl WirePayload for SendChatMessageRequest {
    const WIRE_SIZE: usize = CHAT_MESSAGE_LEN;

    fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.message, CHAT_MESSAGE_LEN);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            message: r.get_str(CHAT_MESSAGE_LEN)?,
        })
    }
}

/// A chat line broadcast to everyone in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessagePayload {
    pub display_name: String,
    pub message: String,
    /// Unix time in milliseconds, as stamped by the server.
    pub timestamp: u64,
}

impl WirePayload for ChatMessagePayload {
    const WIRE_SIZE: usize = USERNAME_LEN + CHAT_MESSAGE_LEN + 8;

    fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.display_name, USERNAME_LEN);
        w.put_str(&self.message, CHAT_MESSAGE_LEN);
        w.put_u64(self.timestamp);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            display_name: r.get_str(USERNAME_LEN)?,
            message: r.get_str(CHAT_MESSAGE_LEN)?,
            timestamp: r.get_u64()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardRequest {
    /// 0 = all time, 1 = weekly, 2 = monthly. Passed through untouched.
    pub period: u8,
    pub limit: u8,
}

impl WirePayload for LeaderboardRequest {
    const WIRE_SIZE: usize = 2;

    fn encode(&self, w: &mut WireWriter) {
        w.put_u8(self.period);
        w.put_u8(self.limit);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            period: r.get_u8()?,
            limit: r.get_u8()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub player_name: String,
    pub score: u32,
    pub wave: u16,
    pub kills: u16,
}

impl WirePayload for LeaderboardEntry {
    const WIRE_SIZE: usize = 4 + USERNAME_LEN + 4 + 2 + 2;

    fn encode(&self, w: &mut WireWriter) {
        w.put_u32(self.rank);
        w.put_str(&self.player_name, USERNAME_LEN);
        w.put_u32(self.score);
        w.put_u16(self.wave);
        w.put_u16(self.kills);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            rank: r.get_u32()?,
            player_name: r.get_str(USERNAME_LEN)?,
            score: r.get_u32()?,
            wave: r.get_u16()?,
            kills: r.get_u16()?,
        })
    }
}

/// Variable-length leaderboard reply: a 6-byte head then `count` entries.
///
/// This is the one payload without a fixed size, so it has its own
/// `to_bytes`/`from_bytes` instead of a [`WirePayload`] impl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardData {
    pub period: u8,
    /// The requesting player's rank, 0 when unranked.
    pub your_rank: u32,
    pub entries: Vec<LeaderboardEntry>,
}

impl LeaderboardData {
    /// Size of the fixed head preceding the entries.
    pub const HEAD_SIZE: usize = 6;

    /// Encodes at most 255 entries (the count is a single byte).
    pub fn to_bytes(&self) -> Vec<u8> {
        let count = self.entries.len().min(usize::from(u8::MAX));
        let mut w = WireWriter::with_capacity(Self::HEAD_SIZE + count * LeaderboardEntry::WIRE_SIZE);
        w.put_u8(self.period);
        w.put_u8(count as u8);
        w.put_u32(self.your_rank);
        for entry in &self.entries[..count] {
            entry.encode(&mut w);
        }
        w.into_inner()
    }

    /// Returns `None` if the payload is shorter than its declared
    /// entry count requires.
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        let mut r = WireReader::new(buf);
        let period = r.get_u8()?;
        let count = r.get_u8()?;
        let your_rank = r.get_u32()?;
        let entries = (0..count)
            .map(|_| LeaderboardEntry::decode(&mut r))
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            period,
            your_rank,
            entries,
        })
    }
}

// ---------------------------------------------------------------------------
// Private messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendPrivateMessageRequest {
    pub recipient_email: String,
    pub message: String,
}

impl WirePayload for SendPrivateMessageRequest {
    const WIRE_SIZE: usize = CREDENTIAL_LEN + CHAT_MESSAGE_LEN;

    fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.recipient_email, CREDENTIAL_LEN);
        w.put_str(&self.message, CHAT_MESSAGE_LEN);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            recipient_email: r.get_str(CREDENTIAL_LEN)?,
            message: r.get_str(CHAT_MESSAGE_LEN)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateMessageReceived {
    pub sender_email: String,
    pub sender_display_name: String,
    pub message: String,
    pub timestamp: u64,
}

impl WirePayload for PrivateMessageReceived {
    const WIRE_SIZE: usize = CREDENTIAL_LEN + USERNAME_LEN + CHAT_MESSAGE_LEN + 8;

    fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.sender_email, CREDENTIAL_LEN);
        w.put_str(&self.sender_display_name, USERNAME_LEN);
        w.put_str(&self.message, CHAT_MESSAGE_LEN);
        w.put_u64(self.timestamp);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            sender_email: r.get_str(CREDENTIAL_LEN)?,
            sender_display_name: r.get_str(USERNAME_LEN)?,
            message: r.get_str(CHAT_MESSAGE_LEN)?,
            timestamp: r.get_u64()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(rank: u32, name: &str) -> LeaderboardEntry {
        LeaderboardEntry {
            rank,
            player_name: name.into(),
            score: rank * 1000,
            wave: 7,
            kills: 42,
        }
    }

    #[test]
    fn test_leaderboard_entry_wire_size_is_44() {
        assert_eq!(LeaderboardEntry::WIRE_SIZE, 44);
        assert_eq!(entry(1, "ace").to_bytes().len(), 44);
    }

    #[test]
    fn test_leaderboard_data_decodes_declared_entries() {
        let data = LeaderboardData {
            period: 1,
            your_rank: 17,
            entries: vec![entry(1, "ace"), entry(2, "bee")],
        };
        let bytes = data.to_bytes();
        assert_eq!(bytes.len(), LeaderboardData::HEAD_SIZE + 2 * 44);
        assert_eq!(LeaderboardData::from_bytes(&bytes), Some(data));
    }

    #[test]
    fn test_leaderboard_data_truncated_entries_returns_none() {
        let data = LeaderboardData {
            period: 0,
            your_rank: 0,
            entries: vec![entry(1, "ace"), entry(2, "bee")],
        };
        let bytes = data.to_bytes();
        assert!(LeaderboardData::from_bytes(&bytes[..bytes.len() - 1]).is_none());
    }

    #[test]
    fn test_leaderboard_data_empty_board() {
        let bytes = [2, 0, 0, 0, 0, 5];
        let data = LeaderboardData::from_bytes(&bytes).unwrap();
        assert_eq!(data.period, 2);
        assert_eq!(data.your_rank, 5);
        assert!(data.entries.is_empty());
    }

    #[test]
    fn test_chat_message_timestamp_is_big_endian() {
        let msg = ChatMessagePayload {
            display_name: "ace".into(),
            message: "gg".into(),
            timestamp: 0x0102,
        };
        let bytes = msg.to_bytes();
        assert_eq!(&bytes[bytes.len() - 2..], &[0x01, 0x02]);
    }

    #[test]
    fn test_private_message_received_size() {
        assert_eq!(PrivateMessageReceived::WIRE_SIZE, 64 + 32 + 256 + 8);
        assert_eq!(SendPrivateMessageRequest::WIRE_SIZE, 320);
    }
}
