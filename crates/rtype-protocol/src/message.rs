//! The message type registry.
//!
//! Every frame header carries a 16-bit type code. [`MessageType`] gives
//! those codes names. Codes are grouped by feature in blocks of 0x100 so
//! a hex dump is readable at a glance:
//!
//! ```text
//! 0x00xx  liveness       (HeartBeat, HeartBeatAck)
//! 0x01xx  authentication (Login, Register and their acks)
//! 0x02xx  rooms
//! 0x03xx  room chat
//! 0x04xx  leaderboard
//! 0x05xx  private messages
//! ```

use std::fmt;

use crate::ProtocolError;

/// A known message type code.
///
/// `#[repr(u16)]` pins the discriminants to the wire values, so
/// `kind as u16` is the exact code that goes into a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    // -- Liveness --
    HeartBeat = 0x0001,
    HeartBeatAck = 0x0002,

    // -- Authentication --
    /// Server → client prompt; client → server credentials.
    Login = 0x0100,
    LoginAck = 0x0101,
    /// Server → client prompt; client → server registration form.
    Register = 0x0102,
    RegisterAck = 0x0103,

    // -- Rooms --
    CreateRoom = 0x0200,
    CreateRoomAck = 0x0201,
    JoinRoomByCode = 0x0202,
    JoinRoomAck = 0x0203,
    JoinRoomNack = 0x0204,
    LeaveRoom = 0x0205,
    LeaveRoomAck = 0x0206,
    SetReady = 0x0207,
    SetReadyAck = 0x0208,
    StartGame = 0x0209,
    StartGameAck = 0x020A,
    GameStarting = 0x020B,
    QuickJoin = 0x0210,
    QuickJoinNack = 0x0211,

    // -- Room chat --
    SendChatMessage = 0x0300,
    SendChatMessageAck = 0x0301,
    ChatMessageBroadcast = 0x0302,

    // -- Leaderboard --
    GetLeaderboard = 0x0400,
    LeaderboardData = 0x0401,

    // -- Private messages --
    SendPrivateMessage = 0x0500,
    SendPrivateMessageAck = 0x0501,
    PrivateMessageReceived = 0x0502,
}

impl MessageType {
    /// Every known type, in code order.
    pub const ALL: [MessageType; 28] = [
        Self::HeartBeat,
        Self::HeartBeatAck,
        Self::Login,
        Self::LoginAck,
        Self::Register,
        Self::RegisterAck,
        Self::CreateRoom,
        Self::CreateRoomAck,
        Self::JoinRoomByCode,
        Self::JoinRoomAck,
        Self::JoinRoomNack,
        Self::LeaveRoom,
        Self::LeaveRoomAck,
        Self::SetReady,
        Self::SetReadyAck,
        Self::StartGame,
        Self::StartGameAck,
        Self::GameStarting,
        Self::QuickJoin,
        Self::QuickJoinNack,
        Self::SendChatMessage,
        Self::SendChatMessageAck,
        Self::ChatMessageBroadcast,
        Self::GetLeaderboard,
        Self::LeaderboardData,
        Self::SendPrivateMessage,
        Self::SendPrivateMessageAck,
        Self::PrivateMessageReceived,
    ];

    /// The raw code written into a frame header.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Looks up a raw code. Returns `None` for codes outside the registry.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    /// Whether this type is one of the server's authentication prompts.
    pub fn is_auth_prompt(self) -> bool {
        matches!(self, Self::Login | Self::Register)
    }

    /// Whether this type answers a login or registration attempt.
    pub fn is_auth_ack(self) -> bool {
        matches!(self, Self::LoginAck | Self::RegisterAck)
    }
}

impl TryFrom<u16> for MessageType {
    type Error = ProtocolError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(ProtocolError::UnknownType(code))
    }
}

impl From<MessageType> for u16 {
    fn from(kind: MessageType) -> Self {
        kind.code()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:04x})", self, self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_round_trips_every_known_type() {
        for kind in MessageType::ALL {
            assert_eq!(MessageType::from_code(kind.code()), Some(kind));
        }
    }

    #[test]
    fn test_from_code_unknown_returns_none() {
        assert_eq!(MessageType::from_code(0xBEEF), None);
    }

    #[test]
    fn test_try_from_unknown_returns_error() {
        let result = MessageType::try_from(0x7777);
        assert!(matches!(result, Err(ProtocolError::UnknownType(0x7777))));
    }

    #[test]
    fn test_auth_codes_match_wire_values() {
        assert_eq!(MessageType::HeartBeat.code(), 0x0001);
        assert_eq!(MessageType::Login.code(), 0x0100);
        assert_eq!(MessageType::LoginAck.code(), 0x0101);
        assert_eq!(MessageType::Register.code(), 0x0102);
        assert_eq!(MessageType::RegisterAck.code(), 0x0103);
    }

    #[test]
    fn test_auth_classification() {
        assert!(MessageType::Login.is_auth_prompt());
        assert!(MessageType::Register.is_auth_prompt());
        assert!(!MessageType::LoginAck.is_auth_prompt());
        assert!(MessageType::RegisterAck.is_auth_ack());
        assert!(!MessageType::HeartBeatAck.is_auth_ack());
    }

    #[test]
    fn test_display_includes_hex_code() {
        assert_eq!(MessageType::LoginAck.to_string(), "LoginAck(0x0101)");
    }
}
