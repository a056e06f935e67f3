//! Room lobby payloads: create, join, leave, ready-up and game start.

use crate::auth::{ERROR_CODE_LEN, MESSAGE_LEN};
use crate::wire::{WirePayload, WireReader, WireWriter};

/// Capacity of a room's display name.
pub const ROOM_NAME_LEN: usize = 32;
/// Room codes are exactly six characters with no terminator.
pub const ROOM_CODE_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoomRequest {
    pub name: String,
    pub max_players: u8,
    pub is_private: bool,
}

impl WirePayload for CreateRoomRequest {
    const WIRE_SIZE: usize = ROOM_NAME_LEN + 2;

    fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.name, ROOM_NAME_LEN);
        w.put_u8(self.max_players);
        w.put_bool(self.is_private);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            name: r.get_str(ROOM_NAME_LEN)?,
            max_players: r.get_u8()?,
            is_private: r.get_bool()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateRoomAck {
    pub success: bool,
    pub room_code: String,
    pub error_code: String,
    pub message: String,
}

impl WirePayload for CreateRoomAck {
    const WIRE_SIZE: usize = 1 + ROOM_CODE_LEN + ERROR_CODE_LEN + MESSAGE_LEN;

    fn encode(&self, w: &mut WireWriter) {
        w.put_bool(self.success);
        w.put_padded(&self.room_code, ROOM_CODE_LEN);
        w.put_str(&self.error_code, ERROR_CODE_LEN);
        w.put_str(&self.message, MESSAGE_LEN);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            success: r.get_bool()?,
            room_code: r.get_padded(ROOM_CODE_LEN)?,
            error_code: r.get_str(ERROR_CODE_LEN)?,
            message: r.get_str(MESSAGE_LEN)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRoomByCodeRequest {
    pub room_code: String,
}

impl WirePayload for JoinRoomByCodeRequest {
    const WIRE_SIZE: usize = ROOM_CODE_LEN;

    fn encode(&self, w: &mut WireWriter) {
        w.put_padded(&self.room_code, ROOM_CODE_LEN);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            room_code: r.get_padded(ROOM_CODE_LEN)?,
        })
    }
}

/// Sent on a successful join, whether by code or by quick join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinRoomAck {
    pub slot_id: u8,
    pub room_name: String,
    pub room_code: String,
    pub max_players: u8,
    pub is_host: bool,
}

impl WirePayload for JoinRoomAck {
    const WIRE_SIZE: usize = 1 + ROOM_NAME_LEN + ROOM_CODE_LEN + 2;

    fn encode(&self, w: &mut WireWriter) {
        w.put_u8(self.slot_id);
        w.put_str(&self.room_name, ROOM_NAME_LEN);
        w.put_padded(&self.room_code, ROOM_CODE_LEN);
        w.put_u8(self.max_players);
        w.put_bool(self.is_host);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            slot_id: r.get_u8()?,
            room_name: r.get_str(ROOM_NAME_LEN)?,
            room_code: r.get_padded(ROOM_CODE_LEN)?,
            max_players: r.get_u8()?,
            is_host: r.get_bool()?,
        })
    }
}

/// Join refusal. Also the payload of `QuickJoinNack`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinRoomNack {
    pub error_code: String,
    pub message: String,
}

impl WirePayload for JoinRoomNack {
    const WIRE_SIZE: usize = ERROR_CODE_LEN + MESSAGE_LEN;

    fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.error_code, ERROR_CODE_LEN);
        w.put_str(&self.message, MESSAGE_LEN);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            error_code: r.get_str(ERROR_CODE_LEN)?,
            message: r.get_str(MESSAGE_LEN)?,
        })
    }
}

/// Ready toggle. The server echoes the same layout in `SetReadyAck`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetReadyRequest {
    pub is_ready: bool,
}

impl WirePayload for SetReadyRequest {
    const WIRE_SIZE: usize = 1;

    fn encode(&self, w: &mut WireWriter) {
        w.put_bool(self.is_ready);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            is_ready: r.get_bool()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStarting {
    pub countdown_seconds: u8,
}

impl WirePayload for GameStarting {
    const WIRE_SIZE: usize = 1;

    fn encode(&self, w: &mut WireWriter) {
        w.put_u8(self.countdown_seconds);
    }

    fn decode(r: &mut WireReader<'_>) -> Option<Self> {
        Some(Self {
            countdown_seconds: r.get_u8()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_room_ack_room_code_is_not_terminated() {
        let ack = CreateRoomAck {
            success: true,
            room_code: "K7Q2XZ".into(),
            ..CreateRoomAck::default()
        };
        let bytes = ack.to_bytes();
        assert_eq!(&bytes[1..7], b"K7Q2XZ");
        assert_eq!(bytes[7], 0);
        assert_eq!(CreateRoomAck::from_bytes(&bytes).unwrap().room_code, "K7Q2XZ");
    }

    #[test]
    fn test_join_room_ack_layout() {
        let ack = JoinRoomAck {
            slot_id: 2,
            room_name: "Nebula".into(),
            room_code: "ABCDEF".into(),
            max_players: 4,
            is_host: true,
        };
        let bytes = ack.to_bytes();
        assert_eq!(bytes.len(), JoinRoomAck::WIRE_SIZE);
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[33..39], b"ABCDEF");
        assert_eq!(bytes[39], 4);
        assert_eq!(bytes[40], 1);
        assert_eq!(JoinRoomAck::from_bytes(&bytes), Some(ack));
    }

    #[test]
    fn test_join_room_by_code_short_code_is_zero_padded() {
        let req = JoinRoomByCodeRequest {
            room_code: "AB".into(),
        };
        assert_eq!(req.to_bytes(), b"AB\0\0\0\0".to_vec());
    }

    #[test]
    fn test_create_room_request_size() {
        let req = CreateRoomRequest {
            name: "lobby".into(),
            max_players: 4,
            is_private: false,
        };
        let bytes = req.to_bytes();
        assert_eq!(bytes.len(), 34);
        assert_eq!(bytes[32], 4);
        assert_eq!(bytes[33], 0);
    }
}
