use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::{GameStateView, GuessOutcome, TileInfo};
use crate::room::{RoomStatus, DEFAULT_MAX_MEMBERS};
use crate::user::User;

fn default_max_members() -> usize {
    DEFAULT_MAX_MEMBERS
}

/// Client-to-server requests. The envelope is `{"type": ..., ...fields}`;
/// unknown types and missing required fields fail deserialization and are
/// reported back as malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientRequest {
    RegisterUser {
        name: String,
    },
    ListRooms,
    CreateRoom {
        user_id: String,
        room_name: String,
        #[serde(default = "default_max_members")]
        max_members: usize,
    },
    EnterRoom {
        user_id: String,
        room_id: String,
    },
    LeaveRoom {
        user_id: String,
        room_id: String,
    },
    SendChat {
        user_id: String,
        room_id: String,
        msg: String,
    },
    StartGame {
        room_id: String,
    },
    DrawTile {
        room_id: String,
        user_id: String,
        #[serde(default)]
        from_revealed: bool,
    },
    Guess {
        room_id: String,
        user_id: String,
        target_user_id: String,
        tile_index: usize,
        guessed_number: u8,
    },
    EndTurn {
        room_id: String,
        user_id: String,
    },
    GetGameState {
        room_id: String,
        user_id: String,
    },
}

impl ClientRequest {
    /// The reply type a failure for this request is reported under, so a
    /// client can always correlate a failure with what it asked for.
    pub fn reply_type(&self) -> MessageType {
        match self {
            ClientRequest::RegisterUser { .. } => MessageType::Registered,
            ClientRequest::ListRooms => MessageType::RoomList,
            ClientRequest::CreateRoom { .. } => MessageType::RoomInfo,
            ClientRequest::EnterRoom { .. } => MessageType::RoomInfo,
            ClientRequest::LeaveRoom { .. } => MessageType::RoomList,
            ClientRequest::SendChat { .. } => MessageType::Ack,
            ClientRequest::StartGame { .. } => MessageType::StartResult,
            ClientRequest::DrawTile { .. } => MessageType::DrawResult,
            ClientRequest::Guess { .. } => MessageType::GuessResult,
            ClientRequest::EndTurn { .. } => MessageType::EndTurnResult,
            ClientRequest::GetGameState { .. } => MessageType::GameState,
        }
    }
}

/// Server-to-client message types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Registered,
    RoomList,
    RoomInfo,
    Chat,
    Ack,
    StartResult,
    GameStarted,
    GameState,
    DrawResult,
    PlayerDrew,
    GuessResult,
    TurnChanged,
    EndTurnResult,
    GameEnded,
    Error,
}

/// Metadata attached to every outbound message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerMessageMeta {
    pub timestamp: DateTime<Utc>,
}

/// Outbound envelope: `{"type": ..., "data": ..., "meta": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub data: serde_json::Value,
    pub meta: Option<ServerMessageMeta>,
}

/// A room member as shown to clients: id plus resolved display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    pub user_id: String,
    pub display_name: String,
}

/// Room snapshot for listings and join/create replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: String,
    pub name: String,
    pub owner_id: String,
    pub members: Vec<RoomMember>,
    pub member_count: usize,
    pub max_members: usize,
    pub status: RoomStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredPayload {
    pub success: bool,
    pub message: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListPayload {
    pub success: bool,
    pub rooms: Vec<RoomSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfoPayload {
    pub success: bool,
    pub message: String,
    pub room: RoomSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub msg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckPayload {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResultPayload {
    pub success: bool,
    pub message: String,
    pub current_player: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartedPayload {
    pub message: String,
    pub current_player: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatePayload {
    pub success: bool,
    pub state: GameStateView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResultPayload {
    pub success: bool,
    pub message: String,
    pub tile: TileInfo,
}

/// Room-wide notice that a draw happened. Deliberately carries no tile
/// identity: the drawn tile was reported privately to the drawer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDrewPayload {
    pub user_id: String,
    pub from_revealed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessResultPayload {
    pub success: bool,
    pub message: String,
    pub guesser_id: String,
    pub target_user_id: String,
    pub tile_index: usize,
    pub guessed_number: u8,
    #[serde(flatten)]
    pub outcome: GuessOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnChangedPayload {
    pub message: String,
    pub current_player: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndTurnResultPayload {
    pub success: bool,
    pub message: String,
    pub current_player: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEndedPayload {
    pub message: String,
    pub winner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub success: bool,
    pub message: String,
}

/// Helper functions for creating messages
impl ServerMessage {
    pub fn new(message_type: MessageType, data: serde_json::Value) -> Self {
        Self {
            message_type,
            data,
            meta: Some(ServerMessageMeta {
                timestamp: Utc::now(),
            }),
        }
    }

    /// Generic failure reply, shaped `{success: false, message}` so every
    /// reply type shares the same failure contract.
    pub fn failure(message_type: MessageType, message: &str) -> Self {
        Self::new(
            message_type,
            serde_json::json!({ "success": false, "message": message }),
        )
    }

    pub fn registered(user: &User) -> Self {
        let payload = RegisteredPayload {
            success: true,
            message: "User registered".to_string(),
            user_id: user.user_id.clone(),
        };
        Self::new(
            MessageType::Registered,
            serde_json::to_value(payload).unwrap(),
        )
    }

    pub fn room_list(rooms: Vec<RoomSummary>) -> Self {
        let payload = RoomListPayload {
            success: true,
            rooms,
        };
        Self::new(
            MessageType::RoomList,
            serde_json::to_value(payload).unwrap(),
        )
    }

    pub fn room_info(message: &str, room: RoomSummary) -> Self {
        let payload = RoomInfoPayload {
            success: true,
            message: message.to_string(),
            room,
        };
        Self::new(
            MessageType::RoomInfo,
            serde_json::to_value(payload).unwrap(),
        )
    }

    pub fn chat(msg: String) -> Self {
        let payload = ChatPayload { msg };
        Self::new(MessageType::Chat, serde_json::to_value(payload).unwrap())
    }

    pub fn ack(message: &str) -> Self {
        let payload = AckPayload {
            success: true,
            message: message.to_string(),
        };
        Self::new(MessageType::Ack, serde_json::to_value(payload).unwrap())
    }

    pub fn start_result(current_player: String) -> Self {
        let payload = StartResultPayload {
            success: true,
            message: "Game started".to_string(),
            current_player,
        };
        Self::new(
            MessageType::StartResult,
            serde_json::to_value(payload).unwrap(),
        )
    }

    pub fn game_started(current_player: String) -> Self {
        let payload = GameStartedPayload {
            message: "Game started!".to_string(),
            current_player,
        };
        Self::new(
            MessageType::GameStarted,
            serde_json::to_value(payload).unwrap(),
        )
    }

    pub fn game_state(state: GameStateView) -> Self {
        let payload = GameStatePayload {
            success: true,
            state,
        };
        Self::new(
            MessageType::GameState,
            serde_json::to_value(payload).unwrap(),
        )
    }

    pub fn draw_result(tile: TileInfo) -> Self {
        let payload = DrawResultPayload {
            success: true,
            message: "Tile drawn".to_string(),
            tile,
        };
        Self::new(
            MessageType::DrawResult,
            serde_json::to_value(payload).unwrap(),
        )
    }

    pub fn player_drew(user_id: String, from_revealed: bool) -> Self {
        let payload = PlayerDrewPayload {
            user_id,
            from_revealed,
        };
        Self::new(
            MessageType::PlayerDrew,
            serde_json::to_value(payload).unwrap(),
        )
    }

    pub fn guess_result(
        guesser_id: String,
        target_user_id: String,
        tile_index: usize,
        guessed_number: u8,
        outcome: GuessOutcome,
    ) -> Self {
        let message = if outcome.correct {
            "Correct guess! Continue guessing or end turn."
        } else {
            "Wrong guess! Your tile revealed."
        };
        let payload = GuessResultPayload {
            success: true,
            message: message.to_string(),
            guesser_id,
            target_user_id,
            tile_index,
            guessed_number,
            outcome,
        };
        Self::new(
            MessageType::GuessResult,
            serde_json::to_value(payload).unwrap(),
        )
    }

    pub fn turn_changed(current_player: String) -> Self {
        let payload = TurnChangedPayload {
            message: "Turn changed".to_string(),
            current_player,
        };
        Self::new(
            MessageType::TurnChanged,
            serde_json::to_value(payload).unwrap(),
        )
    }

    pub fn end_turn_result(current_player: String) -> Self {
        let payload = EndTurnResultPayload {
            success: true,
            message: "Turn ended".to_string(),
            current_player,
        };
        Self::new(
            MessageType::EndTurnResult,
            serde_json::to_value(payload).unwrap(),
        )
    }

    pub fn game_ended(winner: Option<String>) -> Self {
        let payload = GameEndedPayload {
            message: "Game Over!".to_string(),
            winner,
        };
        Self::new(
            MessageType::GameEnded,
            serde_json::to_value(payload).unwrap(),
        )
    }

    pub fn error(message: &str) -> Self {
        let payload = ErrorPayload {
            success: false,
            message: message.to_string(),
        };
        Self::new(MessageType::Error, serde_json::to_value(payload).unwrap())
    }
}
