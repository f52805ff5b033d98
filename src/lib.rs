// Library crate for the tile deduction game server
// This file exposes the public API for integration tests

pub mod game;
pub mod room;
pub mod shared;
pub mod user;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use game::{GameRegistry, GameSession, GameStatus};
pub use room::{InMemoryRoomRepository, RoomRepository};
pub use shared::{AppError, AppState};
pub use user::{InMemoryUserRegistry, UserRegistry};
pub use websockets::{
    InMemoryRoomBroadcaster, MessageHandler, MessageRouter, MessageType, RoomBroadcaster,
    ServerMessage,
};
