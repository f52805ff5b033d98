use std::sync::Arc;
use thiserror::Error;

use crate::game::GameError;
use crate::websockets::{MessageRouter, RoomBroadcaster};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<MessageRouter>,
    pub broadcaster: Arc<dyn RoomBroadcaster>,
}

impl AppState {
    pub fn new(router: Arc<MessageRouter>, broadcaster: Arc<dyn RoomBroadcaster>) -> Self {
        Self {
            router,
            broadcaster,
        }
    }
}

/// Application-level errors. All of these are recoverable: they are
/// reported only to the requesting connection as a structured failure
/// reply and are never fatal to the connection or the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,

    #[error("Already a member of this room")]
    AlreadyMember,

    #[error("Not a member of this room")]
    NotAMember,

    #[error("Game not found")]
    GameNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Internal server error")]
    Internal,
}
