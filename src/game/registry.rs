use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::engine::{GameError, GameSession, GameStatus};
use crate::user::User;

/// Holds the live game of every room. Each session sits behind its own
/// mutex: every mutating request against a room locks that room's game for
/// the whole operation, so draw/guess/end-turn against one room are
/// strictly ordered while different rooms proceed independently.
pub struct GameRegistry {
    games: RwLock<HashMap<String, Arc<Mutex<GameSession>>>>,
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRegistry {
    pub fn new() -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a fresh session for the room. Refuses while the room's
    /// previous game is still active; an `Ended` leftover is replaced.
    pub async fn create(
        &self,
        room_id: &str,
        players: &[User],
    ) -> Result<Arc<Mutex<GameSession>>, GameError> {
        let mut games = self.games.write().await;

        if let Some(existing) = games.get(room_id) {
            let game = existing.lock().await;
            if game.status() != GameStatus::Ended {
                return Err(GameError::GameInProgress);
            }
        }

        let session = GameSession::new(room_id.to_string(), players)?;
        let handle = Arc::new(Mutex::new(session));
        games.insert(room_id.to_string(), handle.clone());

        info!(room_id = %room_id, players = players.len(), "Game session created");
        Ok(handle)
    }

    pub async fn get(&self, room_id: &str) -> Option<Arc<Mutex<GameSession>>> {
        let games = self.games.read().await;
        games.get(room_id).cloned()
    }

    /// Explicit teardown, invoked when a game ends or its room is deleted.
    pub async fn remove(&self, room_id: &str) {
        let mut games = self.games.write().await;
        if games.remove(room_id).is_some() {
            debug!(room_id = %room_id, "Game session removed");
        }
    }
}
