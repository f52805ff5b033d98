use std::collections::HashMap;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::tiles::{Tile, TileInfo};
use crate::user::User;

/// Tiles dealt to every player when a game starts.
const TILES_PER_PLAYER: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Target player not found")]
    TargetNotFound,
    #[error("Invalid tile index")]
    InvalidIndex,
    #[error("Tile already revealed")]
    AlreadyRevealed,
    #[error("No tiles available")]
    NoTilesAvailable,
    #[error("Not enough tiles to deal")]
    InsufficientTiles,
    #[error("Game requires 2-4 players, got {0}")]
    InvalidPlayerCount(usize),
    #[error("A game is already in progress")]
    GameInProgress,
    #[error("Game is not in progress")]
    NotPlaying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Waiting,
    Playing,
    Ended,
}

/// One player's seat at the table. `eliminated` is derived state: it is
/// recomputed from the hand after every reveal and never set directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub user_id: String,
    pub display_name: String,
    tiles: Vec<Tile>,
    eliminated: bool,
}

impl PlayerState {
    fn new(user_id: String, display_name: String) -> Self {
        Self {
            user_id,
            display_name,
            tiles: Vec::new(),
            eliminated: false,
        }
    }

    /// Inserts a tile and restores the hand invariant: ascending by
    /// number, Black before White on ties.
    fn add_tile(&mut self, tile: Tile) {
        self.tiles.push(tile);
        self.tiles.sort_by_key(Tile::sort_key);
    }

    fn recheck_elimination(&mut self) -> bool {
        self.eliminated = self.tiles.iter().all(|t| t.revealed);
        self.eliminated
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    fn tiles_info(&self, is_owner: bool) -> Vec<TileInfo> {
        self.tiles.iter().map(|t| t.info(!is_owner)).collect()
    }
}

/// Result of a resolved guess, shaped for the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessOutcome {
    pub correct: bool,
    /// On a correct guess: the revealed tile, now public.
    pub tile: Option<TileInfo>,
    /// On an incorrect guess: the true number of the mis-guessed tile.
    pub actual_number: Option<u8>,
    /// On an incorrect guess: the guesser's penalty tile, now public.
    pub penalty_tile: Option<TileInfo>,
    pub target_eliminated: bool,
    pub guesser_eliminated: bool,
    /// Whether the guesser keeps the turn and may act again.
    pub can_continue: bool,
}

/// Per-viewer snapshot of one player, with unrevealed tile numbers masked
/// for everyone but the owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub display_name: String,
    pub tiles: Vec<TileInfo>,
    pub eliminated: bool,
    pub tile_count: usize,
}

/// Per-viewer snapshot of the whole game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub room_id: String,
    pub status: GameStatus,
    pub current_player: String,
    pub players: HashMap<String, PlayerView>,
    pub player_order: Vec<String>,
    pub draw_pile_count: usize,
    pub revealed_pile_count: usize,
    pub winner: Option<String>,
}

/// The authoritative state of one game. All mutation goes through the
/// operations below; callers serialize access per room (see `GameRegistry`).
#[derive(Debug, Clone)]
pub struct GameSession {
    room_id: String,
    draw_pile: Vec<Tile>,
    revealed_pile: Vec<Tile>,
    players: HashMap<String, PlayerState>,
    turn_order: Vec<String>,
    current_turn: usize,
    status: GameStatus,
    winner: Option<String>,
}

impl GameSession {
    /// Builds a session for the given players: full 24-tile deck,
    /// uniformly shuffled, turn order fixed to the input order.
    pub fn new(room_id: String, players: &[User]) -> Result<Self, GameError> {
        if !(2..=4).contains(&players.len()) {
            return Err(GameError::InvalidPlayerCount(players.len()));
        }

        let mut draw_pile = Tile::full_deck();
        draw_pile.shuffle(&mut rand::rng());

        let mut player_states = HashMap::new();
        let mut turn_order = Vec::with_capacity(players.len());
        for user in players {
            player_states.insert(
                user.user_id.clone(),
                PlayerState::new(user.user_id.clone(), user.display_name.clone()),
            );
            turn_order.push(user.user_id.clone());
        }

        Ok(Self {
            room_id,
            draw_pile,
            revealed_pile: Vec::new(),
            players: player_states,
            turn_order,
            current_turn: 0,
            status: GameStatus::Waiting,
            winner: None,
        })
    }

    /// Deals four tiles to every player, round-robin (one tile each per
    /// round, four rounds), and opens play. Returns the first player to act.
    pub fn start(&mut self) -> Result<String, GameError> {
        if self.draw_pile.len() < TILES_PER_PLAYER * self.turn_order.len() {
            return Err(GameError::InsufficientTiles);
        }

        for _ in 0..TILES_PER_PLAYER {
            for user_id in &self.turn_order {
                let tile = self.draw_pile.pop().ok_or(GameError::InsufficientTiles)?;
                if let Some(player) = self.players.get_mut(user_id) {
                    player.add_tile(tile);
                }
            }
        }

        self.status = GameStatus::Playing;
        self.current_turn = 0;
        debug_assert_eq!(self.total_tiles(), 24);

        Ok(self.current_player().to_string())
    }

    pub fn current_player(&self) -> &str {
        &self.turn_order[self.current_turn]
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn player_ids(&self) -> &[String] {
        &self.turn_order
    }

    /// Draws a tile into the current player's hand. Prefers the revealed
    /// pile when asked for and non-empty, otherwise the draw pile. Does NOT
    /// advance the turn: drawing and guessing are separate actions within
    /// the same turn. The returned tile is for the drawer's eyes only.
    pub fn draw_tile(&mut self, user_id: &str, from_revealed: bool) -> Result<Tile, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::NotPlaying);
        }
        if self.current_player() != user_id {
            return Err(GameError::NotYourTurn);
        }

        let tile = if from_revealed && !self.revealed_pile.is_empty() {
            self.revealed_pile.pop()
        } else {
            self.draw_pile.pop()
        }
        .ok_or(GameError::NoTilesAvailable)?;

        let drawn = tile.clone();
        if let Some(player) = self.players.get_mut(user_id) {
            player.add_tile(tile);
        }
        debug_assert_eq!(self.total_tiles(), 24);

        Ok(drawn)
    }

    /// Resolves a guess against `target_user_id`'s tile at `tile_index`.
    ///
    /// Correct: the tile is revealed to everyone and the guesser keeps the
    /// turn. Incorrect: the guesser's smallest-numbered unrevealed tile is
    /// revealed as a penalty and the turn advances. Elimination is
    /// rechecked after every reveal, and the win condition after every
    /// elimination check.
    pub fn guess(
        &mut self,
        guesser_id: &str,
        target_user_id: &str,
        tile_index: usize,
        guessed_number: u8,
    ) -> Result<GuessOutcome, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::NotPlaying);
        }
        if self.current_player() != guesser_id {
            return Err(GameError::NotYourTurn);
        }

        let target = self
            .players
            .get_mut(target_user_id)
            .ok_or(GameError::TargetNotFound)?;
        if tile_index >= target.tiles.len() {
            return Err(GameError::InvalidIndex);
        }
        if target.tiles[tile_index].revealed {
            return Err(GameError::AlreadyRevealed);
        }
        let actual_number = target.tiles[tile_index].number;

        if guessed_number == actual_number {
            target.tiles[tile_index].revealed = true;
            let revealed = target.tiles[tile_index].info(false);
            let target_eliminated = target.recheck_elimination();
            self.evaluate_win();

            return Ok(GuessOutcome {
                correct: true,
                tile: Some(revealed),
                actual_number: None,
                penalty_tile: None,
                target_eliminated,
                guesser_eliminated: false,
                can_continue: self.status == GameStatus::Playing,
            });
        }

        // Wrong guess: the penalty is the guesser's smallest unrevealed
        // tile. The hand is sorted, so that is the first unrevealed one.
        let mut penalty_tile = None;
        let mut guesser_eliminated = false;
        if let Some(guesser) = self.players.get_mut(guesser_id) {
            if let Some(tile) = guesser.tiles.iter_mut().find(|t| !t.revealed) {
                tile.revealed = true;
                penalty_tile = Some(tile.info(false));
            }
            guesser_eliminated = guesser.recheck_elimination();
        }
        self.evaluate_win();
        if self.status == GameStatus::Playing {
            self.next_turn();
        }

        Ok(GuessOutcome {
            correct: false,
            tile: None,
            actual_number: Some(actual_number),
            penalty_tile,
            target_eliminated: false,
            guesser_eliminated,
            can_continue: false,
        })
    }

    /// Passes the turn to the next surviving player with no other effect.
    pub fn end_turn(&mut self, user_id: &str) -> Result<String, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::NotPlaying);
        }
        if self.current_player() != user_id {
            return Err(GameError::NotYourTurn);
        }

        self.next_turn();
        Ok(self.current_player().to_string())
    }

    /// Rotates to the next non-eliminated player, giving up after one full
    /// cycle so an all-eliminated table cannot loop forever.
    fn next_turn(&mut self) {
        let max_attempts = self.turn_order.len();
        let mut attempts = 0;
        loop {
            self.current_turn = (self.current_turn + 1) % self.turn_order.len();
            attempts += 1;

            let user_id = &self.turn_order[self.current_turn];
            let alive = self.players.get(user_id).is_some_and(|p| !p.eliminated);
            if alive || attempts >= max_attempts {
                break;
            }
        }

        self.evaluate_win();
    }

    /// One survivor wins; zero survivors is a draw. With two or more left
    /// the game continues.
    fn evaluate_win(&mut self) {
        if self.status != GameStatus::Playing {
            return;
        }

        let survivors: Vec<&String> = self
            .turn_order
            .iter()
            .filter(|id| self.players.get(*id).is_some_and(|p| !p.eliminated))
            .collect();

        match survivors.len() {
            1 => {
                self.status = GameStatus::Ended;
                self.winner = Some(survivors[0].clone());
            }
            0 => {
                self.status = GameStatus::Ended;
                self.winner = None;
            }
            _ => {}
        }
    }

    /// Builds the snapshot `viewer_id` is entitled to see: their own hand
    /// in full, every other hand with unrevealed numbers masked. This is
    /// the only path from game state to a serializable payload.
    pub fn state_for(&self, viewer_id: &str) -> GameStateView {
        let players = self
            .players
            .iter()
            .map(|(user_id, player)| {
                (
                    user_id.clone(),
                    PlayerView {
                        display_name: player.display_name.clone(),
                        tiles: player.tiles_info(user_id == viewer_id),
                        eliminated: player.eliminated,
                        tile_count: player.tiles.len(),
                    },
                )
            })
            .collect();

        GameStateView {
            room_id: self.room_id.clone(),
            status: self.status,
            current_player: self.current_player().to_string(),
            players,
            player_order: self.turn_order.clone(),
            draw_pile_count: self.draw_pile.len(),
            revealed_pile_count: self.revealed_pile.len(),
            winner: self.winner.clone(),
        }
    }

    fn total_tiles(&self) -> usize {
        self.draw_pile.len()
            + self.revealed_pile.len()
            + self.players.values().map(|p| p.tiles.len()).sum::<usize>()
    }
}
