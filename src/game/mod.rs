// Public API
pub use engine::{
    GameError, GameSession, GameStateView, GameStatus, GuessOutcome, PlayerState, PlayerView,
};
pub use registry::GameRegistry;
pub use tiles::{Tile, TileColor, TileInfo, HIDDEN_NUMBER};

// Internal modules
mod engine;
mod registry;
mod tiles;
