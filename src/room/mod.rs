// Public API
pub use models::{RoomModel, RoomStatus, DEFAULT_MAX_MEMBERS};
pub use repository::{InMemoryRoomRepository, JoinRoomResult, LeaveRoomResult, RoomRepository};

// Internal modules
mod models;
mod repository;
