// Public API
pub use broadcaster::{InMemoryRoomBroadcaster, RoomBroadcaster};
pub use handler::websocket_handler;
pub use messages::{
    ClientRequest, MessageType, RoomMember, RoomSummary, ServerMessage, ServerMessageMeta,
};
pub use router::MessageRouter;
pub use socket::{Connection, MessageHandler, SocketWrapper};

// Internal modules
mod broadcaster;
mod handler;
mod messages;
mod router;
mod socket;
