use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use super::messages::ServerMessage;

/// Fans out messages to live connections. Tracks which connections belong
/// to which room, and which registered user sits behind which connection,
/// so handlers can address a private reply, a whole room, or a room minus
/// the sender.
///
/// Delivery is fault-tolerant per recipient: a send that fails (client
/// gone, channel closed) is logged and skipped, never surfaced to the
/// caller and never allowed to block the remaining recipients.
#[async_trait]
pub trait RoomBroadcaster: Send + Sync {
    async fn add_connection(&self, conn_id: &str, sender: mpsc::UnboundedSender<String>);

    /// Drops the connection and every room/user association it holds.
    async fn remove_connection(&self, conn_id: &str);

    /// Associates a registered user with a connection so per-viewer
    /// payloads can be addressed by user id.
    async fn bind_user(&self, conn_id: &str, user_id: &str);

    async fn join_room(&self, room_id: &str, conn_id: &str);

    async fn leave_room(&self, room_id: &str, conn_id: &str);

    /// Removes the room's whole fan-out set (room deleted).
    async fn drop_room(&self, room_id: &str);

    async fn send_to_connection(&self, conn_id: &str, message: &ServerMessage);

    async fn send_to_user(&self, user_id: &str, message: &ServerMessage);

    async fn broadcast(&self, room_id: &str, message: &ServerMessage);

    async fn broadcast_except(&self, room_id: &str, except_conn_id: &str, message: &ServerMessage);
}

#[derive(Default)]
struct BroadcasterInner {
    /// conn_id -> outbound channel
    connections: HashMap<String, mpsc::UnboundedSender<String>>,
    /// user_id -> conn_id
    user_conns: HashMap<String, String>,
    /// room_id -> set of conn_ids
    rooms: HashMap<String, HashSet<String>>,
}

pub struct InMemoryRoomBroadcaster {
    inner: RwLock<BroadcasterInner>,
}

impl Default for InMemoryRoomBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomBroadcaster {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BroadcasterInner::default()),
        }
    }

    fn encode(message: &ServerMessage) -> Option<String> {
        match serde_json::to_string(message) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "Failed to serialize outbound message");
                None
            }
        }
    }

    fn deliver(inner: &BroadcasterInner, conn_id: &str, text: &str) {
        match inner.connections.get(conn_id) {
            Some(sender) => {
                if sender.send(text.to_string()).is_err() {
                    warn!(conn_id = %conn_id, "Failed to deliver message, connection gone");
                }
            }
            None => {
                debug!(conn_id = %conn_id, "No live connection for recipient");
            }
        }
    }
}

#[async_trait]
impl RoomBroadcaster for InMemoryRoomBroadcaster {
    async fn add_connection(&self, conn_id: &str, sender: mpsc::UnboundedSender<String>) {
        let mut inner = self.inner.write().await;
        inner.connections.insert(conn_id.to_string(), sender);
        debug!(conn_id = %conn_id, "Connection registered");
    }

    async fn remove_connection(&self, conn_id: &str) {
        let mut inner = self.inner.write().await;
        inner.connections.remove(conn_id);
        inner.user_conns.retain(|_, c| c != conn_id);
        for members in inner.rooms.values_mut() {
            members.remove(conn_id);
        }
        debug!(conn_id = %conn_id, "Connection removed");
    }

    async fn bind_user(&self, conn_id: &str, user_id: &str) {
        let mut inner = self.inner.write().await;
        inner
            .user_conns
            .insert(user_id.to_string(), conn_id.to_string());
    }

    async fn join_room(&self, room_id: &str, conn_id: &str) {
        let mut inner = self.inner.write().await;
        inner
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(conn_id.to_string());
    }

    async fn leave_room(&self, room_id: &str, conn_id: &str) {
        let mut inner = self.inner.write().await;
        if let Some(members) = inner.rooms.get_mut(room_id) {
            members.remove(conn_id);
            if members.is_empty() {
                inner.rooms.remove(room_id);
            }
        }
    }

    async fn drop_room(&self, room_id: &str) {
        let mut inner = self.inner.write().await;
        inner.rooms.remove(room_id);
        debug!(room_id = %room_id, "Room fan-out set dropped");
    }

    async fn send_to_connection(&self, conn_id: &str, message: &ServerMessage) {
        let Some(text) = Self::encode(message) else {
            return;
        };
        let inner = self.inner.read().await;
        Self::deliver(&inner, conn_id, &text);
    }

    async fn send_to_user(&self, user_id: &str, message: &ServerMessage) {
        let Some(text) = Self::encode(message) else {
            return;
        };
        let inner = self.inner.read().await;
        match inner.user_conns.get(user_id) {
            Some(conn_id) => Self::deliver(&inner, conn_id, &text),
            None => debug!(user_id = %user_id, "No connection bound for user"),
        }
    }

    async fn broadcast(&self, room_id: &str, message: &ServerMessage) {
        let Some(text) = Self::encode(message) else {
            return;
        };
        let inner = self.inner.read().await;
        if let Some(members) = inner.rooms.get(room_id) {
            for conn_id in members {
                Self::deliver(&inner, conn_id, &text);
            }
        }
    }

    async fn broadcast_except(&self, room_id: &str, except_conn_id: &str, message: &ServerMessage) {
        let Some(text) = Self::encode(message) else {
            return;
        };
        let inner = self.inner.read().await;
        if let Some(members) = inner.rooms.get(room_id) {
            for conn_id in members.iter().filter(|c| *c != except_conn_id) {
                Self::deliver(&inner, conn_id, &text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websockets::messages::MessageType;

    async fn connected(
        broadcaster: &InMemoryRoomBroadcaster,
        conn_id: &str,
    ) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        broadcaster.add_connection(conn_id, tx).await;
        rx
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(text) = rx.try_recv() {
            messages.push(serde_json::from_str(&text).unwrap());
        }
        messages
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_room_members() {
        let broadcaster = InMemoryRoomBroadcaster::new();
        let mut rx1 = connected(&broadcaster, "c1").await;
        let mut rx2 = connected(&broadcaster, "c2").await;
        let mut rx3 = connected(&broadcaster, "c3").await;

        broadcaster.join_room("r1", "c1").await;
        broadcaster.join_room("r1", "c2").await;

        broadcaster
            .broadcast("r1", &ServerMessage::chat("hello".to_string()))
            .await;

        assert_eq!(drain(&mut rx1).len(), 1);
        assert_eq!(drain(&mut rx2).len(), 1);
        assert!(drain(&mut rx3).is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_except_skips_sender() {
        let broadcaster = InMemoryRoomBroadcaster::new();
        let mut rx1 = connected(&broadcaster, "c1").await;
        let mut rx2 = connected(&broadcaster, "c2").await;

        broadcaster.join_room("r1", "c1").await;
        broadcaster.join_room("r1", "c2").await;

        broadcaster
            .broadcast_except("r1", "c1", &ServerMessage::player_drew("u1".to_string(), false))
            .await;

        assert!(drain(&mut rx1).is_empty());
        let received = drain(&mut rx2);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].message_type, MessageType::PlayerDrew);
    }

    #[tokio::test]
    async fn test_failed_send_does_not_block_other_recipients() {
        let broadcaster = InMemoryRoomBroadcaster::new();
        let rx1 = connected(&broadcaster, "c1").await;
        let mut rx2 = connected(&broadcaster, "c2").await;

        broadcaster.join_room("r1", "c1").await;
        broadcaster.join_room("r1", "c2").await;

        // c1's client is gone but still registered.
        drop(rx1);

        broadcaster
            .broadcast("r1", &ServerMessage::chat("hello".to_string()))
            .await;

        assert_eq!(drain(&mut rx2).len(), 1);
    }

    #[tokio::test]
    async fn test_send_to_user_after_binding() {
        let broadcaster = InMemoryRoomBroadcaster::new();
        let mut rx = connected(&broadcaster, "c1").await;
        broadcaster.bind_user("c1", "u1").await;

        broadcaster
            .send_to_user("u1", &ServerMessage::ack("ok"))
            .await;
        broadcaster
            .send_to_user("unbound", &ServerMessage::ack("ok"))
            .await;

        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_remove_connection_clears_all_associations() {
        let broadcaster = InMemoryRoomBroadcaster::new();
        let mut rx1 = connected(&broadcaster, "c1").await;
        let mut rx2 = connected(&broadcaster, "c2").await;

        broadcaster.bind_user("c1", "u1").await;
        broadcaster.join_room("r1", "c1").await;
        broadcaster.join_room("r1", "c2").await;

        broadcaster.remove_connection("c1").await;

        broadcaster
            .broadcast("r1", &ServerMessage::chat("hello".to_string()))
            .await;
        broadcaster
            .send_to_user("u1", &ServerMessage::ack("ok"))
            .await;

        assert!(drain(&mut rx1).is_empty());
        assert_eq!(drain(&mut rx2).len(), 1);
    }

    #[tokio::test]
    async fn test_drop_room_silences_broadcasts() {
        let broadcaster = InMemoryRoomBroadcaster::new();
        let mut rx = connected(&broadcaster, "c1").await;
        broadcaster.join_room("r1", "c1").await;

        broadcaster.drop_room("r1").await;
        broadcaster
            .broadcast("r1", &ServerMessage::chat("hello".to_string()))
            .await;

        assert!(drain(&mut rx).is_empty());
    }
}
