use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

use super::models::{RoomModel, RoomStatus};

/// Result of attempting to join a room
#[derive(Debug, Clone)]
pub enum JoinRoomResult {
    /// Successfully joined the room, returns updated room data
    Success(RoomModel),
    /// Room is at capacity
    RoomFull,
    /// User is already a member
    AlreadyMember,
    /// Room does not exist
    RoomNotFound,
}

/// Result of attempting to leave a room
#[derive(Debug, Clone)]
pub enum LeaveRoomResult {
    /// Successfully left the room, returns updated room data
    Success(RoomModel),
    /// The room was deleted: the owner left, or membership became empty
    RoomDeleted,
    /// User was not a member of the room
    NotAMember,
    /// Room does not exist
    RoomNotFound,
}

/// Trait for room registry operations
#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn create_room(&self, name: &str, owner_id: &str, max_members: usize) -> RoomModel;
    async fn get_room(&self, room_id: &str) -> Option<RoomModel>;
    async fn list_rooms(&self) -> Vec<RoomModel>;

    /// Atomically attempts to join a room, checking capacity and duplicate
    /// membership under one lock so concurrent joins cannot overshoot.
    async fn try_join_room(&self, room_id: &str, user_id: &str) -> JoinRoomResult;

    /// Atomically removes a member. The owner leaving deletes the room
    /// outright, regardless of remaining members or an in-progress game;
    /// an emptied room is deleted as well.
    async fn leave_room(&self, room_id: &str, user_id: &str) -> LeaveRoomResult;

    async fn set_status(&self, room_id: &str, status: RoomStatus) -> bool;
}

/// In-memory implementation of RoomRepository
pub struct InMemoryRoomRepository {
    rooms: Mutex<HashMap<String, RoomModel>>,
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    #[instrument(skip(self))]
    async fn create_room(&self, name: &str, owner_id: &str, max_members: usize) -> RoomModel {
        let room = RoomModel::new(name.to_string(), owner_id.to_string(), max_members);

        let mut rooms = self.rooms.lock().unwrap();
        rooms.insert(room.room_id.clone(), room.clone());

        info!(
            room_id = %room.room_id,
            owner_id = %owner_id,
            max_members = max_members,
            "Room created"
        );
        room
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: &str) -> Option<RoomModel> {
        let rooms = self.rooms.lock().unwrap();
        let room = rooms.get(room_id).cloned();

        debug!(room_id = %room_id, found = room.is_some(), "Room lookup");
        room
    }

    #[instrument(skip(self))]
    async fn list_rooms(&self) -> Vec<RoomModel> {
        let rooms = self.rooms.lock().unwrap();
        rooms.values().cloned().collect()
    }

    #[instrument(skip(self))]
    async fn try_join_room(&self, room_id: &str, user_id: &str) -> JoinRoomResult {
        let mut rooms = self.rooms.lock().unwrap();

        let room = match rooms.get_mut(room_id) {
            Some(room) => room,
            None => {
                debug!(room_id = %room_id, "Room not found");
                return JoinRoomResult::RoomNotFound;
            }
        };

        if room.has_member(user_id) {
            debug!(room_id = %room_id, user_id = %user_id, "User already in room");
            return JoinRoomResult::AlreadyMember;
        }

        if room.is_full() {
            debug!(
                room_id = %room_id,
                member_count = room.member_count(),
                "Room is full"
            );
            return JoinRoomResult::RoomFull;
        }

        room.member_ids.push(user_id.to_string());
        let updated_room = room.clone();

        info!(
            room_id = %room_id,
            user_id = %user_id,
            member_count = updated_room.member_count(),
            "User joined room"
        );
        JoinRoomResult::Success(updated_room)
    }

    #[instrument(skip(self))]
    async fn leave_room(&self, room_id: &str, user_id: &str) -> LeaveRoomResult {
        let mut rooms = self.rooms.lock().unwrap();

        let room = match rooms.get_mut(room_id) {
            Some(room) => room,
            None => {
                debug!(room_id = %room_id, "Room not found");
                return LeaveRoomResult::RoomNotFound;
            }
        };

        if !room.has_member(user_id) {
            debug!(room_id = %room_id, user_id = %user_id, "User not in room");
            return LeaveRoomResult::NotAMember;
        }

        room.member_ids.retain(|id| id != user_id);

        if room.owner_id == user_id {
            rooms.remove(room_id);
            info!(room_id = %room_id, user_id = %user_id, "Owner left, room deleted");
            return LeaveRoomResult::RoomDeleted;
        }

        if room.member_ids.is_empty() {
            rooms.remove(room_id);
            info!(room_id = %room_id, "Room is now empty, deleted");
            return LeaveRoomResult::RoomDeleted;
        }

        let updated_room = room.clone();
        info!(
            room_id = %room_id,
            user_id = %user_id,
            member_count = updated_room.member_count(),
            "User left room"
        );
        LeaveRoomResult::Success(updated_room)
    }

    #[instrument(skip(self))]
    async fn set_status(&self, room_id: &str, status: RoomStatus) -> bool {
        let mut rooms = self.rooms.lock().unwrap();
        match rooms.get_mut(room_id) {
            Some(room) => {
                room.status = status;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_room() {
        let repo = InMemoryRoomRepository::new();
        let room = repo.create_room("lobby", "alice", 4).await;

        let found = repo.get_room(&room.room_id).await.unwrap();
        assert_eq!(found.name, "lobby");
        assert_eq!(found.owner_id, "alice");
        assert_eq!(found.member_ids, vec!["alice"]);
        assert_eq!(found.status, RoomStatus::Matching);
    }

    #[tokio::test]
    async fn test_get_nonexistent_room() {
        let repo = InMemoryRoomRepository::new();
        assert!(repo.get_room("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_list_rooms() {
        let repo = InMemoryRoomRepository::new();
        assert!(repo.list_rooms().await.is_empty());

        let r1 = repo.create_room("one", "alice", 4).await;
        let r2 = repo.create_room("two", "bob", 4).await;

        let ids: std::collections::HashSet<String> = repo
            .list_rooms()
            .await
            .into_iter()
            .map(|r| r.room_id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&r1.room_id));
        assert!(ids.contains(&r2.room_id));
    }

    #[tokio::test]
    async fn test_join_room() {
        let repo = InMemoryRoomRepository::new();
        let room = repo.create_room("lobby", "alice", 4).await;

        let result = repo.try_join_room(&room.room_id, "bob").await;
        match result {
            JoinRoomResult::Success(updated) => {
                assert_eq!(updated.member_ids, vec!["alice", "bob"]);
            }
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_join_full_room() {
        let repo = InMemoryRoomRepository::new();
        let room = repo.create_room("lobby", "alice", 2).await;

        repo.try_join_room(&room.room_id, "bob").await;
        let result = repo.try_join_room(&room.room_id, "carol").await;
        assert!(matches!(result, JoinRoomResult::RoomFull));
    }

    #[tokio::test]
    async fn test_join_twice_rejected() {
        let repo = InMemoryRoomRepository::new();
        let room = repo.create_room("lobby", "alice", 4).await;

        let result = repo.try_join_room(&room.room_id, "alice").await;
        assert!(matches!(result, JoinRoomResult::AlreadyMember));
    }

    #[tokio::test]
    async fn test_join_nonexistent_room() {
        let repo = InMemoryRoomRepository::new();
        let result = repo.try_join_room("missing", "bob").await;
        assert!(matches!(result, JoinRoomResult::RoomNotFound));
    }

    #[tokio::test]
    async fn test_member_leaves_room() {
        let repo = InMemoryRoomRepository::new();
        let room = repo.create_room("lobby", "alice", 4).await;
        repo.try_join_room(&room.room_id, "bob").await;

        let result = repo.leave_room(&room.room_id, "bob").await;
        match result {
            LeaveRoomResult::Success(updated) => {
                assert_eq!(updated.member_ids, vec!["alice"]);
            }
            other => panic!("expected Success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_owner_leaving_deletes_room_with_members_present() {
        let repo = InMemoryRoomRepository::new();
        let room = repo.create_room("lobby", "alice", 4).await;
        repo.try_join_room(&room.room_id, "bob").await;
        repo.set_status(&room.room_id, RoomStatus::Playing).await;

        // Owner leaves mid-game: room goes away even though bob remains.
        let result = repo.leave_room(&room.room_id, "alice").await;
        assert!(matches!(result, LeaveRoomResult::RoomDeleted));
        assert!(repo.get_room(&room.room_id).await.is_none());
    }

    #[tokio::test]
    async fn test_last_member_leaving_deletes_room() {
        let repo = InMemoryRoomRepository::new();
        let room = repo.create_room("lobby", "alice", 4).await;

        // Reassign ownership so the empty-room rule is what fires.
        repo.rooms
            .lock()
            .unwrap()
            .get_mut(&room.room_id)
            .unwrap()
            .owner_id = "ghost".to_string();

        let result = repo.leave_room(&room.room_id, "alice").await;
        assert!(matches!(result, LeaveRoomResult::RoomDeleted));
        assert!(repo.get_room(&room.room_id).await.is_none());
    }

    #[tokio::test]
    async fn test_leave_when_not_member() {
        let repo = InMemoryRoomRepository::new();
        let room = repo.create_room("lobby", "alice", 4).await;

        let result = repo.leave_room(&room.room_id, "bob").await;
        assert!(matches!(result, LeaveRoomResult::NotAMember));
    }

    #[tokio::test]
    async fn test_set_status() {
        let repo = InMemoryRoomRepository::new();
        let room = repo.create_room("lobby", "alice", 4).await;

        assert!(repo.set_status(&room.room_id, RoomStatus::Playing).await);
        let updated = repo.get_room(&room.room_id).await.unwrap();
        assert_eq!(updated.status, RoomStatus::Playing);

        assert!(!repo.set_status("missing", RoomStatus::Ended).await);
    }
}
