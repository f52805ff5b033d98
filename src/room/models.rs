use serde::{Deserialize, Serialize};
use strum_macros::Display;

pub const DEFAULT_MAX_MEMBERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Matching,
    Playing,
    Ended,
}

/// A room and its membership. The owner is always a member, added at
/// creation; membership order is join order and seeds the game's turn
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomModel {
    pub room_id: String,
    pub name: String,
    pub owner_id: String,
    pub member_ids: Vec<String>,
    pub max_members: usize,
    pub status: RoomStatus,
}

impl RoomModel {
    /// Creates a room with a generated human-readable id. The owner joins
    /// as the first member.
    pub fn new(name: String, owner_id: String, max_members: usize) -> Self {
        let room_id = petname::Petnames::default().generate_one(2, "");

        Self {
            room_id,
            name,
            owner_id: owner_id.clone(),
            member_ids: vec![owner_id],
            max_members,
            status: RoomStatus::Matching,
        }
    }

    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_full(&self) -> bool {
        self.member_ids.len() >= self.max_members
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|id| id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_is_first_member() {
        let room = RoomModel::new("lobby".to_string(), "u1".to_string(), 4);
        assert_eq!(room.member_ids, vec!["u1"]);
        assert_eq!(room.owner_id, "u1");
        assert_eq!(room.status, RoomStatus::Matching);
        assert!(!room.room_id.is_empty());
    }

    #[test]
    fn test_capacity_checks() {
        let mut room = RoomModel::new("lobby".to_string(), "u1".to_string(), 2);
        assert!(!room.is_full());
        room.member_ids.push("u2".to_string());
        assert!(room.is_full());
        assert!(room.has_member("u2"));
        assert!(!room.has_member("u3"));
    }
}
