use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Room metadata as held by the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomModel {
    pub id: String, // UUID v4 generated at creation, immutable
    pub connected: Vec<String>, // session tokens in join order, never longer than CAPACITY
    pub created_at: DateTime<Utc>,
}

impl RoomModel {
    /// Maximum number of participants per room
    pub const CAPACITY: usize = 2;

    /// Creates a new room model with a generated ID and no participants
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            connected: vec![],
            created_at: Utc::now(),
        }
    }

    /// Check if both participant slots are taken
    pub fn is_full(&self) -> bool {
        self.connected.len() >= Self::CAPACITY
    }

    /// Check if a session token has already been admitted to this room
    pub fn has_token(&self, token: &str) -> bool {
        self.connected.iter().any(|t| t == token)
    }
}

impl Default for RoomModel {
    fn default() -> Self {
        Self::new()
    }
}

/// A single chat message
///
/// The `id` and `timestamp` fields are assigned by the store at append
/// time, so the order observed by readers is the order appends were
/// accepted. Messages are never mutated and die with their room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageModel {
    pub id: u64, // unique within a room, monotonically increasing
    pub sender: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_room_model() {
        let room = RoomModel::new();

        assert!(!room.id.is_empty());
        assert!(room.connected.is_empty());
        assert!(!room.is_full());
    }

    #[test]
    fn test_room_ids_are_unique() {
        let room1 = RoomModel::new();
        let room2 = RoomModel::new();

        assert_ne!(room1.id, room2.id);
    }

    #[test]
    fn test_capacity_check() {
        let mut room = RoomModel::new();
        assert!(!room.is_full());

        room.connected.push("token-a".to_string());
        assert!(!room.is_full());

        room.connected.push("token-b".to_string());
        assert!(room.is_full());
    }

    #[test]
    fn test_has_token() {
        let mut room = RoomModel::new();
        room.connected.push("token-a".to_string());

        assert!(room.has_token("token-a"));
        assert!(!room.has_token("token-b"));
        assert!(!room.has_token(""));
    }
}
