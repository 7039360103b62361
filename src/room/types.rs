use serde::{Deserialize, Serialize};

use crate::store::models::MessageModel;

/// Query string carrying the room identifier, shared by every room-scoped
/// endpoint
#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    #[serde(rename = "roomId")]
    pub room_id: String,
}

/// Request payload for creating a new room
#[derive(Debug, Default, Deserialize)]
pub struct CreateRoomRequest {
    /// Room lifetime in seconds; the configured default applies when
    /// omitted
    #[serde(rename = "ttlSecs")]
    pub ttl_secs: Option<u64>,
}

/// Response for room creation
#[derive(Debug, Serialize, Deserialize)]
pub struct RoomCreatedResponse {
    #[serde(rename = "roomId")]
    pub room_id: String,
    pub ttl: u64,
}

/// Response for the TTL endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct TtlResponse {
    pub ttl: u64,
}

/// Request payload for posting a message
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub sender: String,
    pub text: String,
}

/// Response for the message list endpoint, in creation order
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageModel>,
}
