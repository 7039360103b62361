use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Events fanned out to a room's currently-connected subscribers
///
/// Events are advisory hints, not a system of record: `MessageAdded`
/// tells subscribers to re-fetch the message list, `RoomDestroyed` tells
/// them the room is gone. There is no retained log - a subscriber that
/// attaches late catches up through the room API, not through replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoomEvent {
    /// A message was appended to the room
    MessageAdded { room_id: String },

    /// The room and its history were removed
    RoomDestroyed { room_id: String },
}

impl RoomEvent {
    /// Get the room_id associated with this event
    pub fn room_id(&self) -> &str {
        match self {
            RoomEvent::MessageAdded { room_id } => room_id,
            RoomEvent::RoomDestroyed { room_id } => room_id,
        }
    }

    /// Get the wire-level kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            RoomEvent::MessageAdded { .. } => EventKind::MessageAdded,
            RoomEvent::RoomDestroyed { .. } => EventKind::RoomDestroyed,
        }
    }
}

/// Wire names for the two event kinds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum EventKind {
    #[serde(rename = "message-added")]
    #[strum(serialize = "message-added")]
    MessageAdded,

    #[serde(rename = "room-destroyed")]
    #[strum(serialize = "room-destroyed")]
    RoomDestroyed,
}
