use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

use super::models::{MessageModel, RoomModel};
use crate::shared::AppError;

/// Result of the atomic conditional-join primitive
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    /// Token was appended to the room's connected list
    Joined(RoomModel),
    /// Token was already in the connected list; no mutation
    AlreadyConnected(RoomModel),
    /// Both slots were already occupied
    Full,
    /// Room missing or expired
    NotFound,
}

/// Trait for the ephemeral room store
///
/// Room metadata and the message list for a room share one expiry
/// horizon, set once at creation and never extended. Expiry is enforced
/// by the store itself; callers observe an expired room exactly as they
/// observe one that never existed.
#[async_trait]
pub trait RoomStore {
    /// Writes room metadata with the given TTL. The message list created
    /// for the room inherits the same expiry horizon.
    async fn create_room(&self, room: &RoomModel, ttl: Duration) -> Result<(), AppError>;

    async fn get_meta(&self, room_id: &str) -> Result<Option<RoomModel>, AppError>;

    /// Atomically appends `token` to the room's connected list iff a slot
    /// is free. This is a single transactional step against the store -
    /// never a read followed by a write - because concurrent admission
    /// attempts for the same room are the primary race to resolve.
    /// Idempotent for a token that is already present.
    async fn conditional_join(&self, room_id: &str, token: &str) -> Result<JoinOutcome, AppError>;

    /// Time until passive expiry, or None if the room is gone
    async fn remaining_ttl(&self, room_id: &str) -> Result<Option<Duration>, AppError>;

    /// Appends a message, assigning its id and timestamp. Returns the
    /// stored message, or None if the room is gone.
    async fn append_message(
        &self,
        room_id: &str,
        sender: &str,
        text: &str,
    ) -> Result<Option<MessageModel>, AppError>;

    /// Messages in creation order, or None if the room is gone
    async fn list_messages(&self, room_id: &str) -> Result<Option<Vec<MessageModel>>, AppError>;

    /// Removes metadata and message list together. Idempotent; returns
    /// whether anything was actually removed, so callers can keep the
    /// destroyed notification to a single publish.
    async fn destroy(&self, room_id: &str) -> Result<bool, AppError>;
}

/// A room's full state in the in-memory store. Metadata and messages
/// live in one entry so they appear and disappear together.
struct RoomEntry {
    meta: RoomModel,
    messages: Vec<MessageModel>,
    next_message_id: u64,
    expires_at: Instant,
}

impl RoomEntry {
    fn is_expired(&self) -> bool {
        self.expires_at <= Instant::now()
    }
}

/// In-memory implementation of RoomStore for development and testing
///
/// TTL enforcement is passive: expired entries are evicted lazily when
/// their key is next touched, which makes expiry indistinguishable from
/// explicit destruction, matching the native expiry of the production
/// store.
pub struct InMemoryRoomStore {
    rooms: Mutex<HashMap<String, RoomEntry>>,
}

impl Default for InMemoryRoomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomStore {
    /// Creates a new empty in-memory store
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Drops the entry for `room_id` if its TTL has elapsed
    fn evict_if_expired(rooms: &mut HashMap<String, RoomEntry>, room_id: &str) {
        let expired = rooms.get(room_id).is_some_and(RoomEntry::is_expired);
        if expired {
            debug!(room_id = %room_id, "Evicting expired room");
            rooms.remove(room_id);
        }
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    #[instrument(skip(self, room))]
    async fn create_room(&self, room: &RoomModel, ttl: Duration) -> Result<(), AppError> {
        let mut rooms = self.rooms.lock().unwrap();
        Self::evict_if_expired(&mut rooms, &room.id);

        if rooms.contains_key(&room.id) {
            debug!(room_id = %room.id, "Room already exists");
            return Err(AppError::Internal);
        }

        rooms.insert(
            room.id.clone(),
            RoomEntry {
                meta: room.clone(),
                messages: Vec::new(),
                next_message_id: 1,
                expires_at: Instant::now() + ttl,
            },
        );

        debug!(room_id = %room.id, ttl_secs = ttl.as_secs(), "Room created in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_meta(&self, room_id: &str) -> Result<Option<RoomModel>, AppError> {
        let mut rooms = self.rooms.lock().unwrap();
        Self::evict_if_expired(&mut rooms, room_id);

        Ok(rooms.get(room_id).map(|entry| entry.meta.clone()))
    }

    #[instrument(skip(self, token))]
    async fn conditional_join(&self, room_id: &str, token: &str) -> Result<JoinOutcome, AppError> {
        // The whole check-and-append runs under one lock acquisition,
        // which is what makes this the linearization point for admission.
        let mut rooms = self.rooms.lock().unwrap();
        Self::evict_if_expired(&mut rooms, room_id);

        let entry = match rooms.get_mut(room_id) {
            Some(entry) => entry,
            None => {
                debug!(room_id = %room_id, "Room not found");
                return Ok(JoinOutcome::NotFound);
            }
        };

        if entry.meta.has_token(token) {
            debug!(room_id = %room_id, "Token already connected");
            return Ok(JoinOutcome::AlreadyConnected(entry.meta.clone()));
        }

        if entry.meta.is_full() {
            debug!(room_id = %room_id, "Room is full");
            return Ok(JoinOutcome::Full);
        }

        entry.meta.connected.push(token.to_string());
        let updated = entry.meta.clone();

        info!(
            room_id = %room_id,
            connected = updated.connected.len(),
            "Token joined room (atomic)"
        );

        Ok(JoinOutcome::Joined(updated))
    }

    #[instrument(skip(self))]
    async fn remaining_ttl(&self, room_id: &str) -> Result<Option<Duration>, AppError> {
        let mut rooms = self.rooms.lock().unwrap();
        Self::evict_if_expired(&mut rooms, room_id);

        Ok(rooms
            .get(room_id)
            .map(|entry| entry.expires_at.saturating_duration_since(Instant::now())))
    }

    #[instrument(skip(self, sender, text))]
    async fn append_message(
        &self,
        room_id: &str,
        sender: &str,
        text: &str,
    ) -> Result<Option<MessageModel>, AppError> {
        let mut rooms = self.rooms.lock().unwrap();
        Self::evict_if_expired(&mut rooms, room_id);

        let entry = match rooms.get_mut(room_id) {
            Some(entry) => entry,
            None => {
                debug!(room_id = %room_id, "Room not found for append");
                return Ok(None);
            }
        };

        let message = MessageModel {
            id: entry.next_message_id,
            sender: sender.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        entry.next_message_id += 1;
        entry.messages.push(message.clone());

        debug!(
            room_id = %room_id,
            message_id = message.id,
            "Message appended"
        );

        Ok(Some(message))
    }

    #[instrument(skip(self))]
    async fn list_messages(&self, room_id: &str) -> Result<Option<Vec<MessageModel>>, AppError> {
        let mut rooms = self.rooms.lock().unwrap();
        Self::evict_if_expired(&mut rooms, room_id);

        Ok(rooms.get(room_id).map(|entry| entry.messages.clone()))
    }

    #[instrument(skip(self))]
    async fn destroy(&self, room_id: &str) -> Result<bool, AppError> {
        let mut rooms = self.rooms.lock().unwrap();
        Self::evict_if_expired(&mut rooms, room_id);

        let removed = rooms.remove(room_id).is_some();
        if removed {
            info!(room_id = %room_id, "Room destroyed");
        } else {
            debug!(room_id = %room_id, "Destroy on absent room (no-op)");
        }

        Ok(removed)
    }
}
