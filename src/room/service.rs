use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::event::{EventRelay, RoomEvent};
use crate::shared::AppError;
use crate::store::models::{MessageModel, RoomModel};
use crate::store::RoomStore;

/// Default lifetime for new rooms when the caller does not pick one
const DEFAULT_TTL_SECS: u64 = 600;

/// Ceiling on caller-requested lifetimes
const MAX_TTL_SECS: u64 = 24 * 60 * 60;

/// Room lifetime configuration
#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub default_ttl: Duration,
    pub max_ttl: Duration,
}

impl RoomConfig {
    /// Reads the configuration from the environment, falling back to the
    /// built-in defaults
    pub fn from_env() -> Self {
        let default_secs = std::env::var("ROOM_TTL_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_TTL_SECS);
        let max_secs = std::env::var("ROOM_MAX_TTL_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(MAX_TTL_SECS);

        Self {
            default_ttl: Duration::from_secs(default_secs.min(max_secs)),
            max_ttl: Duration::from_secs(max_secs),
        }
    }

    /// Resolves a caller-requested lifetime against the defaults and cap
    pub fn effective_ttl(&self, requested_secs: Option<u64>) -> Duration {
        requested_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_ttl)
            .min(self.max_ttl)
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            max_ttl: Duration::from_secs(MAX_TTL_SECS),
        }
    }
}

/// Service for room lifecycle and messaging
///
/// The only component the transport layer talks to. State lives in the
/// store; the relay is notified after the store has committed, and a
/// notification that cannot be delivered never fails the operation that
/// triggered it.
pub struct RoomService {
    store: Arc<dyn RoomStore + Send + Sync>,
    relay: EventRelay,
}

impl RoomService {
    pub fn new(store: Arc<dyn RoomStore + Send + Sync>, relay: EventRelay) -> Self {
        Self { store, relay }
    }

    /// Creates a new room that will self-destruct after `ttl`
    #[instrument(skip(self))]
    pub async fn create_room(&self, ttl: Duration) -> Result<RoomModel, AppError> {
        let room = RoomModel::new();
        self.store.create_room(&room, ttl).await?;

        info!(
            room_id = %room.id,
            ttl_secs = ttl.as_secs(),
            "Room created"
        );

        Ok(room)
    }

    /// Seconds until the room self-destructs
    #[instrument(skip(self))]
    pub async fn get_ttl(&self, room_id: &str) -> Result<Duration, AppError> {
        self.store
            .remaining_ttl(room_id)
            .await?
            .ok_or(AppError::RoomNotFound)
    }

    /// Appends a message and hints current subscribers to re-fetch
    #[instrument(skip(self, sender, text))]
    pub async fn post_message(
        &self,
        room_id: &str,
        sender: &str,
        text: &str,
    ) -> Result<MessageModel, AppError> {
        let message = self
            .store
            .append_message(room_id, sender, text)
            .await?
            .ok_or(AppError::RoomNotFound)?;

        // Persistence is authoritative; the publish is advisory and its
        // failure stays inside the relay.
        self.relay
            .publish(
                room_id,
                RoomEvent::MessageAdded {
                    room_id: room_id.to_string(),
                },
            )
            .await;

        debug!(
            room_id = %room_id,
            message_id = message.id,
            "Message posted"
        );

        Ok(message)
    }

    /// Messages in creation order
    #[instrument(skip(self))]
    pub async fn list_messages(&self, room_id: &str) -> Result<Vec<MessageModel>, AppError> {
        self.store
            .list_messages(room_id)
            .await?
            .ok_or(AppError::RoomNotFound)
    }

    /// Destroys the room and its history. Idempotent: destroying an
    /// absent room succeeds silently, and only an actual removal
    /// publishes the destroyed notification.
    #[instrument(skip(self))]
    pub async fn destroy_room(&self, room_id: &str) -> Result<(), AppError> {
        let removed = self.store.destroy(room_id).await?;

        if removed {
            self.relay
                .publish(
                    room_id,
                    RoomEvent::RoomDestroyed {
                        room_id: room_id.to_string(),
                    },
                )
                .await;
            self.relay.close_room(room_id).await;

            info!(room_id = %room_id, "Room destroyed");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRoomStore;

    fn service() -> (Arc<InMemoryRoomStore>, EventRelay, RoomService) {
        let store = Arc::new(InMemoryRoomStore::new());
        let relay = EventRelay::new();
        let service = RoomService::new(store.clone(), relay.clone());
        (store, relay, service)
    }

    #[tokio::test]
    async fn test_create_room_and_read_ttl() {
        let (_store, _relay, service) = service();

        let room = service.create_room(Duration::from_secs(300)).await.unwrap();

        let ttl = service.get_ttl(&room.id).await.unwrap();
        assert!(ttl <= Duration::from_secs(300));
        assert!(ttl > Duration::from_secs(290));
    }

    #[tokio::test]
    async fn test_get_ttl_missing_room() {
        let (_store, _relay, service) = service();

        let result = service.get_ttl("nonexistent-room").await;
        assert!(matches!(result, Err(AppError::RoomNotFound)));
    }

    #[tokio::test]
    async fn test_post_message_round_trip() {
        let (_store, _relay, service) = service();
        let room = service.create_room(Duration::from_secs(300)).await.unwrap();

        let stored = service
            .post_message(&room.id, "anonymous-Lion-a1b2c", "hi")
            .await
            .unwrap();
        assert_eq!(stored.sender, "anonymous-Lion-a1b2c");
        assert_eq!(stored.text, "hi");

        let messages = service.list_messages(&room.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, "anonymous-Lion-a1b2c");
        assert_eq!(messages[0].text, "hi");
    }

    #[tokio::test]
    async fn test_post_message_publishes_hint() {
        let (_store, relay, service) = service();
        let room = service.create_room(Duration::from_secs(300)).await.unwrap();

        let mut receiver = relay.subscribe(&room.id).await;
        service.post_message(&room.id, "alice", "hi").await.unwrap();

        let event = receiver.recv().await.unwrap();
        assert!(matches!(event, RoomEvent::MessageAdded { .. }));
        assert_eq!(event.room_id(), room.id);
    }

    #[tokio::test]
    async fn test_post_message_missing_room() {
        let (_store, _relay, service) = service();

        let result = service.post_message("nonexistent-room", "alice", "hi").await;
        assert!(matches!(result, Err(AppError::RoomNotFound)));
    }

    #[tokio::test]
    async fn test_list_messages_in_post_order() {
        let (_store, _relay, service) = service();
        let room = service.create_room(Duration::from_secs(300)).await.unwrap();

        for i in 0..5 {
            service
                .post_message(&room.id, "alice", &format!("message {}", i))
                .await
                .unwrap();
        }

        let messages = service.list_messages(&room.id).await.unwrap();
        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "message 0",
                "message 1",
                "message 2",
                "message 3",
                "message 4"
            ]
        );
    }

    #[tokio::test]
    async fn test_destroy_room_publishes_and_closes() {
        let (_store, relay, service) = service();
        let room = service.create_room(Duration::from_secs(300)).await.unwrap();

        let mut receiver = relay.subscribe(&room.id).await;
        service.destroy_room(&room.id).await.unwrap();

        assert!(matches!(
            receiver.recv().await.unwrap(),
            RoomEvent::RoomDestroyed { .. }
        ));
        assert!(receiver.recv().await.is_err());

        let result = service.get_ttl(&room.id).await;
        assert!(matches!(result, Err(AppError::RoomNotFound)));
    }

    #[tokio::test]
    async fn test_destroy_room_is_idempotent() {
        let (_store, relay, service) = service();
        let room = service.create_room(Duration::from_secs(300)).await.unwrap();

        service.destroy_room(&room.id).await.unwrap();

        // The second destroy succeeds silently and publishes nothing
        let mut receiver = relay.subscribe(&room.id).await;
        service.destroy_room(&room.id).await.unwrap();
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.default_ttl, Duration::from_secs(600));
        assert_eq!(config.max_ttl, Duration::from_secs(86400));
    }

    #[test]
    fn test_effective_ttl_resolution() {
        let config = RoomConfig::default();

        assert_eq!(config.effective_ttl(None), Duration::from_secs(600));
        assert_eq!(config.effective_ttl(Some(300)), Duration::from_secs(300));
        // Requests beyond the ceiling are capped, not rejected
        assert_eq!(config.effective_ttl(Some(u64::MAX)), config.max_ttl);
    }
}
