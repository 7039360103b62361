use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::events::RoomEvent;

/// Buffered events per room channel before slow subscribers start lagging
const CHANNEL_CAPACITY: usize = 100;

/// Pub/sub fanout that delivers room events to currently-connected
/// subscribers
///
/// Delivery is best-effort and unreplayed: publishing to a room nobody
/// is subscribed to drops the event, and a fresh subscription starts
/// with no backlog. Per subscriber, events for one room arrive in
/// publish order.
#[derive(Debug, Clone)]
pub struct EventRelay {
    /// Room-specific event channels: room_id -> sender
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<RoomEvent>>>>,
}

impl EventRelay {
    /// Creates a new relay with no channels
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publishes an event to all current subscribers of a room's channel.
    /// Fire-and-forget: a missing channel or an empty subscriber set is
    /// logged, never surfaced to the caller.
    pub async fn publish(&self, room_id: &str, event: RoomEvent) {
        let channels = self.channels.read().await;

        match channels.get(room_id) {
            Some(sender) => match sender.send(event) {
                Ok(receiver_count) => {
                    debug!(
                        room_id = %room_id,
                        receivers = receiver_count,
                        "Room event published"
                    );
                }
                Err(_) => {
                    debug!(room_id = %room_id, "Room event published with no receivers");
                }
            },
            None => {
                debug!(room_id = %room_id, "No subscribers for room - event dropped");
            }
        }
    }

    /// Subscribe to events for a specific room. The stream lives for the
    /// duration of the caller's connection and is not restartable.
    pub async fn subscribe(&self, room_id: &str) -> broadcast::Receiver<RoomEvent> {
        let mut channels = self.channels.write().await;

        channels
            .entry(room_id.to_string())
            .or_insert_with(|| {
                debug!(room_id = %room_id, "Creating room channel");
                broadcast::channel(CHANNEL_CAPACITY).0
            })
            .subscribe()
    }

    /// Drops a room's channel so subscriber streams terminate after the
    /// events already in flight
    pub async fn close_room(&self, room_id: &str) {
        let mut channels = self.channels.write().await;

        if channels.remove(room_id).is_some() {
            debug!(room_id = %room_id, "Room channel closed");
        }
    }
}

impl Default for EventRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    fn message_added(room_id: &str) -> RoomEvent {
        RoomEvent::MessageAdded {
            room_id: room_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let relay = EventRelay::new();
        let mut receiver = relay.subscribe("room-1").await;

        relay.publish("room-1", message_added("room-1")).await;

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.room_id(), "room-1");
    }

    #[tokio::test]
    async fn test_publish_order_preserved_per_subscriber() {
        let relay = EventRelay::new();
        let mut receiver = relay.subscribe("room-1").await;

        relay.publish("room-1", message_added("room-1")).await;
        relay
            .publish(
                "room-1",
                RoomEvent::RoomDestroyed {
                    room_id: "room-1".to_string(),
                },
            )
            .await;

        assert!(matches!(
            receiver.recv().await.unwrap(),
            RoomEvent::MessageAdded { .. }
        ));
        assert!(matches!(
            receiver.recv().await.unwrap(),
            RoomEvent::RoomDestroyed { .. }
        ));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let relay = EventRelay::new();

        // Neither call may panic or error
        relay.publish("room-1", message_added("room-1")).await;
        relay.publish("room-1", message_added("room-1")).await;
    }

    #[tokio::test]
    async fn test_no_backlog_for_late_subscriber() {
        let relay = EventRelay::new();

        let _early = relay.subscribe("room-1").await;
        relay.publish("room-1", message_added("room-1")).await;

        let mut late = relay.subscribe("room-1").await;
        assert!(matches!(late.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let relay = EventRelay::new();
        let mut other = relay.subscribe("room-2").await;

        let _subscriber = relay.subscribe("room-1").await;
        relay.publish("room-1", message_added("room-1")).await;

        assert!(matches!(other.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_close_room_terminates_streams() {
        let relay = EventRelay::new();
        let mut receiver = relay.subscribe("room-1").await;

        relay
            .publish(
                "room-1",
                RoomEvent::RoomDestroyed {
                    room_id: "room-1".to_string(),
                },
            )
            .await;
        relay.close_room("room-1").await;

        // The in-flight event is still delivered, then the stream ends
        assert!(matches!(
            receiver.recv().await.unwrap(),
            RoomEvent::RoomDestroyed { .. }
        ));
        assert!(matches!(receiver.recv().await, Err(RecvError::Closed)));
    }

    #[tokio::test]
    async fn test_close_unknown_room_is_noop() {
        let relay = EventRelay::new();
        relay.close_room("never-existed").await;
    }
}
