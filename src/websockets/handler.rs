use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, instrument, warn};

use crate::room::types::RoomQuery;
use crate::shared::{AppError, AppState};
use crate::store::RoomStore;

/// HTTP handler for the realtime channel
///
/// GET /subscribe?roomId=<id>
/// Upgrades to a WebSocket and pushes one JSON text frame per relay
/// event, e.g. {"event":"message-added"}. Events carry no payload; the
/// consumer re-fetches through the room API. The socket ends when the
/// room's channel closes or the client goes away.
#[instrument(name = "subscribe", skip(state, ws))]
pub async fn subscribe(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    // Reject before upgrading so a dead room link fails visibly
    state
        .store
        .get_meta(&query.room_id)
        .await?
        .ok_or(AppError::RoomNotFound)?;

    Ok(ws.on_upgrade(move |socket| relay_events(socket, state, query.room_id)))
}

/// Forwards relay events for one room onto one WebSocket until either
/// side goes away
async fn relay_events(socket: WebSocket, state: AppState, room_id: String) {
    let mut events = state.relay.subscribe(&room_id).await;
    let (mut sink, mut stream) = socket.split();

    info!(room_id = %room_id, "Subscriber attached");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let frame = json!({ "event": event.kind() }).to_string();
                    if sink.send(Message::Text(frame)).await.is_err() {
                        debug!(room_id = %room_id, "Subscriber connection lost");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // The subscriber only loses hints, not data - the
                    // message list is still one fetch away.
                    warn!(
                        room_id = %room_id,
                        skipped = skipped,
                        "Subscriber lagged behind relay"
                    );
                }
                Err(RecvError::Closed) => {
                    debug!(room_id = %room_id, "Room channel closed");
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                // Inbound frames are ignored; messages travel over the
                // room API, not the socket.
                Some(Ok(_)) => {}
                _ => {
                    debug!(room_id = %room_id, "Subscriber disconnected");
                    break;
                }
            }
        }
    }

    info!(room_id = %room_id, "Subscription ended");
}
