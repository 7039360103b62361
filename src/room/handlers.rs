use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    service::RoomService,
    types::{
        CreateRoomRequest, MessagesResponse, PostMessageRequest, RoomCreatedResponse, RoomQuery,
        TtlResponse,
    },
};
use crate::shared::{AppError, AppState};
use crate::store::models::MessageModel;

/// HTTP handler for creating a new room
///
/// POST /room
/// Body may carry a ttlSecs override; the configured default applies
/// otherwise.
#[instrument(name = "create_room", skip(state, request))]
pub async fn create_room(
    State(state): State<AppState>,
    request: Option<Json<CreateRoomRequest>>,
) -> Result<Json<RoomCreatedResponse>, AppError> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    let ttl = state.rooms.effective_ttl(request.ttl_secs);

    let service = RoomService::new(Arc::clone(&state.store), state.relay.clone());
    let room = service.create_room(ttl).await?;

    info!(room_id = %room.id, "Room created via API");

    Ok(Json(RoomCreatedResponse {
        room_id: room.id,
        ttl: ttl.as_secs(),
    }))
}

/// HTTP handler for reading a room's remaining lifetime
///
/// GET /room/ttl?roomId=<id>
#[instrument(name = "get_ttl", skip(state))]
pub async fn get_ttl(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
) -> Result<Json<TtlResponse>, AppError> {
    let service = RoomService::new(Arc::clone(&state.store), state.relay.clone());
    let ttl = service.get_ttl(&query.room_id).await?;

    Ok(Json(TtlResponse {
        ttl: ttl.as_secs(),
    }))
}

/// HTTP handler for listing a room's messages in creation order
///
/// GET /messages?roomId=<id>
#[instrument(name = "list_messages", skip(state))]
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
) -> Result<Json<MessagesResponse>, AppError> {
    let service = RoomService::new(Arc::clone(&state.store), state.relay.clone());
    let messages = service.list_messages(&query.room_id).await?;

    Ok(Json(MessagesResponse { messages }))
}

/// HTTP handler for posting a message
///
/// POST /messages?roomId=<id>
/// Returns the stored message and hints current subscribers to re-fetch.
#[instrument(name = "post_message", skip(state, request))]
pub async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
    Json(request): Json<PostMessageRequest>,
) -> Result<Json<MessageModel>, AppError> {
    let service = RoomService::new(Arc::clone(&state.store), state.relay.clone());
    let message = service
        .post_message(&query.room_id, &request.sender, &request.text)
        .await?;

    Ok(Json(message))
}

/// HTTP handler for destroying a room
///
/// DELETE /room?roomId=<id>
/// Idempotent: repeat calls succeed silently.
#[instrument(name = "destroy_room", skip(state))]
pub async fn destroy_room(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
) -> Result<StatusCode, AppError> {
    let service = RoomService::new(Arc::clone(&state.store), state.relay.clone());
    service.destroy_room(&query.room_id).await?;

    Ok(StatusCode::OK)
}
