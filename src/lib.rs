// Library crate for the burnroom service
// This file exposes the public API for integration tests

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub mod event;
pub mod gateway;
pub mod room;
pub mod shared;
pub mod store;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use event::{EventKind, EventRelay, RoomEvent};
pub use gateway::{Admission, GatewayService};
pub use room::{RoomConfig, RoomService};
pub use shared::{AppError, AppState};
pub use store::{InMemoryRoomStore, JoinOutcome, RoomStore};

/// Builds the application router over the given state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/room",
            post(room::create_room).delete(room::destroy_room),
        )
        .route("/room/ttl", get(room::get_ttl))
        .route("/room/join", post(gateway::join_room))
        .route(
            "/messages",
            get(room::list_messages).post(room::post_message),
        )
        .route("/subscribe", get(websockets::subscribe))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
