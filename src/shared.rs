use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::event::EventRelay;
use crate::room::service::RoomConfig;
use crate::store::RoomStore;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RoomStore + Send + Sync>,
    pub relay: EventRelay,
    pub rooms: RoomConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RoomStore + Send + Sync>,
        relay: EventRelay,
        rooms: RoomConfig,
    ) -> Self {
        Self {
            store,
            relay,
            rooms,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Room never existed, has expired, or was destroyed - indistinguishable to callers
    #[error("Room not found")]
    RoomNotFound,

    /// Both participant slots are already occupied
    #[error("Room is full")]
    RoomFull,

    /// Backing store unreachable - a transient infrastructure failure,
    /// never to be conflated with RoomNotFound
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = match self {
            AppError::RoomNotFound => (StatusCode::NOT_FOUND, "room-not-found"),
            AppError::RoomFull => (StatusCode::CONFLICT, "room-full"),
            AppError::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "store-unavailable"),
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal-error"),
        };

        let body = Json(json!({
            "error": error_code
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::store::InMemoryRoomStore;

    /// Builder for creating AppState with overrides for testing
    pub struct AppStateBuilder {
        store: Option<Arc<dyn RoomStore + Send + Sync>>,
        relay: Option<EventRelay>,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                store: None,
                relay: None,
            }
        }

        pub fn with_store(mut self, store: Arc<dyn RoomStore + Send + Sync>) -> Self {
            self.store = Some(store);
            self
        }

        pub fn with_relay(mut self, relay: EventRelay) -> Self {
            self.relay = Some(relay);
            self
        }

        pub fn build(self) -> AppState {
            AppState {
                store: self
                    .store
                    .unwrap_or_else(|| Arc::new(InMemoryRoomStore::new())),
                relay: self.relay.unwrap_or_default(),
                rooms: RoomConfig::default(),
            }
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
