use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use burnroom::room::RoomConfig;
use burnroom::shared::AppState;
use burnroom::store::{InMemoryRoomStore, RedisRoomStore, RoomStore};
use burnroom::EventRelay;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "burnroom=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting burnroom server");

    // Redis carries room expiry natively in production; the in-memory
    // store covers local development.
    let store: Arc<dyn RoomStore + Send + Sync> = match std::env::var("REDIS_URL") {
        Ok(url) => Arc::new(
            RedisRoomStore::connect(&url)
                .await
                .expect("Failed to connect to Redis"),
        ),
        Err(_) => {
            info!("REDIS_URL not set - using in-memory room store");
            Arc::new(InMemoryRoomStore::new())
        }
    };

    let app_state = AppState::new(store, EventRelay::new(), RoomConfig::from_env());
    let app = burnroom::router(app_state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app).await.unwrap();
}
