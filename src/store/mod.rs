// Public API - what other modules can use
pub use self::redis::RedisRoomStore;
pub use repository::{InMemoryRoomStore, JoinOutcome, RoomStore};

// Internal modules
pub mod models;
mod redis;
mod repository;
