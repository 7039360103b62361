// Public API - what other modules can use
pub use handlers::{create_room, destroy_room, get_ttl, list_messages, post_message};
pub use service::{RoomConfig, RoomService};

// Internal modules
mod handlers;
pub mod service;
pub mod types;
