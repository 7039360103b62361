// Event-driven notification components
//
// The relay tells currently-connected clients that something happened to
// their room; the room API remains the source of truth they re-fetch from.

// Public API - what other modules can use
pub use bus::EventRelay;
pub use events::{EventKind, RoomEvent};

// Internal modules
mod bus;
mod events;
