// Public API - what other modules can use
pub use handlers::join_room;
pub use service::{Admission, GatewayService};
pub use types::{AdmissionStatus, AdmitResponse};

// Internal modules
mod agents;
mod handlers;
mod service;
mod token;
mod types;
