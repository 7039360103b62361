// Public API - what other modules can use
pub use handler::subscribe;

// Internal modules
mod handler;
