pub mod jobs;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod router;
pub mod state;
pub mod ws_handler;

// Re-export what the binary wires together.
pub use router::create_router;
