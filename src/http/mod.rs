//! HTTP API for driving and observing sessions
//!
//! - POST /sessions - Create a session and connect it
//! - POST /sessions/:id/chunks - Send one audio chunk (raw body)
//! - POST /sessions/:id/finalize - Wait for outstanding results, then disconnect
//! - GET /sessions/:id/status - Observable session state
//! - GET /sessions/:id/transcript - Transcript fragments received so far
//! - DELETE /sessions/:id - Tear the session down
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
