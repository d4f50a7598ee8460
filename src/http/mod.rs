//! HTTP API for status and control
//!
//! - GET /health - Health check
//! - GET /status - Client snapshot (state, session, health, queue, counters)
//! - POST /recording/start - Start a session on the current connection
//! - POST /recording/stop - Stop the active session
//! - POST /connection/reconnect - Forced reconnect, also out of `failed`

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
