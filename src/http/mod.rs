//! HTTP API for controlling the monitoring session
//!
//! This module stands in for the start/stop/reset buttons:
//! - POST /session/start - Open the event channel and start the feed
//! - POST /session/stop - Stop the feed and close the event channel
//! - POST /announcements/reset - Greet everyone again
//! - GET /session/status - Query session status
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
