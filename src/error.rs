//! Error types for the session controller.
//!
//! Every variant is handled at the boundary where it occurs. Nothing here is
//! meant to travel up a call chain: user-visible failures are handed to an
//! [`AlertSink`](crate::session::AlertSink), the rest are logged.

use thiserror::Error;

/// Failure talking to the backend's feed-control endpoints
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("backend answered with status {status}")]
    Status { status: u16 },

    #[error("request failed: {message}")]
    Transport { message: String },

    #[error("invalid backend origin: {origin}")]
    InvalidOrigin { origin: String },
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        StreamError::Transport {
            message: err.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Could not connect to the recognition service: {message}")]
    ChannelConnect { message: String },

    #[error("Failed to start video feed: {0}")]
    StreamActivation(StreamError),

    #[error("Failed to stop video feed: {0}")]
    StreamDeactivation(StreamError),

    #[error("Malformed recognition payload: {reason}")]
    MalformedEventPayload { reason: String },
}

impl SessionError {
    /// Whether the error is shown to the user or only logged
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, SessionError::MalformedEventPayload { .. })
    }
}
