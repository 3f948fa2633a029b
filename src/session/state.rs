use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of the single monitoring session.
///
/// `Starting` and `Stopping` are the busy states: no transition other than
/// finishing the pending one is admitted while in them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Starting,
    Streaming,
    Stopping,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot {action} while {from:?}")]
pub struct TransitionError {
    pub from: SessionState,
    pub action: &'static str,
}

impl SessionState {
    pub fn is_busy(self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Stopping)
    }

    pub fn begin_start(self) -> Result<Self, TransitionError> {
        match self {
            SessionState::Idle => Ok(SessionState::Starting),
            from => Err(TransitionError { from, action: "start" }),
        }
    }

    /// `confirmed` is whether the backend accepted the feed start
    pub fn finish_start(self, confirmed: bool) -> Result<Self, TransitionError> {
        match (self, confirmed) {
            (SessionState::Starting, true) => Ok(SessionState::Streaming),
            (SessionState::Starting, false) => Ok(SessionState::Idle),
            (from, _) => Err(TransitionError {
                from,
                action: "finish start",
            }),
        }
    }

    pub fn begin_stop(self) -> Result<Self, TransitionError> {
        match self {
            SessionState::Streaming => Ok(SessionState::Stopping),
            from => Err(TransitionError { from, action: "stop" }),
        }
    }

    pub fn finish_stop(self) -> Result<Self, TransitionError> {
        match self {
            SessionState::Stopping => Ok(SessionState::Idle),
            from => Err(TransitionError {
                from,
                action: "finish stop",
            }),
        }
    }
}
