use super::state::SessionState;
use crate::channel::ChannelState;
use crate::stream::StreamLocator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the session for status queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SessionState,

    /// Identifier of the current activation, set once the backend confirms it
    pub session_id: Option<String>,

    /// When the current activation was confirmed
    pub started_at: Option<DateTime<Utc>>,

    /// Published feed locator, present only while streaming
    pub locator: Option<StreamLocator>,

    /// State of the held event channel, if any
    pub channel: Option<ChannelState>,

    /// Names already announced
    pub spoken_names: Vec<String>,

    /// Most recent user-visible failures, oldest first
    pub recent_alerts: Vec<AlertRecord>,
}

/// A user-visible failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub message: String,
    pub raised_at: DateTime<Utc>,
}
