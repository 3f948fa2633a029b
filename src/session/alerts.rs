use super::status::AlertRecord;
use crate::error::SessionError;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{error, warn};

/// Presents failures to the user
pub trait AlertSink: Send + Sync {
    fn alert(&self, error: &SessionError);

    /// Recently raised alerts, oldest first
    fn recent(&self) -> Vec<AlertRecord> {
        Vec::new()
    }
}

/// Logs alerts and keeps the last few for the status API
pub struct AlertLog {
    capacity: usize,
    records: Mutex<VecDeque<AlertRecord>>,
}

impl AlertLog {
    pub const DEFAULT_CAPACITY: usize = 16;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Mutex::new(VecDeque::new()),
        }
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl AlertSink for AlertLog {
    fn alert(&self, err: &SessionError) {
        if !err.is_user_visible() {
            warn!("{}", err);
            return;
        }

        error!("ALERT: {}", err);

        let Ok(mut records) = self.records.lock() else {
            return;
        };
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(AlertRecord {
            message: err.to_string(),
            raised_at: Utc::now(),
        });
    }

    fn recent(&self) -> Vec<AlertRecord> {
        self.records
            .lock()
            .map(|records| records.iter().cloned().collect())
            .unwrap_or_default()
    }
}
