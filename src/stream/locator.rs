use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

/// Address of an activated feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamLocator {
    pub url: String,
    /// Cache-busting token, milliseconds since the epoch
    pub token: u64,
}

/// Mints locators whose tokens strictly increase, even within one millisecond
#[derive(Debug)]
pub struct LocatorMinter {
    feed_url: Url,
    last_token: AtomicU64,
}

impl LocatorMinter {
    pub fn new(feed_url: Url) -> Self {
        Self {
            feed_url,
            last_token: AtomicU64::new(0),
        }
    }

    pub fn mint(&self) -> StreamLocator {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut last = self.last_token.load(Ordering::SeqCst);
        let token = loop {
            let candidate = now.max(last + 1);
            match self.last_token.compare_exchange(
                last,
                candidate,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break candidate,
                Err(current) => last = current,
            }
        };

        let mut url = self.feed_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("_", &token.to_string());

        StreamLocator {
            url: url.into(),
            token,
        }
    }
}
