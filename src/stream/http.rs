use super::locator::{LocatorMinter, StreamLocator};
use crate::error::StreamError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Control plane of the remote video feed
#[async_trait]
pub trait StreamControl: Send + Sync {
    /// Ask the backend to start the feed; only a confirmed start is `Ok`
    async fn request_start(&self) -> Result<(), StreamError>;

    async fn request_stop(&self) -> Result<(), StreamError>;

    /// A locator for the feed, unique to this call
    fn feed_locator(&self) -> StreamLocator;
}

/// Body returned by the feed-control endpoints
#[derive(Debug, Deserialize)]
struct FeedStatus {
    status: String,
}

/// [`StreamControl`] over the backend's HTTP endpoints
pub struct HttpStreamResource {
    client: Client,
    start_url: Url,
    stop_url: Url,
    minter: LocatorMinter,
}

impl HttpStreamResource {
    pub fn new(origin: &Url, timeout: Duration) -> Result<Self, StreamError> {
        // Treat the origin as a directory so "/api" keeps its last segment
        let mut base = origin.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let join = |path: &str| {
            base.join(path).map_err(|_| StreamError::InvalidOrigin {
                origin: origin.to_string(),
            })
        };

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            start_url: join("start_video_feed")?,
            stop_url: join("stop_video_feed")?,
            minter: LocatorMinter::new(join("video_feed")?),
        })
    }

    async fn post(&self, url: &Url) -> Result<(), StreamError> {
        let response = self.client.post(url.clone()).send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            warn!("{} answered {}", url.path(), status);
            return Err(StreamError::Status {
                status: status.as_u16(),
            });
        }

        // The body is informational ("started", "already started", ...)
        match response.json::<FeedStatus>().await {
            Ok(body) => info!("{} -> {}", url.path(), body.status),
            Err(e) => warn!("{} returned an unexpected body: {}", url.path(), e),
        }

        Ok(())
    }
}

#[async_trait]
impl StreamControl for HttpStreamResource {
    async fn request_start(&self) -> Result<(), StreamError> {
        info!("Requesting video feed start");
        self.post(&self.start_url).await
    }

    async fn request_stop(&self) -> Result<(), StreamError> {
        info!("Requesting video feed stop");
        self.post(&self.stop_url).await
    }

    fn feed_locator(&self) -> StreamLocator {
        self.minter.mint()
    }
}
