use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Event name carrying recognized identities
pub const RECOGNITION_EVENT: &str = "persons_recognized";

/// Identifies one channel instance for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Errored,
}

/// Lifecycle notifications and application messages from the backend
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    ConnectError(String),
    Disconnected,
    /// Raw `persons_recognized` payload, validated by the consumer
    Recognition(serde_json::Value),
    /// Any other server event
    Notice {
        event: String,
        payload: serde_json::Value,
    },
}

/// An event tagged with the channel that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMessage {
    pub channel: ChannelId,
    pub event: ChannelEvent,
}

pub type ChannelListener = mpsc::UnboundedSender<ChannelMessage>;

/// A persistent duplex connection delivering backend-pushed events.
///
/// Events of one instance reach the listener in the order the backend sent
/// them. After `disconnect` returns, nothing more is delivered.
#[async_trait]
pub trait EventChannel: Send + Sync {
    fn id(&self) -> ChannelId;

    fn state(&self) -> ChannelState;

    /// Start connecting in the background; a failure is reported once as
    /// [`ChannelEvent::ConnectError`] and never retried.
    fn connect(&mut self, listener: ChannelListener);

    /// Detach the listener, then close the transport. Safe to call twice.
    async fn disconnect(&mut self);
}

pub trait ChannelFactory: Send + Sync {
    fn create(&self, id: ChannelId) -> Box<dyn EventChannel>;
}
