//! Duplex event channel to the recognition backend
//!
//! This module provides:
//! - `EventChannel`: the lifecycle contract the session controller relies on
//! - `SocketChannel`: a Socket.IO client over a single websocket
//! - the Engine.IO / Socket.IO framing used on the wire

mod event;
pub mod protocol;
mod socket;

pub use event::{
    ChannelEvent, ChannelFactory, ChannelId, ChannelListener, ChannelMessage, ChannelState,
    EventChannel, RECOGNITION_EVENT,
};
pub use socket::{socket_url, SocketChannel, SocketChannelFactory};
