// Socket.IO event channel against a local stand-in backend.

mod common;

use anyhow::{Context, Result};
use common::backend::{event_frame, MockBackend};
use presence_announcer::channel::{
    ChannelEvent, ChannelFactory, ChannelId, ChannelMessage, ChannelState, EventChannel,
    SocketChannelFactory,
};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

fn factory(addr: SocketAddr) -> Result<SocketChannelFactory> {
    let origin = Url::parse(&format!("http://{}", addr))?;
    SocketChannelFactory::new(&origin, "socket.io", Duration::from_secs(1))
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<ChannelMessage>) -> Result<ChannelMessage> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .context("timed out waiting for channel event")?
        .context("listener closed")
}

#[tokio::test]
async fn test_connect_and_receive_recognition() -> Result<()> {
    let backend = MockBackend::new(vec![
        event_frame("response", json!({ "message": "Connected" })),
        event_frame("persons_recognized", json!({ "names": ["Ada", "Grace"] })),
    ]);
    let addr = backend.spawn().await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut channel = factory(addr)?.create(ChannelId(7));
    channel.connect(tx);

    let first = next_event(&mut rx).await?;
    assert_eq!(first.channel, ChannelId(7));
    assert_eq!(first.event, ChannelEvent::Connected);
    assert_eq!(channel.state(), ChannelState::Connected);

    assert_eq!(
        next_event(&mut rx).await?.event,
        ChannelEvent::Notice {
            event: "response".to_string(),
            payload: json!({ "message": "Connected" }),
        }
    );
    assert_eq!(
        next_event(&mut rx).await?.event,
        ChannelEvent::Recognition(json!({ "names": ["Ada", "Grace"] }))
    );

    channel.disconnect().await;
    assert_eq!(channel.state(), ChannelState::Disconnected);

    // Handshake, pong for the server ping, then the namespace disconnect
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.received(), vec!["40", "3", "41"]);

    // Nothing is delivered after disconnect
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_refused_namespace_reports_connect_error() -> Result<()> {
    let mut backend = MockBackend::new(Vec::new());
    backend.refuse = true;
    let addr = backend.spawn().await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut channel = factory(addr)?.create(ChannelId(1));
    channel.connect(tx);

    assert_eq!(
        next_event(&mut rx).await?.event,
        ChannelEvent::ConnectError("Not authorized".to_string())
    );
    assert_eq!(channel.state(), ChannelState::Errored);

    channel.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_unreachable_backend_reports_connect_error_once() -> Result<()> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut channel = factory(addr)?.create(ChannelId(1));
    channel.connect(tx);

    let event = next_event(&mut rx).await?.event;
    assert!(matches!(event, ChannelEvent::ConnectError(_)), "{:?}", event);
    assert_eq!(channel.state(), ChannelState::Errored);

    // No retry follows
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());

    channel.disconnect().await;
    assert_eq!(channel.state(), ChannelState::Disconnected);
    Ok(())
}

#[tokio::test]
async fn test_disconnect_twice_is_harmless() -> Result<()> {
    let backend = MockBackend::new(Vec::new());
    let addr = backend.spawn().await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut channel = factory(addr)?.create(ChannelId(3));
    channel.connect(tx);
    assert_eq!(next_event(&mut rx).await?.event, ChannelEvent::Connected);

    channel.disconnect().await;
    channel.disconnect().await;
    assert_eq!(channel.state(), ChannelState::Disconnected);
    Ok(())
}
