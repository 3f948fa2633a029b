use super::event::{
    ChannelEvent, ChannelFactory, ChannelId, ChannelListener, ChannelMessage, ChannelState,
    EventChannel, RECOGNITION_EVENT,
};
use super::protocol::{self, EnginePacket, SocketFrame, SocketPacket, DEFAULT_NAMESPACE};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Websocket endpoint of the backend's Socket.IO server
pub fn socket_url(origin: &Url, path: &str) -> Result<Url> {
    let mut url = origin.clone();
    let scheme = match origin.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => bail!("Unsupported origin scheme for event channel: {}", other),
    };
    if url.set_scheme(scheme).is_err() {
        bail!("Cannot derive websocket URL from {}", origin);
    }

    url.set_path(&format!("/{}/", path.trim_matches('/')));
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", "4")
        .append_pair("transport", "websocket");
    Ok(url)
}

/// Socket.IO client bound to the websocket transport
pub struct SocketChannel {
    id: ChannelId,
    url: Url,
    stop_timeout: Duration,
    state: Arc<watch::Sender<ChannelState>>,
    cancel: CancellationToken,
    reader: Option<JoinHandle<()>>,
}

impl SocketChannel {
    pub fn new(id: ChannelId, url: Url, stop_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ChannelState::Disconnected);
        Self {
            id,
            url,
            stop_timeout,
            state: Arc::new(state),
            cancel: CancellationToken::new(),
            reader: None,
        }
    }
}

#[async_trait]
impl EventChannel for SocketChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    fn connect(&mut self, listener: ChannelListener) {
        if self.reader.is_some() {
            warn!("{} already connected, ignoring connect", self.id);
            return;
        }
        if self.cancel.is_cancelled() {
            warn!("{} was disconnected and cannot be reused", self.id);
            return;
        }

        info!("{} connecting to {}", self.id, self.url);
        self.state.send_replace(ChannelState::Connecting);

        let reader = Reader {
            id: self.id,
            listener,
            state: Arc::clone(&self.state),
            cancel: self.cancel.clone(),
        };
        self.reader = Some(tokio::spawn(reader.run(self.url.clone())));
    }

    async fn disconnect(&mut self) {
        // Cancelling first detaches the listener before the transport closes.
        self.cancel.cancel();

        if let Some(mut task) = self.reader.take() {
            match tokio::time::timeout(self.stop_timeout, &mut task).await {
                Ok(Err(e)) if e.is_panic() => error!("{} reader panicked: {}", self.id, e),
                Ok(_) => {}
                Err(_) => {
                    warn!("{} did not close in time, aborting", self.id);
                    task.abort();
                }
            }
            info!("{} disconnected", self.id);
        }

        self.state.send_replace(ChannelState::Disconnected);
    }
}

impl Drop for SocketChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum Flow {
    Continue,
    Stop,
}

/// Background task owning the websocket
struct Reader {
    id: ChannelId,
    listener: ChannelListener,
    state: Arc<watch::Sender<ChannelState>>,
    cancel: CancellationToken,
}

impl Reader {
    async fn run(self, url: Url) {
        let connected = tokio::select! {
            _ = self.cancel.cancelled() => return,
            res = connect_async(url.as_str()) => res,
        };

        let ws = match connected {
            Ok((ws, _)) => ws,
            Err(e) => {
                error!("{} failed to connect: {}", self.id, e);
                self.state.send_replace(ChannelState::Errored);
                self.emit(ChannelEvent::ConnectError(e.to_string()));
                return;
            }
        };
        debug!("{} websocket open", self.id);

        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = sink.send(Message::Text(protocol::disconnect_request())).await;
                    let _ = sink.close().await;
                    break;
                }
                msg = stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        let mut replies = Vec::new();
                        let flow = self.handle_text(&text, &mut replies);
                        for reply in replies {
                            if let Err(e) = sink.send(Message::Text(reply)).await {
                                warn!("{} failed to send: {}", self.id, e);
                            }
                        }
                        if let Flow::Stop = flow {
                            let _ = sink.close().await;
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("{} closed by server", self.id);
                        self.lost();
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("{} transport error: {}", self.id, e);
                        self.lost();
                        break;
                    }
                },
            }
        }

        debug!("{} reader stopped", self.id);
    }

    fn handle_text(&self, text: &str, replies: &mut Vec<String>) -> Flow {
        let packet = match EnginePacket::parse(text) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("{} ignoring transport packet {:?}: {}", self.id, text, e);
                return Flow::Continue;
            }
        };

        match packet {
            EnginePacket::Open(handshake) => {
                debug!("{} handshake {}", self.id, handshake);
                replies.push(protocol::connect_request());
            }
            EnginePacket::Ping(data) => replies.push(EnginePacket::Pong(data).encode()),
            EnginePacket::Message(body) => return self.handle_socket_packet(&body),
            EnginePacket::Close => {
                info!("{} closed by server", self.id);
                self.lost();
                return Flow::Stop;
            }
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
        }

        Flow::Continue
    }

    fn handle_socket_packet(&self, body: &str) -> Flow {
        let frame = match SocketFrame::parse(body) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("{} ignoring packet {:?}: {}", self.id, body, e);
                return Flow::Continue;
            }
        };
        if frame.namespace != DEFAULT_NAMESPACE {
            debug!("{} ignoring packet for namespace {}", self.id, frame.namespace);
            return Flow::Continue;
        }

        match frame.packet {
            SocketPacket::Connect(_) => {
                info!("{} connected", self.id);
                self.state.send_replace(ChannelState::Connected);
                self.emit(ChannelEvent::Connected);
            }
            SocketPacket::ConnectError(message) => {
                error!("{} connection refused: {}", self.id, message);
                self.state.send_replace(ChannelState::Errored);
                self.emit(ChannelEvent::ConnectError(message));
                return Flow::Stop;
            }
            SocketPacket::Disconnect => {
                info!("{} disconnected by server", self.id);
                self.lost();
                return Flow::Stop;
            }
            SocketPacket::Event { name, data } if name == RECOGNITION_EVENT => {
                self.emit(ChannelEvent::Recognition(data));
            }
            SocketPacket::Event { name, data } => {
                self.emit(ChannelEvent::Notice {
                    event: name,
                    payload: data,
                });
            }
            SocketPacket::Ack { .. } => {}
        }

        Flow::Continue
    }

    fn lost(&self) {
        let was = self.state.send_replace(ChannelState::Disconnected);
        if was == ChannelState::Connecting {
            self.state.send_replace(ChannelState::Errored);
            self.emit(ChannelEvent::ConnectError(
                "connection closed during handshake".to_string(),
            ));
        } else {
            self.emit(ChannelEvent::Disconnected);
        }
    }

    fn emit(&self, event: ChannelEvent) {
        if self.cancel.is_cancelled() {
            return;
        }
        let message = ChannelMessage {
            channel: self.id,
            event,
        };
        if self.listener.send(message).is_err() {
            debug!("{} listener gone", self.id);
        }
    }
}

/// Creates [`SocketChannel`]s against one backend
pub struct SocketChannelFactory {
    url: Url,
    stop_timeout: Duration,
}

impl SocketChannelFactory {
    pub fn new(origin: &Url, path: &str, stop_timeout: Duration) -> Result<Self> {
        let url = socket_url(origin, path).context("Failed to build event channel URL")?;
        Ok(Self { url, stop_timeout })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl ChannelFactory for SocketChannelFactory {
    fn create(&self, id: ChannelId) -> Box<dyn EventChannel> {
        Box::new(SocketChannel::new(id, self.url.clone(), self.stop_timeout))
    }
}
