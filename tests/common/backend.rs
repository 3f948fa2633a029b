// A stand-in recognition backend: feed-control endpoints plus a minimal
// Socket.IO server on the websocket transport.

use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const OPEN: &str =
    r#"0{"sid":"eio-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

#[derive(Clone)]
pub struct MockBackend {
    /// Text frames received from clients, in order
    pub received: Arc<Mutex<Vec<String>>>,
    /// Frames pushed to a client after its namespace connect is accepted
    pub script: Arc<Vec<String>>,
    /// Answer namespace connects with CONNECT_ERROR
    pub refuse: bool,
    pub start_status: StatusCode,
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new(script: Vec<String>) -> Self {
        Self {
            received: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(script),
            refuse: false,
            start_status: StatusCode::OK,
            starts: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub async fn spawn(&self) -> Result<SocketAddr> {
        let router = Router::new()
            .route("/start_video_feed", post(start_feed))
            .route("/stop_video_feed", post(stop_feed))
            .route("/socket.io/", get(socket_io))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        Ok(addr)
    }
}

/// Frame for a server event in the default namespace
pub fn event_frame(name: &str, data: serde_json::Value) -> String {
    format!("42{}", json!([name, data]))
}

async fn start_feed(State(backend): State<MockBackend>) -> impl IntoResponse {
    backend.starts.fetch_add(1, Ordering::SeqCst);
    (backend.start_status, Json(json!({ "status": "started" })))
}

async fn stop_feed(State(backend): State<MockBackend>) -> impl IntoResponse {
    backend.stops.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "status": "stopped" }))
}

async fn socket_io(ws: WebSocketUpgrade, State(backend): State<MockBackend>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session(socket, backend))
}

async fn session(mut socket: WebSocket, backend: MockBackend) {
    if socket.send(Message::Text(OPEN.to_string())).await.is_err() {
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        backend.received.lock().unwrap().push(text.clone());

        match text.as_str() {
            "40" if backend.refuse => {
                let _ = socket
                    .send(Message::Text(r#"44{"message":"Not authorized"}"#.to_string()))
                    .await;
            }
            "40" => {
                let mut frames = vec![r#"40{"sid":"sio-1"}"#.to_string(), "2".to_string()];
                frames.extend(backend.script.iter().cloned());
                for frame in frames {
                    if socket.send(Message::Text(frame)).await.is_err() {
                        return;
                    }
                }
            }
            "41" => break,
            _ => {}
        }
    }
}
