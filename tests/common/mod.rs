// Fake collaborators shared by the integration tests

#![allow(dead_code)]

pub mod backend;

use anyhow::Result;
use async_trait::async_trait;
use presence_announcer::announce::{AnnouncementSink, Utterance, Voice};
use presence_announcer::channel::{
    ChannelFactory, ChannelId, ChannelListener, ChannelState, EventChannel,
};
use presence_announcer::session::{AlertLog, AlertSink};
use presence_announcer::stream::{LocatorMinter, StreamControl, StreamLocator};
use presence_announcer::{AnnouncementEngine, GreetingTable, SessionController, StreamError, VoicePolicy};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use url::Url;

/// Sink that records every submission
#[derive(Default)]
pub struct RecordingSink {
    pub voices: Vec<Voice>,
    pub submitted: Mutex<Vec<Utterance>>,
}

impl RecordingSink {
    pub fn texts(&self) -> Vec<String> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

impl AnnouncementSink for RecordingSink {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn submit(&self, utterance: Utterance) -> Result<()> {
        self.submitted.lock().unwrap().push(utterance);
        Ok(())
    }
}

/// Feed control whose answers are scripted per call
pub struct FakeStream {
    pub start_results: Mutex<Vec<Result<(), StreamError>>>,
    pub stop_result: Mutex<Result<(), StreamError>>,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    /// When set, `request_start` waits on it before answering
    pub gate: Option<Arc<Notify>>,
    pub entered: Arc<Notify>,
    minter: LocatorMinter,
}

impl FakeStream {
    pub fn ok() -> Self {
        Self {
            start_results: Mutex::new(Vec::new()),
            stop_result: Mutex::new(Ok(())),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            gate: None,
            entered: Arc::new(Notify::new()),
            minter: LocatorMinter::new(Url::parse("http://backend.test/video_feed").unwrap()),
        }
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::ok()
        }
    }

    /// Answer the next start requests with these results, then succeed
    pub fn with_start_results(self, results: Vec<Result<(), StreamError>>) -> Self {
        *self.start_results.lock().unwrap() = results.into_iter().rev().collect();
        self
    }

    pub fn with_stop_result(self, result: Result<(), StreamError>) -> Self {
        *self.stop_result.lock().unwrap() = result;
        self
    }

    pub fn starts(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamControl for FakeStream {
    async fn request_start(&self) -> Result<(), StreamError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.start_results.lock().unwrap().pop().unwrap_or(Ok(()))
    }

    async fn request_stop(&self) -> Result<(), StreamError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.stop_result.lock().unwrap().clone()
    }

    fn feed_locator(&self) -> StreamLocator {
        self.minter.mint()
    }
}

/// What happened to the fake channels
#[derive(Default)]
pub struct ChannelLog {
    pub created: Mutex<Vec<ChannelId>>,
    pub disconnected: Mutex<Vec<ChannelId>>,
    pub listeners: Mutex<Vec<(ChannelId, ChannelListener)>>,
    pub states: Mutex<HashMap<ChannelId, ChannelState>>,
    /// When set, `disconnect` waits on it before finishing
    pub disconnect_gate: Mutex<Option<Arc<Notify>>>,
    pub disconnect_entered: Notify,
}

impl ChannelLog {
    pub fn gate_disconnect(&self, gate: Arc<Notify>) {
        *self.disconnect_gate.lock().unwrap() = Some(gate);
    }

    /// Force the state a channel reports, e.g. after a failed connect
    pub fn set_state(&self, id: ChannelId, state: ChannelState) {
        self.states.lock().unwrap().insert(id, state);
    }

    pub fn state(&self, id: ChannelId) -> ChannelState {
        self.states
            .lock()
            .unwrap()
            .get(&id)
            .copied()
            .unwrap_or(ChannelState::Disconnected)
    }

    pub fn created(&self) -> Vec<ChannelId> {
        self.created.lock().unwrap().clone()
    }

    pub fn disconnected(&self) -> Vec<ChannelId> {
        self.disconnected.lock().unwrap().clone()
    }

    pub fn listener(&self, id: ChannelId) -> ChannelListener {
        self.listeners
            .lock()
            .unwrap()
            .iter()
            .find(|(channel, _)| *channel == id)
            .map(|(_, listener)| listener.clone())
            .expect("channel was never connected")
    }
}

pub struct FakeChannel {
    id: ChannelId,
    log: Arc<ChannelLog>,
}

#[async_trait]
impl EventChannel for FakeChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn state(&self) -> ChannelState {
        self.log.state(self.id)
    }

    fn connect(&mut self, listener: ChannelListener) {
        self.log.set_state(self.id, ChannelState::Connecting);
        self.log.listeners.lock().unwrap().push((self.id, listener));
    }

    async fn disconnect(&mut self) {
        self.log.disconnect_entered.notify_one();
        let gate = self.log.disconnect_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.log.set_state(self.id, ChannelState::Disconnected);
        self.log.disconnected.lock().unwrap().push(self.id);
    }
}

pub struct FakeChannelFactory {
    pub log: Arc<ChannelLog>,
}

impl ChannelFactory for FakeChannelFactory {
    fn create(&self, id: ChannelId) -> Box<dyn EventChannel> {
        self.log.created.lock().unwrap().push(id);
        Box::new(FakeChannel {
            id,
            log: Arc::clone(&self.log),
        })
    }
}

/// A controller wired to fakes, plus handles to inspect them
pub struct Harness {
    pub controller: Arc<SessionController>,
    pub stream: Arc<FakeStream>,
    pub channels: Arc<ChannelLog>,
    pub sink: Arc<RecordingSink>,
    pub alerts: Arc<AlertLog>,
}

impl Harness {
    pub fn new(stream: FakeStream) -> Self {
        let stream = Arc::new(stream);
        let channels = Arc::new(ChannelLog::default());
        let sink = Arc::new(RecordingSink::default());
        let alerts = Arc::new(AlertLog::default());

        let engine = AnnouncementEngine::new(
            GreetingTable::default(),
            VoicePolicy::default(),
            sink.clone(),
        );
        let controller = Arc::new(SessionController::new(
            stream.clone(),
            Arc::new(FakeChannelFactory {
                log: Arc::clone(&channels),
            }),
            engine,
            alerts.clone() as Arc<dyn AlertSink>,
        ));

        Self {
            controller,
            stream,
            channels,
            sink,
            alerts,
        }
    }
}
