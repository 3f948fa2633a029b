use super::alerts::AlertSink;
use super::state::SessionState;
use super::status::SessionStatus;
use crate::announce::AnnouncementEngine;
use crate::channel::{
    ChannelEvent, ChannelFactory, ChannelId, ChannelMessage, ChannelState, EventChannel,
};
use crate::error::SessionError;
use crate::stream::{StreamControl, StreamLocator};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of a `start` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A start or stop was already in flight, or the session is already streaming
    Ignored,
    /// The feed is live at this locator
    Streaming(StreamLocator),
    /// The backend did not confirm the start; the user has been alerted
    Failed,
}

/// Result of a `stop` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// A start or stop was already in flight
    Ignored,
    /// Nothing was streaming
    AlreadyIdle,
    /// The session was torn down; the backend stop request may still be running
    Stopped,
}

struct Inner {
    state: SessionState,
    channel: Option<Box<dyn EventChannel>>,
    session_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
}

/// Owns the monitoring session: the event channel, the video feed and the
/// announcement engine fed by recognition events.
///
/// The state lock is never held across a network call, so a `start` or
/// `stop` issued while another one is pending observes a busy state and is
/// dropped.
pub struct SessionController {
    stream: Arc<dyn StreamControl>,
    channels: Arc<dyn ChannelFactory>,
    alerts: Arc<dyn AlertSink>,
    engine: Mutex<AnnouncementEngine>,
    inner: Mutex<Inner>,
    next_channel_id: AtomicU64,
    events_tx: mpsc::UnboundedSender<ChannelMessage>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<ChannelMessage>>>,
    locator_tx: watch::Sender<Option<StreamLocator>>,
    pending_stop: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl SessionController {
    pub fn new(
        stream: Arc<dyn StreamControl>,
        channels: Arc<dyn ChannelFactory>,
        engine: AnnouncementEngine,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (locator_tx, _) = watch::channel(None);

        Self {
            stream,
            channels,
            alerts,
            engine: Mutex::new(engine),
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                channel: None,
                session_id: None,
                started_at: None,
            }),
            next_channel_id: AtomicU64::new(0),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            locator_tx,
            pending_stop: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Open the event channel if needed and activate the video feed.
    ///
    /// A channel kept from a failed start is reused unless it has errored or
    /// been closed by the backend, in which case it is replaced.
    pub async fn start(&self) -> StartOutcome {
        let dead = {
            let mut inner = self.inner.lock().await;
            match inner.state.begin_start() {
                Ok(next) => inner.state = next,
                Err(e) => {
                    warn!("Ignoring start: {}", e);
                    return StartOutcome::Ignored;
                }
            }

            let dead = match inner.channel.as_ref().map(|channel| channel.state()) {
                Some(ChannelState::Errored | ChannelState::Disconnected) => inner.channel.take(),
                _ => None,
            };

            match inner.channel.as_ref() {
                Some(channel) => debug!("Reusing {}", channel.id()),
                None => inner.channel = Some(self.open_channel()),
            }

            info!("Starting session");
            dead
        };

        if let Some(mut channel) = dead {
            info!("Replacing dead {}", channel.id());
            channel.disconnect().await;
        }

        // A stop request from the previous activation must reach the
        // backend before this start does.
        self.await_pending_stop().await;

        let result = self.stream.request_start().await;

        let mut inner = self.inner.lock().await;
        let next = match inner.state.finish_start(result.is_ok()) {
            Ok(next) => next,
            Err(e) => {
                error!("Session left starting state unexpectedly: {}", e);
                return StartOutcome::Failed;
            }
        };
        inner.state = next;

        match result {
            Ok(()) => {
                let session_id = uuid::Uuid::new_v4().to_string();
                let locator = self.stream.feed_locator();
                inner.started_at = Some(Utc::now());
                self.locator_tx.send_replace(Some(locator.clone()));
                info!("Session {} live at {}", session_id, locator.url);
                inner.session_id = Some(session_id);
                StartOutcome::Streaming(locator)
            }
            Err(e) => {
                self.alerts.alert(&SessionError::StreamActivation(e));
                StartOutcome::Failed
            }
        }
    }

    /// Tear the session down without waiting for the backend to confirm.
    ///
    /// The locator is withdrawn first, then the stop request is sent on a
    /// detached task while the event channel is closed.
    pub async fn stop(&self) -> StopOutcome {
        let channel = {
            let mut inner = self.inner.lock().await;

            if inner.state == SessionState::Idle {
                let lingering = inner.channel.take();
                drop(inner);
                // A failed start leaves its channel behind
                if let Some(mut channel) = lingering {
                    info!("Closing {} left over from a failed start", channel.id());
                    channel.disconnect().await;
                } else {
                    debug!("Stop while idle, nothing to do");
                }
                return StopOutcome::AlreadyIdle;
            }

            match inner.state.begin_stop() {
                Ok(next) => inner.state = next,
                Err(e) => {
                    warn!("Ignoring stop: {}", e);
                    return StopOutcome::Ignored;
                }
            }

            info!(
                "Stopping session {}",
                inner.session_id.as_deref().unwrap_or("-")
            );
            self.locator_tx.send_replace(None);
            inner.started_at = None;
            inner.session_id = None;
            inner.channel.take()
        };

        self.spawn_stop_request().await;

        if let Some(mut channel) = channel {
            channel.disconnect().await;
        }

        let mut inner = self.inner.lock().await;
        match inner.state.finish_stop() {
            Ok(next) => inner.state = next,
            Err(e) => error!("Session left stopping state unexpectedly: {}", e),
        }
        info!("Session stopped");

        StopOutcome::Stopped
    }

    /// Forget every announced name so they are greeted again
    pub async fn reset_announcements(&self) -> usize {
        self.engine.lock().await.reset()
    }

    /// Handle one message from an event channel.
    ///
    /// Messages from a channel other than the one currently held are stale
    /// and dropped.
    pub async fn handle_channel_message(&self, message: ChannelMessage) {
        let current = self
            .inner
            .lock()
            .await
            .channel
            .as_ref()
            .map(|channel| channel.id());
        if current != Some(message.channel) {
            debug!("Dropping event from stale {}", message.channel);
            return;
        }

        match message.event {
            ChannelEvent::Connected => info!("Event channel {} connected", message.channel),
            ChannelEvent::ConnectError(reason) => {
                self.alerts
                    .alert(&SessionError::ChannelConnect { message: reason });
            }
            ChannelEvent::Disconnected => info!("Event channel {} disconnected", message.channel),
            ChannelEvent::Recognition(payload) => {
                let announced = self.engine.lock().await.handle_payload(&payload);
                if !announced.is_empty() {
                    debug!("Announced {:?}", announced);
                }
            }
            ChannelEvent::Notice { event, payload } => {
                info!("Backend says {}: {}", event, payload);
            }
        }
    }

    /// Drain channel messages in arrival order until shutdown
    pub fn spawn_event_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);

        tokio::spawn(async move {
            let Some(mut rx) = this.events_rx.lock().await.take() else {
                warn!("Event loop already running");
                return;
            };
            info!("Event loop started");

            loop {
                tokio::select! {
                    _ = this.cancel.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Some(msg) => this.handle_channel_message(msg).await,
                        None => break,
                    },
                }
            }

            info!("Event loop stopped");
        })
    }

    /// Stop the session if needed, give the backend `grace` to acknowledge,
    /// then cancel everything still running
    pub async fn shutdown(&self, grace: Duration) {
        info!("Shutting down session controller");

        if self.stop().await == StopOutcome::Ignored {
            warn!("Shutdown during a pending start or stop");
        }

        if tokio::time::timeout(grace, self.await_pending_stop())
            .await
            .is_err()
        {
            warn!("Backend did not acknowledge stop within {:?}", grace);
        }

        self.cancel.cancel();
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Follow the published feed locator; `None` whenever nothing is streaming
    pub fn subscribe_locator(&self) -> watch::Receiver<Option<StreamLocator>> {
        self.locator_tx.subscribe()
    }

    pub async fn status(&self) -> SessionStatus {
        let (state, session_id, started_at, channel) = {
            let inner = self.inner.lock().await;
            (
                inner.state,
                inner.session_id.clone(),
                inner.started_at,
                inner.channel.as_ref().map(|channel| channel.state()),
            )
        };
        // The watch guard is not Send; release it before awaiting the engine
        let locator = self.locator_tx.borrow().clone();

        SessionStatus {
            state,
            session_id,
            started_at,
            locator,
            channel,
            spoken_names: self.engine.lock().await.spoken_names(),
            recent_alerts: self.alerts.recent(),
        }
    }

    fn open_channel(&self) -> Box<dyn EventChannel> {
        let id = ChannelId(self.next_channel_id.fetch_add(1, Ordering::SeqCst) + 1);
        info!("Opening event channel {}", id);

        let mut channel = self.channels.create(id);
        channel.connect(self.events_tx.clone());
        channel
    }

    async fn spawn_stop_request(&self) {
        let stream = Arc::clone(&self.stream);
        let alerts = Arc::clone(&self.alerts);
        let token = self.cancel.child_token();

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => warn!("Stop request abandoned"),
                result = stream.request_stop() => match result {
                    Ok(()) => info!("Backend confirmed video feed stop"),
                    Err(e) => alerts.alert(&SessionError::StreamDeactivation(e)),
                },
            }
        });

        let mut pending = self.pending_stop.lock().await;
        if pending.replace(task).is_some() {
            debug!("Previous stop request still running, detaching it");
        }
    }

    async fn await_pending_stop(&self) {
        let task = self.pending_stop.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Stop request task failed: {}", e);
            }
        }
    }
}
