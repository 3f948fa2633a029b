use super::voice::Voice;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A message to speak and the voice to speak it with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub voice: Voice,
}

/// Where the announcement engine sends its messages.
///
/// `submit` only enqueues; it must not wait for playback.
pub trait AnnouncementSink: Send + Sync {
    /// Voices available for selection
    fn voices(&self) -> Vec<Voice>;

    fn submit(&self, utterance: Utterance) -> Result<()>;
}

/// A speech synthesis backend that plays one utterance at a time
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn voices(&self) -> Result<Vec<Voice>>;

    /// Speak and return once playback is finished
    async fn speak(&self, utterance: &Utterance) -> Result<()>;
}

/// Process-wide FIFO speech queue.
///
/// Utterances are played in submission order by a single worker task; a
/// failing utterance is logged and the queue moves on.
pub struct SpeechQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<Utterance>>>,
    voices: Vec<Voice>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SpeechQueue {
    /// Query the speaker's voices and spawn the playback worker
    pub async fn start(speaker: Arc<dyn Speaker>) -> Self {
        let voices = match speaker.voices().await {
            Ok(voices) => voices,
            Err(e) => {
                warn!("Failed to list voices, using fallback only: {}", e);
                Vec::new()
            }
        };
        info!("Speech queue started ({} voices available)", voices.len());

        let (tx, mut rx) = mpsc::unbounded_channel::<Utterance>();

        let worker = tokio::spawn(async move {
            while let Some(utterance) = rx.recv().await {
                debug!("Speaking with {}: {}", utterance.voice.name, utterance.text);
                if let Err(e) = speaker.speak(&utterance).await {
                    error!("Failed to speak \"{}\": {:#}", utterance.text, e);
                }
            }
            info!("Speech queue drained");
        });

        Self {
            tx: Mutex::new(Some(tx)),
            voices,
            worker: tokio::sync::Mutex::new(Some(worker)),
        }
    }

    /// Stop accepting utterances and wait for the queued ones to play
    pub async fn shutdown(&self) {
        // Dropping the sender lets the worker finish what is already queued.
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }

        let mut handle = self.worker.lock().await;
        if let Some(task) = handle.take() {
            if let Err(e) = task.await {
                error!("Speech worker panicked: {}", e);
            }
        }
    }
}

impl AnnouncementSink for SpeechQueue {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn submit(&self, utterance: Utterance) -> Result<()> {
        let guard = self
            .tx
            .lock()
            .map_err(|_| anyhow!("speech queue lock poisoned"))?;
        match guard.as_ref() {
            Some(tx) => tx
                .send(utterance)
                .map_err(|_| anyhow!("speech worker has stopped")),
            None => bail!("speech queue is shut down"),
        }
    }
}

/// Speaker that only writes utterances to the log
#[derive(Debug, Default)]
pub struct LogSpeaker {
    voices: Vec<Voice>,
}

impl LogSpeaker {
    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }
}

#[async_trait]
impl Speaker for LogSpeaker {
    async fn voices(&self) -> Result<Vec<Voice>> {
        Ok(self.voices.clone())
    }

    async fn speak(&self, utterance: &Utterance) -> Result<()> {
        info!("Speaking [{}]: {}", utterance.voice.name, utterance.text);
        Ok(())
    }
}

/// Speaker that runs an external program per utterance, e.g. `espeak-ng`
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    voices: Vec<Voice>,
}

impl CommandSpeaker {
    /// `command[0]` is the program; `{voice}` and `{text}` in the rest are substituted
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .context("Speech command must name a program")?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            voices: Vec::new(),
        })
    }

    pub fn espeak() -> Self {
        Self {
            program: "espeak-ng".to_string(),
            args: vec!["-v".into(), "{voice}".into(), "{text}".into()],
            voices: Vec::new(),
        }
    }

    /// Advertise voices the program is known to support
    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }

    fn render_args(&self, utterance: &Utterance) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{voice}", &utterance.voice.name)
                    .replace("{text}", &utterance.text)
            })
            .collect()
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    async fn voices(&self) -> Result<Vec<Voice>> {
        Ok(self.voices.clone())
    }

    async fn speak(&self, utterance: &Utterance) -> Result<()> {
        let status = Command::new(&self.program)
            .args(self.render_args(utterance))
            .status()
            .await
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !status.success() {
            bail!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}
