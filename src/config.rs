use crate::announce::{CommandSpeaker, LogSpeaker, Speaker, Voice, VoiceGender, VoicePolicy};
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Environment variable that overrides `backend.origin`
pub const ORIGIN_ENV: &str = "BACKEND_ORIGIN";

/// Origin used when nothing else is configured
pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub channel: ChannelConfig,
    pub announcer: AnnouncerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub origin: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Socket.IO mount path on the backend
    pub path: String,
    /// How long `disconnect` waits for the reader task to wind down
    pub stop_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncerConfig {
    pub language: String,
    pub gender: Option<String>,
    pub fallback_voice: String,
    pub generic_greeting: String,
    /// Label-specific greetings. A list rather than a table because the
    /// config crate lowercases table keys.
    #[serde(default)]
    pub greetings: Vec<GreetingEntry>,
    /// Program and arguments used to speak; `{voice}` and `{text}` are substituted.
    /// Utterances are only logged when unset.
    #[serde(default)]
    pub speech_command: Option<Vec<String>>,
    /// Voices the speech program offers, in preference order
    #[serde(default)]
    pub voices: Vec<VoiceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GreetingEntry {
    pub label: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceEntry {
    pub name: String,
    pub language: String,
    pub gender: Option<String>,
}

impl AnnouncerConfig {
    pub fn voices(&self) -> Result<Vec<Voice>> {
        self.voices
            .iter()
            .map(|entry| {
                let voice = Voice::new(&entry.name, &entry.language);
                match entry.gender.as_deref() {
                    Some(gender) => {
                        let gender = gender
                            .parse::<VoiceGender>()
                            .map_err(|e| anyhow!("voice {}: {}", entry.name, e))?;
                        Ok(voice.with_gender(gender))
                    }
                    None => Ok(voice),
                }
            })
            .collect()
    }

    /// Selection preferences; an unrecognized gender is dropped with a warning
    pub fn voice_policy(&self) -> VoicePolicy {
        let gender = match self.gender.as_deref().map(str::parse::<VoiceGender>) {
            Some(Ok(gender)) => Some(gender),
            Some(Err(e)) => {
                warn!("{}, ignoring gender preference", e);
                None
            }
            None => None,
        };

        VoicePolicy {
            language: self.language.clone(),
            gender,
            fallback_voice: self.fallback_voice.clone(),
        }
    }

    /// The configured speech program advertising the configured voices,
    /// or a log-only speaker when no program is set
    pub fn speaker(&self) -> Result<Arc<dyn Speaker>> {
        let voices = self.voices()?;
        match &self.speech_command {
            Some(command) => Ok(Arc::new(CommandSpeaker::new(command)?.with_voices(voices))),
            None => {
                info!("No speech command configured, announcements are logged only");
                Ok(Arc::new(LogSpeaker::default().with_voices(voices)))
            }
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// `path` is passed to [`config::File::with_name`], so the extension may be
    /// omitted. A missing file is not an error.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Self::builder()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("PRESENCE").separator("__"))
            .set_override_option("backend.origin", std::env::var(ORIGIN_ENV).ok())?
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Built-in configuration with no file and no environment
    pub fn defaults() -> Result<Self> {
        let cfg: Self = Self::builder()?.build()?.try_deserialize()?;
        Ok(cfg)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("service.name", "presence-announcer")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8090)?
            .set_default("backend.origin", DEFAULT_ORIGIN)?
            .set_default("backend.request_timeout_secs", 10)?
            .set_default("channel.path", "socket.io")?
            .set_default("channel.stop_timeout_ms", 2000)?
            .set_default("announcer.language", "en-US")?
            .set_default("announcer.gender", "female")?
            .set_default("announcer.fallback_voice", "default")?
            .set_default("announcer.generic_greeting", "Hello {name}, welcome!")?)
    }

    pub fn origin_url(&self) -> Result<Url> {
        let url = Url::parse(&self.backend.origin)
            .with_context(|| format!("Invalid backend origin: {}", self.backend.origin))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => bail!("Backend origin must be http or https, got {}", other),
        }
    }

    fn validate(&self) -> Result<()> {
        self.origin_url()?;
        self.announcer.voices()?;
        if self.backend.request_timeout_secs == 0 {
            bail!("backend.request_timeout_secs must be greater than zero");
        }
        Ok(())
    }
}
