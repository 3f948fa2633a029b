use super::greetings::GreetingTable;
use super::sink::{AnnouncementSink, Utterance};
use super::voice::VoicePolicy;
use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Payload of a `persons_recognized` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionPayload {
    pub names: Vec<String>,
}

impl RecognitionPayload {
    /// Validate a raw event payload; `names` must be a list of strings
    pub fn from_value(value: &serde_json::Value) -> Result<Self, SessionError> {
        serde_json::from_value(value.clone()).map_err(|e| SessionError::MalformedEventPayload {
            reason: e.to_string(),
        })
    }
}

/// Decides what to announce and deduplicates against the names already spoken
pub struct AnnouncementEngine {
    greetings: GreetingTable,
    policy: VoicePolicy,
    sink: Arc<dyn AnnouncementSink>,
    spoken: HashSet<String>,
}

impl AnnouncementEngine {
    pub fn new(greetings: GreetingTable, policy: VoicePolicy, sink: Arc<dyn AnnouncementSink>) -> Self {
        Self {
            greetings,
            policy,
            sink,
            spoken: HashSet::new(),
        }
    }

    /// Announce every name not spoken yet, in the order given.
    ///
    /// Returns the names that were submitted to the sink.
    pub fn announce(&mut self, names: &[String]) -> Vec<String> {
        let mut submitted = Vec::new();
        let mut voices = None;

        for name in names {
            if self.spoken.contains(name) {
                debug!("Already announced {}, skipping", name);
                continue;
            }

            let voices = voices.get_or_insert_with(|| self.sink.voices());
            let utterance = Utterance {
                text: self.greetings.render(name),
                voice: self.policy.select(voices.as_slice()),
            };

            // A name whose submission failed stays unspoken and is retried on
            // the next event that carries it.
            if let Err(e) = self.sink.submit(utterance) {
                error!("Failed to submit announcement for {}: {:#}", name, e);
                continue;
            }

            info!("Announced {}", name);
            self.spoken.insert(name.clone());
            submitted.push(name.clone());
        }

        submitted
    }

    /// Validate a raw `persons_recognized` payload and announce its names.
    ///
    /// A malformed payload is logged and dropped as a whole.
    pub fn handle_payload(&mut self, payload: &serde_json::Value) -> Vec<String> {
        match RecognitionPayload::from_value(payload) {
            Ok(event) => self.announce(&event.names),
            Err(e) => {
                warn!("{}; dropping event", e);
                Vec::new()
            }
        }
    }

    /// Forget every announced name. Returns how many were cleared.
    pub fn reset(&mut self) -> usize {
        let cleared = self.spoken.len();
        self.spoken.clear();
        info!("Cleared {} announced names", cleared);
        cleared
    }

    pub fn has_spoken(&self, name: &str) -> bool {
        self.spoken.contains(name)
    }

    /// Announced names, sorted
    pub fn spoken_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.spoken.iter().cloned().collect();
        names.sort();
        names
    }
}
