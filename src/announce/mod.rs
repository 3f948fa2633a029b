//! Turning recognized identities into spoken announcements
//!
//! This module provides:
//! - `AnnouncementEngine`: per-session dedup and greeting dispatch
//! - `GreetingTable`: label → message templates
//! - `VoicePolicy`: voice selection against what the speech backend offers
//! - `SpeechQueue`: the FIFO speech sink and its `Speaker` backends

mod engine;
mod greetings;
mod sink;
mod voice;

pub use engine::{AnnouncementEngine, RecognitionPayload};
pub use greetings::GreetingTable;
pub use sink::{
    AnnouncementSink, CommandSpeaker, LogSpeaker, Speaker, SpeechQueue, Utterance,
};
pub use voice::{Voice, VoiceGender, VoicePolicy};
