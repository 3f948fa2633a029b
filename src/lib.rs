pub mod announce;
pub mod channel;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod stream;

pub use announce::{
    AnnouncementEngine, AnnouncementSink, GreetingTable, RecognitionPayload, SpeechQueue,
    Utterance, Voice, VoicePolicy,
};
pub use channel::{ChannelEvent, ChannelMessage, EventChannel, SocketChannelFactory};
pub use config::Config;
pub use error::{SessionError, StreamError};
pub use http::{create_router, AppState};
pub use session::{SessionController, SessionState, SessionStatus, StartOutcome, StopOutcome};
pub use stream::{HttpStreamResource, StreamLocator};
