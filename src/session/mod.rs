//! Session lifecycle management
//!
//! This module provides the `SessionController` that coordinates:
//! - the event channel to the recognition backend
//! - activation and deactivation of the video feed
//! - forwarding recognition events to the announcement engine
//! - alerting the user about failures

mod alerts;
mod controller;
mod state;
mod status;

pub use alerts::{AlertLog, AlertSink};
pub use controller::{SessionController, StartOutcome, StopOutcome};
pub use state::{SessionState, TransitionError};
pub use status::{AlertRecord, SessionStatus};
