//! voice-robot: a voice command session over a serial-linked robot
//!
//! [`RobotSession`] resolves each utterance with the command-resolver
//! cascade, sends the command over a [`serial_link::LinkController`]
//! (or simulates it when no board is attached) and keeps a bounded
//! history of what happened.

mod error;
pub use error::{Result, SessionError};

mod config;
pub use config::RobotConfig;

mod history;
pub use history::{HistoryRecord, RecordStatus, SessionHistory};

mod metrics;
pub use metrics::SessionMetrics;

mod transcribe;
pub use transcribe::{MockTranscriber, TextTranscriber, Transcriber};

mod session;
pub use session::{Dispatch, RobotSession, NO_SPEECH_RESPONSE, UNRESOLVED_RESPONSE};
