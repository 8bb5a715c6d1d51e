use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no transcriber configured")]
    NoTranscriber,
    #[error("transcription failed: {0}")]
    Transcription(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
