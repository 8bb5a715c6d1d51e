use thiserror::Error;

pub type Result<T, E = ClassifierError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("model not trained: call train() or load() first")]
    NotTrained,
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("training corpus is empty")]
    EmptyCorpus,
    #[error("failed to persist model: {0}")]
    Persist(String),
}
