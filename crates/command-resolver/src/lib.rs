//! Command resolution for voice-controlled robots
//!
//! This crate turns free-form utterances (Indonesian or English) into literal
//! actuator commands. Three independent strategies are tried in order:
//! a trained TF-IDF/naive Bayes classifier gated by a confidence threshold,
//! an ordered keyword table, and a frequency extractor for tone commands.
//! Every stage failure is absorbed; an utterance either resolves to exactly
//! one command or is reported as unresolved.

mod error;
pub use error::{ClassifierError, Result};

mod intent;
pub use intent::{Command, CommandTable, Intent, DEFAULT_COMMANDS};

mod corpus;
pub use corpus::{training_corpus, TRAINING_CORPUS, TRAINING_CORPUS_VERSION};

pub mod classifier;
pub use classifier::{
    ClassifierConfig, HoldoutReport, IntentClassifier, Prediction, TextClassifier,
};

mod keywords;
pub use keywords::{KeywordMatcher, DEFAULT_KEYWORDS, WHOLE_WORD_KEYWORDS};

pub mod numeric;
pub use numeric::extract_parametrized;

mod cascade;
pub use cascade::{
    CascadeConfig, CascadeOrder, Resolution, ResolutionCascade, ResolutionOutcome,
    ResolutionStage,
};

/// Resolve one utterance with a freshly trained default cascade.
///
/// Convenient for one-off use; long-running callers should build a
/// [`ResolutionCascade`] once and reuse it.
pub fn resolve_text(text: &str) -> ResolutionOutcome {
    ResolutionCascade::initialize(
        CascadeConfig::default(),
        ClassifierConfig::default(),
        None,
        false,
    )
    .resolve(text)
}
