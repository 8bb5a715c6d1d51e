//! Resolution cascade: classifier → keywords → frequency extraction

use crate::classifier::{ClassifierConfig, IntentClassifier, Prediction, TextClassifier};
use crate::{numeric, training_corpus, Command, CommandTable, KeywordMatcher};
use core::fmt;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which strategy runs first. The frequency heuristic is always last.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeOrder {
    #[default]
    ClassifierFirst,
    KeywordFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Minimum classifier probability accepted, in [0, 1]
    pub threshold: f64,
    pub order: CascadeOrder,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            order: CascadeOrder::ClassifierFirst,
        }
    }
}

/// Stage that produced a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStage {
    Classifier,
    Keyword,
    Numeric,
}

impl ResolutionStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionStage::Classifier => "classifier",
            ResolutionStage::Keyword => "keyword",
            ResolutionStage::Numeric => "numeric",
        }
    }
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub command: Command,
    pub stage: ResolutionStage,
    /// Set when the classifier stage produced the command
    pub prediction: Option<Prediction>,
    /// Set when the keyword stage produced the command
    pub keyword: Option<String>,
}

/// Verdict for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Resolved(Resolution),
    Unresolved,
}

impl ResolutionOutcome {
    pub fn command(&self) -> Option<&Command> {
        match self {
            ResolutionOutcome::Resolved(r) => Some(&r.command),
            ResolutionOutcome::Unresolved => None,
        }
    }

    pub fn stage(&self) -> Option<ResolutionStage> {
        match self {
            ResolutionOutcome::Resolved(r) => Some(r.stage),
            ResolutionOutcome::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionOutcome::Resolved(_))
    }
}

/// Turns utterances into at most one command.
///
/// Holds only read-only state once built, so a single instance can resolve
/// from many threads at once.
pub struct ResolutionCascade {
    config: CascadeConfig,
    table: CommandTable,
    keywords: KeywordMatcher,
    classifier: Option<Box<dyn IntentClassifier>>,
}

impl ResolutionCascade {
    /// Cascade with default tables and no classifier stage.
    pub fn new(config: CascadeConfig) -> Self {
        Self {
            config,
            table: CommandTable::default(),
            keywords: KeywordMatcher::default(),
            classifier: None,
        }
    }

    /// Build a cascade and make its classifier ready: reuse the model at
    /// `model_path` if it is current, otherwise train on the built-in corpus.
    /// When neither works the cascade runs on keywords and frequency
    /// extraction alone.
    pub fn initialize(
        config: CascadeConfig,
        classifier_config: ClassifierConfig,
        model_path: Option<&Path>,
        save_model: bool,
    ) -> Self {
        let cascade = Self::new(config);
        match TextClassifier::new(classifier_config).ensure_ready(
            &training_corpus(),
            model_path,
            save_model,
        ) {
            Ok(classifier) => cascade.with_classifier(Box::new(classifier)),
            Err(e) => {
                tracing::warn!(error = %e, "classifier unavailable, using keyword stages only");
                cascade
            }
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn IntentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_table(mut self, table: CommandTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_keywords(mut self, keywords: KeywordMatcher) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.config.threshold = threshold;
        self
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// Run the stages in order and stop at the first command.
    pub fn resolve(&self, text: &str) -> ResolutionOutcome {
        let text = text.trim();
        if text.is_empty() {
            return ResolutionOutcome::Unresolved;
        }

        let resolution = match self.config.order {
            CascadeOrder::ClassifierFirst => self
                .classifier_stage(text)
                .or_else(|| self.keyword_stage(text)),
            CascadeOrder::KeywordFirst => self
                .keyword_stage(text)
                .or_else(|| self.classifier_stage(text)),
        }
        .or_else(|| self.numeric_stage(text));

        match resolution {
            Some(r) => {
                tracing::info!(text, command = %r.command, stage = %r.stage, "resolved");
                ResolutionOutcome::Resolved(r)
            }
            None => {
                tracing::info!(text, "unresolved");
                ResolutionOutcome::Unresolved
            }
        }
    }

    /// Ranked classifier predictions; empty without a classifier.
    pub fn diagnose(&self, text: &str, k: usize) -> Vec<Prediction> {
        self.classifier
            .as_ref()
            .and_then(|c| c.top_k(text, k).ok())
            .unwrap_or_default()
    }

    fn classifier_stage(&self, text: &str) -> Option<Resolution> {
        let classifier = self.classifier.as_ref()?;
        let prediction = match classifier.predict(text) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(error = %e, "classifier stage skipped");
                return None;
            }
        };
        tracing::debug!(
            intent = %prediction.intent,
            confidence = prediction.confidence,
            threshold = self.config.threshold,
            "classifier prediction"
        );
        if prediction.confidence < self.config.threshold {
            return None;
        }
        let Some(command) = self.table.lookup(prediction.intent) else {
            tracing::warn!(intent = %prediction.intent, "no command mapped for intent");
            return None;
        };
        Some(Resolution {
            command: command.clone(),
            stage: ResolutionStage::Classifier,
            prediction: Some(prediction),
            keyword: None,
        })
    }

    fn keyword_stage(&self, text: &str) -> Option<Resolution> {
        let (keyword, command) = self.keywords.find(text)?;
        Some(Resolution {
            command: command.clone(),
            stage: ResolutionStage::Keyword,
            prediction: None,
            keyword: Some(keyword.to_string()),
        })
    }

    fn numeric_stage(&self, text: &str) -> Option<Resolution> {
        numeric::extract_parametrized(text).map(|command| Resolution {
            command,
            stage: ResolutionStage::Numeric,
            prediction: None,
            keyword: None,
        })
    }
}

impl fmt::Debug for ResolutionCascade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionCascade")
            .field("config", &self.config)
            .field("table", &self.table)
            .field("keywords", &self.keywords.len())
            .field("classifier", &self.classifier.is_some())
            .finish()
    }
}
