//! Statistical intent classifier
//!
//! Utterances are turned into TF-IDF weighted word and word-bigram features
//! (case-folded, diacritics stripped) and scored by a multinomial naive Bayes
//! model with additive smoothing. All scoring happens in log space and is
//! normalized with log-sum-exp, so probabilities are never exactly zero.

use crate::{ClassifierError, Intent, Result, TRAINING_CORPUS_VERSION};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const MODEL_FORMAT_VERSION: u32 = 1;

/// Anything that can score an utterance against the intent set.
pub trait IntentClassifier: Send + Sync {
    /// Top-1 intent and its probability.
    fn predict(&self, text: &str) -> Result<Prediction>;

    /// Ranked predictions, best first.
    fn top_k(&self, text: &str, k: usize) -> Result<Vec<Prediction>> {
        self.predict(text).map(|p| vec![p].into_iter().take(k).collect())
    }
}

/// One scored intent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub intent: Intent,
    /// Posterior probability in [0, 1]
    pub confidence: f64,
}

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Additive (Lidstone) smoothing; must be positive
    pub alpha: f64,
    /// Keep only the most frequent features, if set
    pub max_features: Option<usize>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            max_features: None,
        }
    }
}

/// Accuracy on a deterministic holdout split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutReport {
    pub train_size: usize,
    pub test_size: usize,
    pub correct: usize,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Vectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NaiveBayes {
    classes: Vec<Intent>,
    class_log_prior: Vec<f64>,
    /// `[class][feature]`
    feature_log_prob: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrainedModel {
    format_version: u32,
    corpus_version: u32,
    config: ClassifierConfig,
    vectorizer: Vectorizer,
    bayes: NaiveBayes,
}

/// TF-IDF + multinomial naive Bayes classifier.
///
/// Untrained until [`train`](Self::train) or [`load`](Self::load) succeeds;
/// predicting before that yields [`ClassifierError::NotTrained`].
#[derive(Debug, Clone, Default)]
pub struct TextClassifier {
    config: ClassifierConfig,
    model: Option<TrainedModel>,
}

impl TextClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            model: None,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    /// Number of features in the fitted vocabulary (0 when untrained)
    pub fn vocabulary_size(&self) -> usize {
        self.model
            .as_ref()
            .map(|m| m.vectorizer.vocabulary.len())
            .unwrap_or(0)
    }

    /// Fit the vectorizer and the Bayes model on `corpus`, replacing any
    /// previous model.
    pub fn train(&mut self, corpus: &[(String, Intent)]) -> Result<()> {
        if corpus.is_empty() {
            return Err(ClassifierError::EmptyCorpus);
        }
        if !(self.config.alpha.is_finite() && self.config.alpha > 0.0) {
            return Err(ClassifierError::ModelUnavailable(format!(
                "smoothing alpha must be positive, got {}",
                self.config.alpha
            )));
        }

        let docs: Vec<BTreeMap<String, usize>> =
            corpus.iter().map(|(text, _)| term_counts(text)).collect();
        let vectorizer = Vectorizer::fit(&docs, self.config.max_features);
        let bayes = NaiveBayes::fit(
            &vectorizer,
            &docs,
            corpus.iter().map(|(_, intent)| *intent),
            self.config.alpha,
        );

        tracing::info!(
            samples = corpus.len(),
            features = vectorizer.vocabulary.len(),
            classes = bayes.classes.len(),
            "trained intent classifier"
        );

        self.model = Some(TrainedModel {
            format_version: MODEL_FORMAT_VERSION,
            corpus_version: TRAINING_CORPUS_VERSION,
            config: self.config.clone(),
            vectorizer,
            bayes,
        });
        Ok(())
    }

    /// Posterior distribution over all trained intents, best first. Ties
    /// keep intent declaration order.
    pub fn rank(&self, text: &str) -> Result<Vec<Prediction>> {
        let model = self.model.as_ref().ok_or(ClassifierError::NotTrained)?;
        let features = model.vectorizer.transform(&term_counts(text));
        let mut ranked = model.bayes.posterior(&features);
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(ranked)
    }

    /// Write the trained model as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let model = self.model.as_ref().ok_or(ClassifierError::NotTrained)?;
        let json =
            serde_json::to_string(model).map_err(|e| ClassifierError::Persist(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| ClassifierError::Persist(format!("{}: {e}", parent.display())))?;
        }
        fs::write(path, json)
            .map_err(|e| ClassifierError::Persist(format!("{}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "saved intent model");
        Ok(())
    }

    /// Load a model previously written by [`save`](Self::save). A missing,
    /// unreadable or inconsistent file is [`ClassifierError::ModelUnavailable`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| ClassifierError::ModelUnavailable(format!("{}: {e}", path.display())))?;
        let model: TrainedModel = serde_json::from_str(&raw)
            .map_err(|e| ClassifierError::ModelUnavailable(format!("{}: {e}", path.display())))?;
        model.validate()?;
        tracing::info!(path = %path.display(), "loaded intent model");
        Ok(Self {
            config: model.config.clone(),
            model: Some(model),
        })
    }

    /// Load `path` when it holds a usable model for the current corpus and
    /// hyperparameters, otherwise train on `corpus` (saving the result when `save` is set).
    /// Safe to call repeatedly; a trained classifier is returned unchanged.
    pub fn ensure_ready(
        mut self,
        corpus: &[(String, Intent)],
        path: Option<&Path>,
        save: bool,
    ) -> Result<Self> {
        if self.is_trained() {
            return Ok(self);
        }
        if let Some(path) = path {
            match Self::load(path) {
                Ok(loaded)
                    if loaded.corpus_version() == Some(TRAINING_CORPUS_VERSION)
                        && loaded.config == self.config =>
                {
                    return Ok(loaded);
                }
                Ok(_) => tracing::warn!(path = %path.display(), "stale model, retraining"),
                Err(e) => tracing::warn!(error = %e, "model not loaded, retraining"),
            }
        }
        self.train(corpus)?;
        if let (Some(path), true) = (path, save) {
            if let Err(e) = self.save(path) {
                tracing::warn!(error = %e, "could not save retrained model");
            }
        }
        Ok(self)
    }

    /// Corpus version the model was trained against
    pub fn corpus_version(&self) -> Option<u32> {
        self.model.as_ref().map(|m| m.corpus_version)
    }

    /// Train on all but every `every`-th pair and score the held-out pairs.
    /// Diagnostic only.
    pub fn evaluate_holdout(
        config: ClassifierConfig,
        corpus: &[(String, Intent)],
        every: usize,
    ) -> Result<HoldoutReport> {
        let every = every.max(2);
        let (test, train): (Vec<_>, Vec<_>) = corpus
            .iter()
            .cloned()
            .enumerate()
            .partition(|(i, _)| i % every == every - 1);
        let train: Vec<(String, Intent)> = train.into_iter().map(|(_, p)| p).collect();

        let mut classifier = Self::new(config);
        classifier.train(&train)?;

        let mut correct = 0;
        for (_, (text, intent)) in &test {
            if classifier.predict(text)?.intent == *intent {
                correct += 1;
            }
        }
        let accuracy = if test.is_empty() {
            0.0
        } else {
            correct as f64 / test.len() as f64
        };
        Ok(HoldoutReport {
            train_size: train.len(),
            test_size: test.len(),
            correct,
            accuracy,
        })
    }
}

impl IntentClassifier for TextClassifier {
    fn predict(&self, text: &str) -> Result<Prediction> {
        self.rank(text)?
            .into_iter()
            .next()
            .ok_or_else(|| ClassifierError::ModelUnavailable("model has no classes".into()))
    }

    fn top_k(&self, text: &str, k: usize) -> Result<Vec<Prediction>> {
        let mut ranked = self.rank(text)?;
        ranked.truncate(k);
        Ok(ranked)
    }
}

impl Vectorizer {
    fn fit(docs: &[BTreeMap<String, usize>], max_features: Option<usize>) -> Self {
        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        let mut term_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in docs {
            for (term, count) in doc {
                *doc_freq.entry(term.as_str()).or_default() += 1;
                *term_freq.entry(term.as_str()).or_default() += count;
            }
        }

        let mut kept: Vec<&str> = doc_freq.keys().copied().collect();
        if let Some(limit) = max_features {
            if kept.len() > limit {
                kept.sort_by(|a, b| term_freq[b].cmp(&term_freq[a]).then_with(|| a.cmp(b)));
                kept.truncate(limit);
                kept.sort_unstable();
            }
        }

        let n = docs.len() as f64;
        let vocabulary = kept
            .iter()
            .enumerate()
            .map(|(i, term)| (term.to_string(), i))
            .collect();
        let idf = kept
            .iter()
            .map(|term| ((1.0 + n) / (1.0 + doc_freq[term] as f64)).ln() + 1.0)
            .collect();
        Self { vocabulary, idf }
    }

    /// Sparse, L2-normalized TF-IDF vector; unknown terms are dropped.
    fn transform(&self, counts: &BTreeMap<String, usize>) -> Vec<(usize, f64)> {
        let mut out: Vec<(usize, f64)> = counts
            .iter()
            .filter_map(|(term, count)| {
                self.vocabulary
                    .get(term)
                    .map(|&idx| (idx, *count as f64 * self.idf[idx]))
            })
            .collect();
        let norm = out.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut out {
                *w /= norm;
            }
        }
        out
    }
}

impl NaiveBayes {
    fn fit(
        vectorizer: &Vectorizer,
        docs: &[BTreeMap<String, usize>],
        labels: impl Iterator<Item = Intent>,
        alpha: f64,
    ) -> Self {
        let labels: Vec<Intent> = labels.collect();
        let classes: Vec<Intent> = labels
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let n_features = vectorizer.vocabulary.len();

        let mut class_count = vec![0usize; classes.len()];
        let mut feature_count = vec![vec![0.0f64; n_features]; classes.len()];
        for (doc, label) in docs.iter().zip(&labels) {
            let Ok(c) = classes.binary_search(label) else {
                continue;
            };
            class_count[c] += 1;
            for (idx, weight) in vectorizer.transform(doc) {
                feature_count[c][idx] += weight;
            }
        }

        let total = labels.len() as f64;
        let class_log_prior = class_count
            .iter()
            .map(|&count| (count as f64 / total).ln())
            .collect();
        let feature_log_prob = feature_count
            .iter()
            .map(|row| {
                let denom = (row.iter().sum::<f64>() + alpha * n_features as f64).ln();
                row.iter().map(|fc| (fc + alpha).ln() - denom).collect()
            })
            .collect();

        Self {
            classes,
            class_log_prior,
            feature_log_prob,
        }
    }

    /// Normalized posterior per class, in class order.
    fn posterior(&self, features: &[(usize, f64)]) -> Vec<Prediction> {
        let joint: Vec<f64> = self
            .class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, row)| {
                prior
                    + features
                        .iter()
                        .map(|&(idx, weight)| weight * row[idx])
                        .sum::<f64>()
            })
            .collect();

        let max = joint.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let log_norm = max + joint.iter().map(|j| (j - max).exp()).sum::<f64>().ln();
        self.classes
            .iter()
            .zip(joint)
            .map(|(&intent, j)| Prediction {
                intent,
                confidence: (j - log_norm).exp(),
            })
            .collect()
    }
}

impl TrainedModel {
    fn validate(&self) -> Result<()> {
        let corrupt = |why: &str| -> Result<()> {
            Err(ClassifierError::ModelUnavailable(format!(
                "corrupt model: {why}"
            )))
        };
        if self.format_version != MODEL_FORMAT_VERSION {
            return corrupt("unsupported format version");
        }
        let n_features = self.vectorizer.vocabulary.len();
        if self.vectorizer.idf.len() != n_features
            || self.vectorizer.vocabulary.values().any(|&i| i >= n_features)
        {
            return corrupt("vocabulary and idf disagree");
        }
        let n_classes = self.bayes.classes.len();
        if n_classes == 0
            || self.bayes.class_log_prior.len() != n_classes
            || self.bayes.feature_log_prob.len() != n_classes
            || self
                .bayes
                .feature_log_prob
                .iter()
                .any(|row| row.len() != n_features)
        {
            return corrupt("class tables have the wrong shape");
        }
        Ok(())
    }
}

/// Case-fold and strip diacritics (NFKD, combining marks removed).
pub fn normalize(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Word tokens of two or more word characters.
pub fn tokenize(text: &str) -> Vec<String> {
    static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
    let token_regex = TOKEN_REGEX
        .get_or_init(|| Regex::new(r"\w\w+").expect("Invalid regex pattern - this is a bug"));
    token_regex
        .find_iter(&normalize(text))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Unigram and bigram counts for one utterance.
fn term_counts(text: &str) -> BTreeMap<String, usize> {
    let tokens = tokenize(text);
    let mut counts = BTreeMap::new();
    for token in &tokens {
        *counts.entry(token.clone()).or_default() += 1;
    }
    for pair in tokens.windows(2) {
        *counts.entry(format!("{} {}", pair[0], pair[1])).or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training_corpus;

    fn trained() -> TextClassifier {
        let mut classifier = TextClassifier::new(ClassifierConfig::default());
        classifier.train(&training_corpus()).unwrap();
        classifier
    }

    #[test]
    fn test_normalize_strips_accents() {
        assert_eq!(normalize("Lâmpu NYALÁ"), "lampu nyala");
    }

    #[test]
    fn test_tokenize_drops_single_chars() {
        assert_eq!(tokenize("a belok, ke KIRI!"), vec!["belok", "ke", "kiri"]);
    }

    #[test]
    fn test_term_counts_include_bigrams() {
        let counts = term_counts("belok ke kiri");
        assert_eq!(counts.get("belok ke"), Some(&1));
        assert_eq!(counts.get("ke kiri"), Some(&1));
        assert_eq!(counts.len(), 5);
    }

    #[test]
    fn test_predict_before_train_fails() {
        let classifier = TextClassifier::default();
        assert!(matches!(
            classifier.predict("maju"),
            Err(ClassifierError::NotTrained)
        ));
    }

    #[test]
    fn test_train_rejects_empty_corpus() {
        let mut classifier = TextClassifier::default();
        assert!(matches!(
            classifier.train(&[]),
            Err(ClassifierError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_training_phrases_predict_their_label() {
        let classifier = trained();
        for (text, intent) in training_corpus() {
            let prediction = classifier.predict(&text).unwrap();
            assert_eq!(prediction.intent, intent, "'{text}'");
            assert!(
                prediction.confidence >= 0.4,
                "'{text}' -> {:.3}",
                prediction.confidence
            );
        }
    }

    #[test]
    fn test_paraphrases() {
        let classifier = trained();
        let cases = [
            ("nyalakan lampunya dong", Intent::LightOn),
            ("robot maju yuk", Intent::MoveForward),
            ("belok kiri sekarang", Intent::MoveLeft),
        ];
        for (text, intent) in cases {
            let prediction = classifier.predict(text).unwrap();
            assert_eq!(prediction.intent, intent, "'{text}'");
            assert!(prediction.confidence > 0.5);
        }
    }

    #[test]
    fn test_out_of_vocabulary_is_low_confidence() {
        let classifier = trained();
        let prediction = classifier.predict("halo robot apa kabar").unwrap();
        assert!(prediction.confidence < 0.4);
        // No known features at all: posterior equals the class priors.
        let prediction = classifier.predict("xyz qwerty").unwrap();
        assert!(prediction.confidence < 0.2);
    }

    #[test]
    fn test_top_k_is_sorted_and_normalized() {
        let classifier = trained();
        let ranked = classifier.rank("belok kanan").unwrap();
        assert_eq!(ranked.len(), Intent::ALL.len());
        let sum: f64 = ranked.iter().map(|p| p.confidence).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(ranked.windows(2).all(|w| w[0].confidence >= w[1].confidence));

        let top = classifier.top_k("belok kanan", 3).unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].intent, Intent::MoveRight);
    }

    #[test]
    fn test_equal_posteriors_rank_in_declaration_order() {
        let mut classifier = TextClassifier::default();
        let corpus = vec![
            ("kiri".to_string(), Intent::MoveLeft),
            ("kanan".to_string(), Intent::MoveRight),
        ];
        classifier.train(&corpus).unwrap();
        let ranked = classifier.rank("nothing known").unwrap();
        assert_eq!(ranked[0].intent, Intent::MoveLeft);
        assert_eq!(ranked[1].intent, Intent::MoveRight);
    }

    #[test]
    fn test_max_features_caps_vocabulary() {
        let mut classifier = TextClassifier::new(ClassifierConfig {
            alpha: 0.1,
            max_features: Some(20),
        });
        classifier.train(&training_corpus()).unwrap();
        assert_eq!(classifier.vocabulary_size(), 20);
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("resolver-model-{}", std::process::id()));
        let path = dir.join("model.json");
        let classifier = trained();
        classifier.save(&path).unwrap();

        let loaded = TextClassifier::load(&path).unwrap();
        let a = classifier.predict("cek suhu").unwrap();
        let b = loaded.predict("cek suhu").unwrap();
        assert_eq!(a.intent, b.intent);
        assert!((a.confidence - b.confidence).abs() < 1e-12);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_missing_or_corrupt_is_unavailable() {
        let missing = std::env::temp_dir().join("resolver-model-does-not-exist.json");
        assert!(matches!(
            TextClassifier::load(&missing),
            Err(ClassifierError::ModelUnavailable(_))
        ));

        let corrupt =
            std::env::temp_dir().join(format!("resolver-corrupt-{}.json", std::process::id()));
        fs::write(&corrupt, "{ not json").unwrap();
        assert!(matches!(
            TextClassifier::load(&corrupt),
            Err(ClassifierError::ModelUnavailable(_))
        ));
        let _ = fs::remove_file(&corrupt);
    }

    #[test]
    fn test_ensure_ready_retrains_when_model_missing() {
        let path = std::env::temp_dir().join(format!("resolver-ensure-{}.json", std::process::id()));
        let _ = fs::remove_file(&path);

        let classifier = TextClassifier::default()
            .ensure_ready(&training_corpus(), Some(&path), true)
            .unwrap();
        assert!(classifier.is_trained());
        assert!(path.exists());

        let reloaded = TextClassifier::default()
            .ensure_ready(&[], Some(&path), false)
            .unwrap();
        assert_eq!(reloaded.corpus_version(), Some(TRAINING_CORPUS_VERSION));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_holdout_report() {
        let report =
            TextClassifier::evaluate_holdout(ClassifierConfig::default(), &training_corpus(), 5)
                .unwrap();
        assert_eq!(report.train_size + report.test_size, training_corpus().len());
        assert_eq!(report.test_size, training_corpus().len() / 5);
        assert!(report.accuracy >= 0.0 && report.accuracy <= 1.0);
    }
}
