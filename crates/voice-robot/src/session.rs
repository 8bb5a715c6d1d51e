//! The control surface: utterance in, actuator command out, history kept.

use crate::{
    HistoryRecord, RecordStatus, Result, RobotConfig, SessionError, SessionHistory,
    SessionMetrics, Transcriber,
};
use command_resolver::{ResolutionCascade, ResolutionOutcome};
use serial_link::{Ack, LinkController, LinkSettings, LinkStatus, SerialLink};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Response recorded when no stage resolves an utterance
pub const UNRESOLVED_RESPONSE: &str = "Perintah tidak dikenali";
/// Response recorded when speech produced no usable text
pub const NO_SPEECH_RESPONSE: &str = "Tidak dapat mengenali suara";

/// What happened to one resolution outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// `None` when nothing was sent
    pub ack: Option<Ack>,
    pub response: String,
    pub status: RecordStatus,
}

/// Owns the cascade, one link and the history. Shareable across threads.
pub struct RobotSession<P: SerialLink> {
    cascade: ResolutionCascade,
    link: LinkController<P>,
    history: SessionHistory,
    last_result: Mutex<Option<HistoryRecord>>,
    transcriber: Mutex<Option<Box<dyn Transcriber>>>,
    metrics: SessionMetrics,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<P: SerialLink> RobotSession<P> {
    pub fn new(
        cascade: ResolutionCascade,
        link: LinkController<P>,
        history_capacity: usize,
    ) -> Result<Self> {
        let session = Self {
            cascade,
            link,
            history: SessionHistory::new(history_capacity),
            last_result: Mutex::new(None),
            transcriber: Mutex::new(None),
            metrics: SessionMetrics::new()?,
        };
        session.refresh_link_gauge();
        Ok(session)
    }

    /// Validate `config`, prepare the classifier and build a session whose
    /// link is still in simulation mode. See [`connect_configured`](Self::connect_configured).
    pub fn from_config(config: &RobotConfig) -> Result<Self> {
        Self::from_config_with_link(config, config.link_settings())
    }

    /// Like [`from_config`](Self::from_config) with explicit link timings.
    pub fn from_config_with_link(config: &RobotConfig, settings: LinkSettings) -> Result<Self> {
        config.validate()?;
        let cascade = ResolutionCascade::initialize(
            config.cascade_config(),
            config.classifier_config(),
            config.model_path.as_deref(),
            config.save_model,
        );
        tracing::info!(
            threshold = config.threshold,
            order = ?config.cascade_order,
            classifier = cascade.has_classifier(),
            "resolution cascade ready"
        );
        Self::new(
            cascade,
            LinkController::new(settings),
            config.history_capacity,
        )
    }

    pub fn with_transcriber(self, transcriber: Box<dyn Transcriber>) -> Self {
        *lock(&self.transcriber) = Some(transcriber);
        self
    }

    pub fn cascade(&self) -> &ResolutionCascade {
        &self.cascade
    }

    pub fn link(&self) -> &LinkController<P> {
        &self.link
    }

    /// Run the cascade. Empty text is unresolved without consulting it.
    pub fn resolve(&self, text: &str) -> ResolutionOutcome {
        let outcome = self.cascade.resolve(text);
        match &outcome {
            ResolutionOutcome::Resolved(resolution) => self
                .metrics
                .resolved
                .with_label_values(&[resolution.stage.as_str()])
                .inc(),
            ResolutionOutcome::Unresolved => self.metrics.unresolved.inc(),
        }
        outcome
    }

    /// Send a resolved command over the link. Unresolved outcomes send nothing.
    pub fn dispatch(&self, outcome: &ResolutionOutcome) -> Dispatch {
        let Some(command) = outcome.command() else {
            return Dispatch {
                ack: None,
                response: UNRESOLVED_RESPONSE.to_string(),
                status: RecordStatus::Error,
            };
        };
        let ack = self.link.send(command.as_str());
        self.metrics.acks.with_label_values(&[ack.kind()]).inc();
        self.refresh_link_gauge();
        let status = if ack.is_failure() {
            RecordStatus::Error
        } else {
            RecordStatus::Success
        };
        Dispatch {
            response: ack.text(),
            ack: Some(ack),
            status,
        }
    }

    /// Resolve, dispatch and record one utterance.
    pub fn handle_utterance(&self, text: &str) -> HistoryRecord {
        let text = text.trim();
        if text.is_empty() {
            return self.no_speech();
        }
        let outcome = self.resolve(text);
        let dispatch = self.dispatch(&outcome);
        let record = HistoryRecord::new(
            text,
            outcome.command().map(|c| c.as_str().to_string()),
            dispatch.response,
            dispatch.status,
        );
        self.history.push(record.clone());
        *lock(&self.last_result) = Some(record.clone());
        record
    }

    /// Transcribe `audio` and handle the text. A failed or empty
    /// transcription is recorded as the last result only.
    pub fn handle_audio(&self, audio: &[u8]) -> Result<HistoryRecord> {
        let transcript = {
            let mut transcriber = lock(&self.transcriber);
            let transcriber = transcriber.as_mut().ok_or(SessionError::NoTranscriber)?;
            match transcriber.transcribe(audio) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "transcription failed");
                    String::new()
                }
            }
        };
        Ok(self.handle_utterance(&transcript))
    }

    fn no_speech(&self) -> HistoryRecord {
        let record = HistoryRecord::new("", None, NO_SPEECH_RESPONSE, RecordStatus::Error);
        *lock(&self.last_result) = Some(record.clone());
        record
    }

    /// Recent records, most recent first
    pub fn history(&self) -> Vec<HistoryRecord> {
        self.history.records()
    }

    pub fn history_capacity(&self) -> usize {
        self.history.capacity()
    }

    pub fn last_result(&self) -> Option<HistoryRecord> {
        lock(&self.last_result).clone()
    }

    pub fn link_status(&self) -> LinkStatus {
        self.link.status()
    }

    pub fn connect(&self, endpoint: &str) -> bool {
        let ok = self.link.connect(endpoint);
        self.refresh_link_gauge();
        ok
    }

    pub fn reconnect(&self) -> bool {
        let ok = self.link.reconnect();
        self.refresh_link_gauge();
        ok
    }

    pub fn auto_connect(&self) -> bool {
        let ok = self.link.auto_connect();
        self.refresh_link_gauge();
        ok
    }

    /// Open the configured port, or look for an Arduino when allowed.
    /// False means the session stays in simulation mode.
    pub fn connect_configured(&self, config: &RobotConfig) -> bool {
        match (&config.port, config.auto_detect) {
            (Some(port), _) => self.connect(port),
            (None, true) => self.auto_connect(),
            (None, false) => {
                tracing::info!("no port configured, simulation mode");
                false
            }
        }
    }

    pub fn close(&self) {
        self.link.close();
        self.refresh_link_gauge();
    }

    /// Prometheus text exposition of the session counters
    pub fn metrics_text(&self) -> String {
        self.metrics.encode_text()
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    fn refresh_link_gauge(&self) {
        self.metrics
            .link_connected
            .set(i64::from(self.link.status().connected));
    }
}
