#![cfg(feature = "mock")]

use command_resolver::{CascadeConfig, ClassifierConfig, ResolutionCascade};
use serial_link::{Ack, LinkController, LinkSettings, LinkState, MockLink};
use std::sync::Arc;
use voice_robot::{
    MockTranscriber, RecordStatus, RobotConfig, RobotSession, SessionError, NO_SPEECH_RESPONSE,
    UNRESOLVED_RESPONSE,
};

fn session(capacity: usize) -> RobotSession<MockLink> {
    let cascade = ResolutionCascade::initialize(
        CascadeConfig::default(),
        ClassifierConfig::default(),
        None,
        false,
    );
    assert!(cascade.has_classifier());
    RobotSession::new(
        cascade,
        LinkController::new(LinkSettings::immediate(9600)),
        capacity,
    )
    .unwrap()
}

#[test]
fn simulated_without_link() {
    let session = session(10);
    let record = session.handle_utterance("nyalakan lampu");
    assert_eq!(record.command.as_deref(), Some("L13:1:5"));
    assert_eq!(record.response, "[SIMULASI] Perintah diterima: L13:1:5");
    assert_eq!(record.status, RecordStatus::Success);
    assert_eq!(session.link_status().state, LinkState::Disconnected);
    assert_eq!(session.history(), vec![record.clone()]);
    assert_eq!(session.last_result(), Some(record));
}

#[test]
fn delivered_over_mock_link() {
    let session = session(10);
    assert!(session.connect("mock0"));
    let record = session.handle_utterance("maju");
    assert_eq!(record.command.as_deref(), Some("MF:90:1"));
    assert_eq!(record.response, "MF:90:1");

    let outcome = session.resolve("mainkan suara 500 hz");
    assert_eq!(
        session.dispatch(&outcome).ack,
        Some(Ack::Delivered("S500:2".to_string()))
    );
}

#[test]
fn unresolved_sends_nothing() {
    let session = session(10);
    // Any write on this link would fail and degrade it.
    assert!(session.connect("mock0?fail_after=0"));

    let record = session.handle_utterance("halo robot apa kabar");
    assert_eq!(record.command, None);
    assert_eq!(record.response, UNRESOLVED_RESPONSE);
    assert_eq!(record.status, RecordStatus::Error);
    assert_eq!(session.link_status().state, LinkState::Connected);
    assert_eq!(session.history().len(), 1);
}

#[test]
fn io_failure_degrades_to_simulation() {
    let session = session(10);
    assert!(session.connect("mock0?fail_after=1"));
    assert_eq!(session.handle_utterance("mundur").status, RecordStatus::Success);

    let failed = session.handle_utterance("belok kiri");
    assert_eq!(failed.response, "ERROR");
    assert_eq!(failed.status, RecordStatus::Error);
    let status = session.link_status();
    assert_eq!(status.state, LinkState::Degraded);
    assert!(status.last_error.is_some());

    let simulated = session.handle_utterance("berhenti");
    assert_eq!(simulated.response, "[SIMULASI] Perintah diterima: MS:0:0");

    assert!(session.reconnect());
    assert_eq!(session.handle_utterance("berhenti").response, "MS:0:0");
}

#[test]
fn history_is_bounded_newest_first() {
    let session = session(3);
    for text in ["maju", "mundur", "kiri", "kanan"] {
        session.handle_utterance(text);
    }
    let utterances: Vec<_> = session
        .history()
        .into_iter()
        .map(|r| r.utterance)
        .collect();
    assert_eq!(utterances, ["kanan", "kiri", "mundur"]);
}

#[test]
fn audio_pipeline() {
    let session = session(10).with_transcriber(Box::new(MockTranscriber::new([
        "cek suhu",
        "",
    ])));

    let record = session.handle_audio(&[0; 320]).unwrap();
    assert_eq!(record.command.as_deref(), Some("TR"));

    let empty = session.handle_audio(&[0; 320]).unwrap();
    assert_eq!(empty.response, NO_SPEECH_RESPONSE);
    assert_eq!(empty.status, RecordStatus::Error);

    // Queue exhausted: the failure is treated like silence.
    let failed = session.handle_audio(&[]).unwrap();
    assert_eq!(failed.response, NO_SPEECH_RESPONSE);

    assert_eq!(session.history().len(), 1);
    assert_eq!(
        session.last_result().map(|r| r.response),
        Some(NO_SPEECH_RESPONSE.to_string())
    );
}

#[test]
fn audio_requires_transcriber() {
    let session = session(10);
    assert!(matches!(
        session.handle_audio(b"maju"),
        Err(SessionError::NoTranscriber)
    ));
    assert!(session.last_result().is_none());
}

#[test]
fn metrics_count_stages_and_acks() {
    let session = session(10);
    session.handle_utterance("nyalakan lampu");
    session.handle_utterance("bunyikan suara 440");
    session.handle_utterance("halo robot apa kabar");

    let text = session.metrics_text();
    assert!(text.contains(r#"robot_commands_resolved_total{stage="classifier"} 1"#));
    assert!(text.contains(r#"robot_commands_resolved_total{stage="numeric"} 1"#));
    assert!(text.contains("robot_commands_unresolved_total 1"));
    assert!(text.contains(r#"robot_link_acks_total{kind="simulated"} 2"#));
    assert!(text.contains("robot_link_connected 0"));
}

#[test]
fn concurrent_utterances() {
    let session = Arc::new(session(5));
    assert!(session.connect("mock0"));
    let handles: Vec<_> = ["maju", "mundur", "kiri", "kanan", "stop", "suhu", "kelembaban", "alarm"]
        .into_iter()
        .map(|text| {
            let session = Arc::clone(&session);
            std::thread::spawn(move || session.handle_utterance(text))
        })
        .collect();
    for handle in handles {
        let record = handle.join().unwrap();
        // Each caller sees the echo of its own command.
        assert_eq!(record.command.as_deref(), Some(record.response.as_str()));
    }
    assert_eq!(session.history().len(), 5);
}

#[test]
fn from_config_trains_and_caches_model() {
    let dir = std::env::temp_dir().join(format!("voice-robot-session-{}", std::process::id()));
    let config = RobotConfig {
        model_path: Some(dir.join("intent_model.json")),
        save_model: true,
        history_capacity: 2,
        port: None,
        auto_detect: false,
        ..RobotConfig::default()
    };
    let session: RobotSession<MockLink> = RobotSession::from_config(&config).unwrap();
    assert!(session.cascade().has_classifier());
    assert!(dir.join("intent_model.json").exists());
    assert_eq!(session.history_capacity(), 2);
    assert!(!session.connect_configured(&config));
    assert_eq!(
        session.handle_utterance("tolong stop sekarang").command.as_deref(),
        Some("MS:0:0")
    );

    let invalid = RobotConfig {
        threshold: -0.1,
        ..config
    };
    assert!(matches!(
        RobotSession::<MockLink>::from_config(&invalid),
        Err(SessionError::InvalidConfig(_))
    ));
    let _ = std::fs::remove_dir_all(&dir);
}
