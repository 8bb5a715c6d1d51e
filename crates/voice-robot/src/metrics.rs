use crate::Result;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct SessionMetrics {
    pub registry: Registry,
    /// Resolved utterances by `stage`
    pub resolved: IntCounterVec,
    pub unresolved: IntCounter,
    /// Link acknowledgements by `kind`
    pub acks: IntCounterVec,
    pub link_connected: IntGauge,
}

impl SessionMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let resolved = IntCounterVec::new(
            Opts::new("robot_commands_resolved_total", "Utterances resolved to a command"),
            &["stage"],
        )?;
        let unresolved = IntCounter::new(
            "robot_commands_unresolved_total",
            "Utterances no stage could resolve",
        )?;
        let acks = IntCounterVec::new(
            Opts::new("robot_link_acks_total", "Link acknowledgements"),
            &["kind"],
        )?;
        let link_connected =
            IntGauge::new("robot_link_connected", "1 while the serial link is connected")?;

        registry.register(Box::new(resolved.clone()))?;
        registry.register(Box::new(unresolved.clone()))?;
        registry.register(Box::new(acks.clone()))?;
        registry.register(Box::new(link_connected.clone()))?;
        Ok(Self {
            registry,
            resolved,
            unresolved,
            acks,
            link_connected,
        })
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
