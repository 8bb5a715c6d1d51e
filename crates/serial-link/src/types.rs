use core::fmt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection state of the hardware link
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connected,
    /// Was connected, then an I/O operation failed
    Degraded,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "disconnected"),
            LinkState::Connected => write!(f, "connected"),
            LinkState::Degraded => write!(f, "degraded"),
        }
    }
}

/// Result of one send. Never an error: failure is a variant.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Ack {
    /// Reply line from the board (`OK` when it answered with nothing)
    Delivered(String),
    /// No hardware attached; holds the command that would have been sent
    Simulated(String),
    /// Write or read failed; holds the cause
    Failed(String),
    /// Nothing to send
    Empty,
}

impl Ack {
    /// Text shown to the user
    pub fn text(&self) -> String {
        match self {
            Ack::Delivered(reply) => reply.clone(),
            Ack::Simulated(cmd) => format!("[SIMULASI] Perintah diterima: {cmd}"),
            Ack::Failed(_) => "ERROR".to_string(),
            Ack::Empty => "EMPTY_COMMAND".to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Ack::Failed(_) | Ack::Empty)
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, Ack::Simulated(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Ack::Delivered(_) => "delivered",
            Ack::Simulated(_) => "simulated",
            Ack::Failed(_) => "failed",
            Ack::Empty => "empty",
        }
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// USB vendor/product pair
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct UsbId {
    pub vid: u16,
    pub pid: u16,
}

impl fmt::Display for UsbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vid, self.pid)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PortInfo {
    pub name: String,
    pub driver: String,
    pub usb: Option<UsbId>,
    pub product: Option<String>,
}

/// Snapshot reported to front ends
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LinkStatus {
    pub connected: bool,
    pub state: LinkState,
    pub endpoint: Option<String>,
    pub last_error: Option<String>,
}

/// Fixed link timings. Not adjustable per call.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LinkSettings {
    pub baud_rate: u32,
    /// Upper bound for one blocking read or write
    pub io_timeout: Duration,
    /// Pause after opening while the board resets
    pub settle_delay: Duration,
    /// Pause between writing a command and reading its echo
    pub ack_delay: Duration,
    /// How long to wait for a greeting line after connecting
    pub greeting_timeout: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            io_timeout: Duration::from_secs(2),
            settle_delay: Duration::from_secs(2),
            ack_delay: Duration::from_millis(50),
            greeting_timeout: Duration::from_millis(100),
        }
    }
}

impl LinkSettings {
    /// Same baud rate and I/O bound, but no sleeps. For in-process backends.
    pub fn immediate(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            settle_delay: Duration::ZERO,
            ack_delay: Duration::ZERO,
            greeting_timeout: Duration::ZERO,
            ..Self::default()
        }
    }
}
