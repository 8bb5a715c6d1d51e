//! Link state machine
//!
//! `disconnected → connected` on a successful open, `connected → degraded`
//! on any I/O failure, back to `connected` on reconnect and to
//! `disconnected` on close. Sends are serialized by one mutex held across
//! the write and the acknowledgement read, so write/ack pairs never
//! interleave between callers.

use crate::discovery::find_arduino;
use crate::{Ack, LinkError, LinkSettings, LinkState, LinkStatus, SerialLink};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

struct LinkInner<P> {
    port: Option<P>,
    state: LinkState,
    endpoint: Option<String>,
    last_error: Option<String>,
}

/// Owns one hardware link of backend `P`.
pub struct LinkController<P: SerialLink> {
    settings: LinkSettings,
    inner: Mutex<LinkInner<P>>,
}

impl<P: SerialLink> LinkController<P> {
    /// A controller in simulation mode; nothing is opened.
    pub fn new(settings: LinkSettings) -> Self {
        Self {
            settings,
            inner: Mutex::new(LinkInner {
                port: None,
                state: LinkState::Disconnected,
                endpoint: None,
                last_error: None,
            }),
        }
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, LinkInner<P>> {
        // A panic mid-send leaves nothing half-updated that matters here.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open `endpoint`. On failure the link is `disconnected` and the cause
    /// is kept in [`LinkStatus::last_error`].
    pub fn connect(&self, endpoint: &str) -> bool {
        let mut inner = self.lock();
        inner.port = None;
        match P::open(endpoint, &self.settings) {
            Ok(mut port) => {
                if !self.settings.settle_delay.is_zero() {
                    thread::sleep(self.settings.settle_delay);
                }
                match port.read_line(self.settings.greeting_timeout) {
                    Ok(Some(greeting)) => tracing::info!(endpoint, greeting = %greeting, "board greeting"),
                    Ok(None) => {}
                    Err(e) => tracing::debug!(endpoint, error = %e, "no greeting"),
                }
                inner.port = Some(port);
                inner.state = LinkState::Connected;
                inner.endpoint = Some(endpoint.to_string());
                inner.last_error = None;
                tracing::info!(endpoint, baud = self.settings.baud_rate, "link connected");
                true
            }
            Err(e) => {
                tracing::warn!(endpoint, error = %e, "link connection failed, simulating");
                inner.state = LinkState::Disconnected;
                inner.endpoint = Some(endpoint.to_string());
                inner.last_error = Some(e.to_string());
                false
            }
        }
    }

    /// Reopen the last endpoint. False when none was ever given.
    pub fn reconnect(&self) -> bool {
        let endpoint = self.lock().endpoint.clone();
        match endpoint {
            Some(endpoint) => self.connect(&endpoint),
            None => {
                self.lock().last_error = Some("no endpoint to reconnect to".to_string());
                false
            }
        }
    }

    /// Look for an Arduino among `P`'s ports and connect to the first one.
    pub fn auto_connect(&self) -> bool {
        let ports = match P::list() {
            Ok(ports) => ports,
            Err(e) => {
                tracing::warn!(error = %e, "port enumeration failed");
                self.lock().last_error = Some(e.to_string());
                return false;
            }
        };
        match find_arduino(&ports) {
            Some(port) => {
                tracing::info!(port = %port.name, "found Arduino");
                self.connect(&port.name)
            }
            None => {
                tracing::warn!("Arduino not found, running in simulation mode");
                self.lock().last_error = Some(LinkError::NoDevice.to_string());
                false
            }
        }
    }

    /// Drop the port. The endpoint is remembered for [`reconnect`](Self::reconnect).
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.port.take().is_some() {
            tracing::info!(endpoint = ?inner.endpoint, "link closed");
        }
        inner.state = LinkState::Disconnected;
    }

    /// Send one command and wait briefly for its acknowledgement line.
    ///
    /// Without a live link nothing is written and a simulated
    /// acknowledgement comes back. An I/O failure degrades the link.
    pub fn send(&self, command: &str) -> Ack {
        let command = command.trim();
        if command.is_empty() {
            return Ack::Empty;
        }

        let mut inner = self.lock();
        let inner = &mut *inner;
        let port = match (inner.state, inner.port.as_mut()) {
            (LinkState::Connected, Some(port)) => port,
            _ => {
                tracing::info!(command, state = %inner.state, "[SIMULATION] command");
                return Ack::Simulated(command.to_string());
            }
        };

        // A reply that missed an earlier read must not be taken for this one.
        let result = port
            .clear_input()
            .and_then(|()| port.write_line(command))
            .and_then(|()| {
                if !self.settings.ack_delay.is_zero() {
                    thread::sleep(self.settings.ack_delay);
                }
                port.read_line(self.settings.io_timeout)
            });

        match result {
            Ok(reply) => {
                let reply = reply.filter(|r| !r.is_empty()).unwrap_or_else(|| "OK".to_string());
                tracing::debug!(command, reply = %reply, "delivered");
                Ack::Delivered(reply)
            }
            Err(e) => {
                tracing::warn!(command, error = %e, "serial write/read error, link degraded");
                inner.state = LinkState::Degraded;
                inner.port = None;
                inner.last_error = Some(e.to_string());
                Ack::Failed(e.to_string())
            }
        }
    }

    pub fn state(&self) -> LinkState {
        self.lock().state
    }

    pub fn status(&self) -> LinkStatus {
        let inner = self.lock();
        LinkStatus {
            connected: inner.state == LinkState::Connected,
            state: inner.state,
            endpoint: inner.endpoint.clone(),
            last_error: inner.last_error.clone(),
        }
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::MockLink;
    use std::sync::Arc;

    fn controller() -> LinkController<MockLink> {
        LinkController::new(LinkSettings::immediate(9600))
    }

    #[test]
    fn test_simulation_without_endpoint() {
        let link = controller();
        for cmd in ["L13:1:5", "MS:0:0", "TR"] {
            let ack = link.send(cmd);
            assert_eq!(ack, Ack::Simulated(cmd.to_string()));
            assert_eq!(ack.text(), format!("[SIMULASI] Perintah diterima: {cmd}"));
        }
        assert_eq!(link.state(), LinkState::Disconnected);
        let status = link.status();
        assert!(!status.connected);
        assert_eq!(status.endpoint, None);
    }

    #[test]
    fn test_empty_command() {
        let link = controller();
        assert_eq!(link.send("  "), Ack::Empty);
        assert_eq!(Ack::Empty.text(), "EMPTY_COMMAND");
    }

    #[test]
    fn test_connect_and_echo() {
        let link = controller();
        assert!(link.connect("mock0"));
        assert_eq!(link.state(), LinkState::Connected);
        assert_eq!(link.send("MF:90:1"), Ack::Delivered("MF:90:1".to_string()));
        let status = link.status();
        assert!(status.connected);
        assert_eq!(status.endpoint.as_deref(), Some("mock0"));
        assert_eq!(status.last_error, None);
    }

    #[test]
    fn test_greeting_is_drained() {
        let link = controller();
        assert!(link.connect("mock0?greeting=READY"));
        assert_eq!(link.send("HR"), Ack::Delivered("HR".to_string()));
    }

    #[test]
    fn test_silent_board_acks_ok() {
        let link = controller();
        assert!(link.connect("mock0?silent"));
        assert_eq!(link.send("HR"), Ack::Delivered("OK".to_string()));
    }

    #[test]
    fn test_connect_failure_is_recorded() {
        let link = controller();
        assert!(!link.connect("/dev/does-not-exist"));
        let status = link.status();
        assert_eq!(status.state, LinkState::Disconnected);
        assert!(status.last_error.is_some());
        assert!(link.send("TR").is_simulated());
    }

    #[test]
    fn test_io_failure_degrades_then_reconnect() {
        let link = controller();
        assert!(link.connect("mock0?fail_after=1"));
        assert!(matches!(link.send("MF:90:1"), Ack::Delivered(_)));

        let ack = link.send("MB:90:1");
        assert!(matches!(ack, Ack::Failed(_)));
        assert_eq!(ack.text(), "ERROR");
        assert_eq!(link.state(), LinkState::Degraded);
        assert!(link.status().last_error.is_some());

        // Degraded links simulate instead of writing.
        assert!(link.send("MS:0:0").is_simulated());

        assert!(link.reconnect());
        assert_eq!(link.state(), LinkState::Connected);
        assert!(matches!(link.send("MS:0:0"), Ack::Delivered(_)));
    }

    #[test]
    fn test_close() {
        let link = controller();
        assert!(link.connect("mock0"));
        link.close();
        assert_eq!(link.state(), LinkState::Disconnected);
        assert!(link.send("TR").is_simulated());
        assert!(link.reconnect());
    }

    #[test]
    fn test_late_reply_is_not_taken_for_next_ack() {
        let link = controller();
        assert!(link.connect("mock0?late"));
        assert_eq!(link.send("MF:90:1"), Ack::Delivered("OK".to_string()));
        assert_eq!(link.send("MS:0:0"), Ack::Delivered("OK".to_string()));
        assert_eq!(link.send("TR"), Ack::Delivered("OK".to_string()));
    }

    #[test]
    fn test_late_greeting_is_discarded() {
        // The greeting is queued but missed by the connect-time drain.
        let link = controller();
        assert!(link.connect("mock0?greeting=READY&late"));
        assert_eq!(link.send("HR"), Ack::Delivered("OK".to_string()));
        assert_eq!(link.send("TR"), Ack::Delivered("OK".to_string()));
    }

    #[test]
    fn test_close_from_degraded() {
        let link = controller();
        assert!(link.connect("mock0?fail_after=0"));
        assert!(matches!(link.send("TR"), Ack::Failed(_)));
        assert_eq!(link.state(), LinkState::Degraded);

        link.close();
        let status = link.status();
        assert_eq!(status.state, LinkState::Disconnected);
        assert!(!status.connected);
        assert!(status.last_error.is_some());
        assert_eq!(status.endpoint.as_deref(), Some("mock0?fail_after=0"));
        assert!(link.send("TR").is_simulated());
    }

    #[test]
    fn test_reconnect_without_endpoint() {
        let link = controller();
        assert!(!link.reconnect());
        assert!(link.status().last_error.is_some());
    }

    #[test]
    fn test_auto_connect_falls_back_to_simulation() {
        // The mock backend lists no USB ids, so no Arduino is found.
        let link = controller();
        assert!(!link.auto_connect());
        assert_eq!(link.state(), LinkState::Disconnected);
        assert!(link.send("TR").is_simulated());
    }

    #[test]
    fn test_concurrent_sends_are_serialized() {
        let link = Arc::new(controller());
        assert!(link.connect("mock0"));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let link = Arc::clone(&link);
                std::thread::spawn(move || {
                    let cmd = format!("S{}:1", 100 + i);
                    (cmd.clone(), link.send(&cmd))
                })
            })
            .collect();
        for handle in handles {
            let (cmd, ack) = handle.join().unwrap();
            // Each caller reads back its own echo.
            assert_eq!(ack, Ack::Delivered(cmd));
        }
    }
}
