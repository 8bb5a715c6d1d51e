use crate::{LinkSettings, PortInfo, Result};
use std::time::Duration;

/// A minimal blocking, line-oriented serial link.
pub trait SerialLink: Send {
    /// Open an endpoint by name (e.g., "/dev/ttyACM0", "COM3").
    fn open(endpoint: &str, settings: &LinkSettings) -> Result<Self>
    where
        Self: Sized;

    /// Attempt to list available endpoints for this backend.
    fn list() -> Result<Vec<PortInfo>>
    where
        Self: Sized;

    /// Discard anything received but not yet read, such as a late reply
    /// to an earlier command.
    fn clear_input(&mut self) -> Result<()>;

    /// Write one command followed by a newline.
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Read one line, without its terminator. `Ok(None)` when nothing
    /// arrived within `timeout`.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>>;
}
