//! serial-link: line-oriented link to a microcontroller that may be absent
//!
//! This crate provides a small blocking trait for newline-framed serial
//! links, a `serialport` backend (feature `serial`), an in-process `mock`
//! backend (default), Arduino auto-discovery, and [`LinkController`], the
//! state machine that falls back to simulation whenever no live link exists.

mod types;
pub use types::{Ack, LinkSettings, LinkState, LinkStatus, PortInfo, UsbId};

mod error;
pub use error::{LinkError, Result};

mod traits;
pub use traits::SerialLink;

pub mod discovery;
pub use discovery::{find_arduino, is_arduino, ARDUINO_USB_IDS};

mod controller;
pub use controller::LinkController;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::MockLink;

#[cfg(feature = "serial")]
mod serial;

#[cfg(feature = "serial")]
pub use serial::SerialPortLink;
