//! Best-effort Arduino detection by USB vendor/product id

use crate::{PortInfo, UsbId};

/// Genuine Arduino (0x2341) and Arduino.org (0x2A03) boards: Uno, Mega,
/// Leonardo and their bootloaders.
pub const ARDUINO_USB_IDS: &[UsbId] = &[
    UsbId { vid: 0x2341, pid: 0x0043 },
    UsbId { vid: 0x2341, pid: 0x0001 },
    UsbId { vid: 0x2A03, pid: 0x0043 },
    UsbId { vid: 0x2341, pid: 0x0010 },
    UsbId { vid: 0x2A03, pid: 0x0010 },
    UsbId { vid: 0x2341, pid: 0x8036 },
    UsbId { vid: 0x2341, pid: 0x0036 },
    UsbId { vid: 0x2A03, pid: 0x8036 },
];

pub fn is_arduino(port: &PortInfo) -> bool {
    port.usb.is_some_and(|id| ARDUINO_USB_IDS.contains(&id))
}

/// First port that looks like an Arduino, in enumeration order.
pub fn find_arduino(ports: &[PortInfo]) -> Option<&PortInfo> {
    ports.iter().find(|p| is_arduino(p))
}
