use crate::{LinkError, LinkSettings, PortInfo, Result, SerialLink, UsbId};
use serialport::{ClearBuffer, SerialPort, SerialPortType};
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

/// Newline-framed text protocol over a USB serial port (Arduino-style)
pub struct SerialPortLink {
    port_path: String,
    port: Box<dyn SerialPort>,
    /// Bytes read past the last newline
    acc: Vec<u8>,
}

impl SerialPortLink {
    pub fn port_path(&self) -> &str {
        &self.port_path
    }

    fn map_io(&self, e: std::io::Error) -> LinkError {
        match e.kind() {
            ErrorKind::TimedOut => LinkError::Timeout,
            _ => LinkError::Io(format!("{}: {e}", self.port_path)),
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let pos = self.acc.iter().position(|&b| b == b'\n')?;
        let line = self.acc.drain(..=pos).collect::<Vec<u8>>();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }
}

impl SerialLink for SerialPortLink {
    fn open(path: &str, settings: &LinkSettings) -> Result<Self> {
        let port = serialport::new(path, settings.baud_rate)
            .timeout(settings.io_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => LinkError::PortNotFound(path.to_string()),
                _ => LinkError::Io(format!("{path}: {e}")),
            })?;
        Ok(Self {
            port_path: path.to_string(),
            port,
            acc: Vec::with_capacity(64),
        })
    }

    fn list() -> Result<Vec<PortInfo>> {
        let mut out = Vec::new();
        for p in serialport::available_ports().map_err(|e| LinkError::Io(e.to_string()))? {
            match p.port_type {
                SerialPortType::UsbPort(u) => out.push(PortInfo {
                    name: p.port_name,
                    driver: "usb-serial".to_string(),
                    usb: Some(UsbId {
                        vid: u.vid,
                        pid: u.pid,
                    }),
                    product: u.product,
                }),
                _ => {
                    // Non-USB ports carry no ids but can still be opened by name
                    out.push(PortInfo {
                        name: p.port_name,
                        driver: "serial".to_string(),
                        usb: None,
                        product: None,
                    });
                }
            }
        }
        Ok(out)
    }

    fn clear_input(&mut self) -> Result<()> {
        self.acc.clear();
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| LinkError::Io(format!("{}: {e}", self.port_path)))
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let mut framed = Vec::with_capacity(line.len() + 1);
        framed.extend_from_slice(line.as_bytes());
        framed.push(b'\n');
        if let Err(e) = self.port.write_all(&framed).and_then(|_| self.port.flush()) {
            return Err(self.map_io(e));
        }
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; 128];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            self.port
                .set_timeout(remaining)
                .map_err(|e| LinkError::Io(e.to_string()))?;
            match self.port.read(&mut buf) {
                Ok(n) if n > 0 => {
                    self.acc.extend_from_slice(&buf[..n]);
                    if let Some(line) = self.take_line() {
                        return Ok(Some(line));
                    }
                }
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(None),
                Err(e) => return Err(self.map_io(e)),
            }
        }
    }
}
