use crate::{LinkError, LinkSettings, PortInfo, Result, SerialLink};
use std::collections::VecDeque;
use std::time::Duration;

/// In-process stand-in for a board that echoes every command back.
///
/// Behaviour is selected through the endpoint string, e.g. `mock0`,
/// `mock0?silent`, `mock0?fail_after=2`, `mock0?greeting=READY`,
/// `mock0?refuse`, `mock0?late` (each echo arrives one read too late).
/// Each opened link is independent.
pub struct MockLink {
    name: String,
    options: MockOptions,
    pending: VecDeque<String>,
    /// Echoes written but not yet "arrived" (`late` only)
    in_flight: VecDeque<String>,
    writes: usize,
}

#[derive(Debug, Default)]
struct MockOptions {
    refuse: bool,
    silent: bool,
    late: bool,
    fail_after: Option<usize>,
    greeting: Option<String>,
}

impl MockOptions {
    fn parse(query: &str) -> Self {
        let mut options = Self::default();
        for item in query.split('&').filter(|s| !s.is_empty()) {
            let (key, value) = item.split_once('=').unwrap_or((item, ""));
            match key {
                "refuse" => options.refuse = true,
                "silent" => options.silent = true,
                "late" => options.late = true,
                "fail_after" => options.fail_after = value.parse().ok(),
                "greeting" => options.greeting = Some(value.to_string()),
                other => tracing::debug!(option = other, "ignoring unknown mock option"),
            }
        }
        options
    }
}

impl MockLink {
    /// Number of lines written so far
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl SerialLink for MockLink {
    fn open(endpoint: &str, _settings: &LinkSettings) -> Result<Self> {
        let (name, query) = endpoint.split_once('?').unwrap_or((endpoint, ""));
        if !name.starts_with("mock") {
            return Err(LinkError::PortNotFound(endpoint.to_string()));
        }
        let options = MockOptions::parse(query);
        if options.refuse {
            return Err(LinkError::Io("connection refused".to_string()));
        }
        let greeting: VecDeque<String> = options.greeting.iter().cloned().collect();
        let (pending, in_flight) = if options.late {
            (VecDeque::new(), greeting)
        } else {
            (greeting, VecDeque::new())
        };
        Ok(Self {
            name: name.to_string(),
            options,
            pending,
            in_flight,
            writes: 0,
        })
    }

    fn list() -> Result<Vec<PortInfo>> {
        Ok(vec![PortInfo {
            name: "mock0".to_string(),
            driver: "mock".to_string(),
            usb: None,
            product: None,
        }])
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        if let Some(limit) = self.options.fail_after {
            if self.writes >= limit {
                return Err(LinkError::Io(format!("{}: device disconnected", self.name)));
            }
        }
        self.writes += 1;
        if !self.options.silent {
            let queue = if self.options.late {
                &mut self.in_flight
            } else {
                &mut self.pending
            };
            queue.push_back(line.to_string());
        }
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        self.pending.clear();
        Ok(())
    }

    fn read_line(&mut self, _timeout: Duration) -> Result<Option<String>> {
        match self.pending.pop_front() {
            Some(line) => Ok(Some(line)),
            None => {
                // Whatever was in flight lands just after this read gives up.
                self.pending.append(&mut self.in_flight);
                Ok(None)
            }
        }
    }
}
