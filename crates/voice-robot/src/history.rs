use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::macros::format_description;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Success,
    Error,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Success => "success",
            RecordStatus::Error => "error",
        }
    }
}

/// One handled utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub utterance: String,
    /// Command sent, `None` when nothing resolved
    pub command: Option<String>,
    /// Acknowledgement or failure text shown to the user
    pub response: String,
    pub status: RecordStatus,
    pub timestamp: OffsetDateTime,
}

impl HistoryRecord {
    pub fn new(
        utterance: impl Into<String>,
        command: Option<String>,
        response: impl Into<String>,
        status: RecordStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            utterance: utterance.into(),
            command,
            response: response.into(),
            status,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RecordStatus::Success
    }

    /// `HH:MM:SS`, UTC
    pub fn display_time(&self) -> String {
        self.timestamp
            .format(format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_default()
    }
}

/// Bounded FIFO of recent records. The oldest is evicted once full.
#[derive(Debug)]
pub struct SessionHistory {
    capacity: usize,
    records: Mutex<VecDeque<HistoryRecord>>,
}

impl SessionHistory {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<HistoryRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, record: HistoryRecord) {
        let mut records = self.lock();
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    /// Snapshot, most recent first
    pub fn records(&self) -> Vec<HistoryRecord> {
        self.lock().iter().rev().cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: usize) -> HistoryRecord {
        HistoryRecord::new(format!("utterance {n}"), None, "ok", RecordStatus::Success)
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let history = SessionHistory::new(10);
        for n in 0..11 {
            history.push(record(n));
        }
        let records = history.records();
        assert_eq!(records.len(), 10);
        assert_eq!(records[0].utterance, "utterance 10");
        assert_eq!(records[9].utterance, "utterance 1");
        assert!(records.iter().all(|r| r.utterance != "utterance 0"));
    }

    #[test]
    fn test_zero_capacity() {
        let history = SessionHistory::new(0);
        history.push(record(1));
        history.push(record(2));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_record_fields() {
        let a = HistoryRecord::new("maju", Some("MF:90:1".to_string()), "MF:90:1", RecordStatus::Success);
        let b = HistoryRecord::new("maju", None, "Perintah tidak dikenali", RecordStatus::Error);
        assert_ne!(a.id, b.id);
        assert!(a.is_success());
        assert!(!b.is_success());
        assert_eq!(b.status.as_str(), "error");

        let time = a.display_time();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);

        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json["command"].is_null());
    }
}
