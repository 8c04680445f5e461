//! Live audit trail.
//!
//! A capped, newest-first log of human-readable events. Entries are never
//! edited or removed individually; the oldest fall off once the log is full.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of entries the audit trail retains.
pub const LOG_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

/// A single audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    /// Insertion counter; breaks ties between entries with equal timestamps.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    next_seq: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(LOG_CAPACITY + 1),
            next_seq: 0,
        }
    }

    /// Prepend an entry, dropping the oldest beyond [`LOG_CAPACITY`].
    pub fn append(&mut self, event: impl Into<String>, severity: Severity) -> &LogEntry {
        let entry = LogEntry {
            id: Uuid::new_v4().to_string(),
            seq: self.next_seq,
            timestamp: Utc::now(),
            event: event.into(),
            severity,
        };
        self.next_seq += 1;
        tracing::debug!(severity = ?entry.severity, event = %entry.event, "audit");

        self.entries.push_front(entry);
        self.entries.truncate(LOG_CAPACITY);
        &self.entries[0]
    }

    pub fn info(&mut self, event: impl Into<String>) -> &LogEntry {
        self.append(event, Severity::Info)
    }

    pub fn warning(&mut self, event: impl Into<String>) -> &LogEntry {
        self.append(event, Severity::Warning)
    }

    pub fn critical(&mut self, event: impl Into<String>) -> &LogEntry {
        self.append(event, Severity::Critical)
    }

    /// Entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}
