//! Human-readable event log.
//!
//! Bounded, newest-first history of what happened in the room. Independent
//! of the snapshot: entries survive snapshot replacement.

use std::collections::VecDeque;
use std::fmt;

/// Maximum entries kept; older ones are evicted silently.
pub const MAX_LOG_ENTRIES: usize = 50;

/// Rendered when the log is empty.
pub const EMPTY_LOG_TEXT: &str = "No events yet";

/// Visual category of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogCategory {
    #[default]
    Info,
    Success,
    Warning,
    Battle,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Battle => "battle",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finalized log line (may span several text lines).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub category: LogCategory,
    pub message: String,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, category: LogCategory) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            category,
            message: message.into(),
        }
    }

    /// Local wall-clock time, `HH:MM:SS`.
    pub fn time_label(&self) -> String {
        self.timestamp
            .with_timezone(&chrono::Local)
            .format("%H:%M:%S")
            .to_string()
    }
}

/// Append-only (from the consumer's side) ring of log entries.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LOG_ENTRIES)
    }

    /// Log with a custom bound (at least one entry).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert at the front, evicting the oldest entry when full.
    pub fn append(&mut self, message: impl Into<String>, category: LogCategory) -> &LogEntry {
        self.push(LogEntry::new(message, category))
    }

    /// Insert a prebuilt entry at the front.
    pub fn push(&mut self, entry: LogEntry) -> &LogEntry {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
        &self.entries[0]
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

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Text lines, newest first, or the empty-log sentinel.
    pub fn render(&self) -> Vec<String> {
        if self.entries.is_empty() {
            return vec![EMPTY_LOG_TEXT.to_string()];
        }

        self.entries
            .iter()
            .map(|e| format!("[{}] {}", e.time_label(), e.message))
            .collect()
    }
}
