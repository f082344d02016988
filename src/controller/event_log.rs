//! Bounded event log. Oldest entries are evicted first.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::Serialize;

pub const DEFAULT_LOG_CAPACITY: usize = 20;
pub const MAX_LOG_CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl EventLog {
    /// `capacity` is clamped to `1..=MAX_LOG_CAPACITY`.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_LOG_CAPACITY);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp: Local::now(),
            message: message.into(),
        });
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

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Oldest first.
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn messages(log: &EventLog) -> Vec<String> {
        log.iter().map(|e| e.message.clone()).collect()
    }

    #[test]
    fn keeps_insertion_order_below_capacity() {
        let mut log = EventLog::default();
        log.push("a");
        log.push("b");
        assert_eq!(messages(&log), vec!["a", "b"]);
        assert_eq!(log.capacity(), 20);
    }

    #[test]
    fn never_exceeds_capacity_and_evicts_oldest_first() {
        let mut log = EventLog::default();
        for i in 0..25 {
            log.push(format!("entry {}", i));
        }

        assert_eq!(log.len(), 20);
        let expected: Vec<String> = (5..25).map(|i| format!("entry {}", i)).collect();
        assert_eq!(messages(&log), expected);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut log = EventLog::with_capacity(0);
        log.push("first");
        log.push("second");
        assert_eq!(messages(&log), vec!["second"]);
    }

    #[test]
    fn oversized_capacity_is_clamped() {
        let mut log = EventLog::with_capacity(100);
        for i in 0..30 {
            log.push(format!("entry {}", i));
        }
        assert_eq!(log.capacity(), MAX_LOG_CAPACITY);
        assert_eq!(log.len(), 20);
    }

    #[test]
    fn timestamps_are_non_decreasing() {
        let mut log = EventLog::with_capacity(3);
        log.push("x");
        log.push("y");
        let stamps: Vec<_> = log.iter().map(|e| e.timestamp).collect();
        assert!(stamps[0] <= stamps[1]);
    }
}
