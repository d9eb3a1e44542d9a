//! Bounded, ordered log stream.
//!
//! Entries carry a monotonically increasing, gapless sequence number for
//! ordering guarantees. The buffer is a ring: once the configured capacity
//! is exceeded, the oldest entry is evicted. Reads are non-destructive
//! snapshots and may happen concurrently with the single writer.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Routine sub-step advance.
    Info,
    /// Final sub-step of a phase.
    Success,
    /// Fallback text substituted after a line source failure.
    Warning,
}

/// A single textual event emitted during a run.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Zero-based, strictly increasing sequence counter.
    pub sequence: u64,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
    /// Id of the phase that produced the entry.
    pub phase_id: String,
    /// The rendered line.
    pub message: String,
    /// Entry severity.
    pub level: LogLevel,
}

/// Bounded ring buffer of [`LogEntry`] values.
///
/// Sequence numbers are assigned atomically and keep increasing across
/// evictions, so readers can detect dropped history by gaps between the
/// head entry and their last cursor.
pub struct LogStream {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    sequence: AtomicU64,
}

impl LogStream {
    /// Creates a stream holding at most `capacity` entries.
    ///
    /// Capacity is clamped to at least 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            sequence: AtomicU64::new(0),
        }
    }

    /// Appends an entry, evicting the oldest when over capacity.
    ///
    /// Returns the sequence number assigned to the entry.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn append(&self, phase_id: &str, level: LogLevel, message: impl Into<String>) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let entry = LogEntry {
            sequence,
            timestamp: Utc::now(),
            phase_id: phase_id.to_owned(),
            message: message.into(),
            level,
        };

        let mut entries = self.entries.lock().expect("log stream lock poisoned");
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        sequence
    }

    /// Returns a snapshot of the buffered entries, most-recent-last.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .expect("log stream lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Returns buffered entries with `sequence >= cursor`, oldest first.
    ///
    /// Incremental readers advance their cursor to one past the last
    /// sequence they have seen.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn entries_since(&self, cursor: u64) -> Vec<LogEntry> {
        self.entries
            .lock()
            .expect("log stream lock poisoned")
            .iter()
            .filter(|e| e.sequence >= cursor)
            .cloned()
            .collect()
    }

    /// Returns the number of buffered entries.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("log stream lock poisoned").len()
    }

    /// Returns whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the sequence number the next appended entry will receive.
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStream")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("next_sequence", &self.next_sequence())
            .finish_non_exhaustive()
    }
}
