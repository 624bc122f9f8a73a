//! Bounded, timestamped trace of what the hub reported.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    /// Monotonic sequence number, unique per log.
    pub seq: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub message: String,
}

impl fmt::Display for ActivityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp_ms, self.message)
    }
}

#[derive(Debug)]
struct Inner {
    entries: VecDeque<ActivityEntry>,
    next_seq: u64,
}

/// Shared activity log. Clones refer to the same log.
///
/// Holds at most `capacity` entries; pushing past that evicts the oldest.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    inner: Arc<Mutex<Inner>>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity),
                next_seq: 0,
            })),
            capacity,
        }
    }

    /// Append an entry stamped with the current time.
    pub fn push(&self, message: impl Into<String>) {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        if self.capacity == 0 {
            return;
        }
        while inner.entries.len() >= self.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(ActivityEntry {
            seq,
            timestamp_ms,
            message: message.into(),
        });
    }

    /// Copy of every retained entry, oldest first.
    pub fn snapshot(&self) -> Vec<ActivityEntry> {
        self.lock().entries.iter().cloned().collect()
    }

    /// Retained entries with `seq >= from`, oldest first.
    pub fn since(&self, from: u64) -> Vec<ActivityEntry> {
        self.lock()
            .entries
            .iter()
            .filter(|e| e.seq >= from)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // A panic while holding the lock leaves the deque intact.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
