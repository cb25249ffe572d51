//! Bounded diagnostic trail owned by the drive instance.
//!
//! Operators get the last few operations as timestamped lines; everything is
//! mirrored to `tracing` so the trail works in both the UI and the logs.

use std::collections::VecDeque;

use chrono::Utc;
use parking_lot::Mutex;

pub const DEFAULT_CAPACITY: usize = 64;

pub struct DriveLog {
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
}

impl DriveLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::debug!(target: "firedrive::diag", "{message}");
        let line = format!("{} {}", Utc::now().format("%H:%M:%S"), message);
        let mut lines = self.lines.lock();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Oldest-first snapshot of the current trail.
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }
}

impl Default for DriveLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
