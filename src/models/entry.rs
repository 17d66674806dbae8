use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Status carried by a session entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Active,
    Stopped,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Active => "ACTIVE",
            EntryStatus::Stopped => "STOPPED",
        }
    }

    /// Status an entry at `position` must carry: even positions open a
    /// session, odd positions close it.
    pub fn expected_at(position: usize) -> Self {
        if position % 2 == 0 {
            EntryStatus::Active
        } else {
            EntryStatus::Stopped
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a task taken when it changes status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub timestamp: DateTime<Utc>,
    pub cumulative_duration: Duration,
    pub status: EntryStatus,
}

impl SessionEntry {
    /// Zero-value entry used when the history is empty
    pub fn sentinel() -> Self {
        Self {
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            cumulative_duration: Duration::ZERO,
            status: EntryStatus::Stopped,
        }
    }

    /// Build the entry that follows `self` at `now`.
    ///
    /// Only a Stopped transition adds the time elapsed since `self`; an
    /// Active transition carries the total forward unchanged. A clock
    /// that went backwards contributes nothing. Returns None if the total
    /// would overflow.
    pub fn next(&self, status: EntryStatus, now: DateTime<Utc>) -> Option<Self> {
        let mut cumulative_duration = self.cumulative_duration;
        if status == EntryStatus::Stopped {
            let elapsed = (now - self.timestamp).to_std().unwrap_or(Duration::ZERO);
            cumulative_duration = cumulative_duration.checked_add(elapsed)?;
        }
        Some(Self {
            timestamp: now,
            cumulative_duration,
            status,
        })
    }
}
