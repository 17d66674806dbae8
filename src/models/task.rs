use crate::error::{Result, TrackerError};
use crate::models::{EntryStatus, SessionEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Column width used when wrapping titles for display
pub const TITLE_WRAP_WIDTH: usize = 10;

/// Task title, the unique key of a task in the registry.
///
/// Words are separated by single spaces and the title is never blank.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Title(String);

impl Title {
    pub fn new(raw: &str) -> Result<Self> {
        let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return Err(TrackerError::InvalidTitle);
        }
        Ok(Self(normalized))
    }

    /// Build a title from command line words (e.g. `start write the report`)
    pub fn from_args(args: &[String]) -> Result<Self> {
        Self::new(&args.join(" "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Title {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tag used to group tasks, stored lowercase with a leading `#`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Normalize a tag: trim, lowercase, single leading `#`.
    /// `"  Work"`, `"#work"` and `"#WORK"` all become `#work`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let name = trimmed.strip_prefix('#').unwrap_or(trimmed).to_lowercase();
        if name.is_empty() || name.contains('#') || name.chars().any(char::is_whitespace) {
            return Err(TrackerError::InvalidTag(raw.to_string()));
        }
        Ok(Self(format!("#{}", name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tracked task and its append-only session history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub title: Title,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<Tag>,
    #[serde(default)]
    pub history: Vec<SessionEntry>,
}

impl TaskRecord {
    pub fn new(title: Title, created_at: DateTime<Utc>) -> Self {
        Self {
            title,
            created_at,
            tags: BTreeSet::new(),
            history: Vec::new(),
        }
    }

    /// Most recent entry, or the zero-value sentinel for an empty history
    pub fn last(&self) -> SessionEntry {
        self.history.last().cloned().unwrap_or_else(SessionEntry::sentinel)
    }

    pub fn status(&self) -> EntryStatus {
        self.last().status
    }

    pub fn total_duration(&self) -> Duration {
        self.last().cumulative_duration
    }

    /// Append a status transition stamped with the current time
    pub fn append(&mut self, status: EntryStatus) -> Result<&SessionEntry> {
        self.append_at(status, Utc::now())
    }

    /// Append a status transition stamped with `now`.
    ///
    /// Fails with `HistoryOrder` if `status` would break the
    /// Active/Stopped alternation; the history is left untouched.
    pub fn append_at(&mut self, status: EntryStatus, now: DateTime<Utc>) -> Result<&SessionEntry> {
        let position = self.history.len();
        if EntryStatus::expected_at(position) != status {
            return Err(TrackerError::HistoryOrder {
                title: self.title.clone(),
                position,
                attempted: status,
            });
        }
        let entry = self.last().next(status, now).ok_or_else(|| {
            TrackerError::Inconsistent(format!("total duration of '{}' overflows", self.title))
        })?;
        self.history.push(entry);
        Ok(&self.history[position])
    }

    /// Verify that the history alternates Active, Stopped, ... from the start
    /// and that the cumulative duration starts at zero, is carried unchanged
    /// by Active entries and never shrinks on Stopped ones.
    pub fn check_history(&self) -> Result<()> {
        let mut previous = Duration::ZERO;
        for (position, entry) in self.history.iter().enumerate() {
            if entry.status != EntryStatus::expected_at(position) {
                return Err(TrackerError::HistoryOrder {
                    title: self.title.clone(),
                    position,
                    attempted: entry.status,
                });
            }
            let total = entry.cumulative_duration;
            let valid = match entry.status {
                EntryStatus::Active => total == previous,
                EntryStatus::Stopped => total >= previous,
            };
            if !valid {
                return Err(TrackerError::Inconsistent(format!(
                    "entry {} of '{}' has total duration {}s after {}s",
                    position,
                    self.title,
                    total.as_secs(),
                    previous.as_secs()
                )));
            }
            previous = total;
        }
        Ok(())
    }

    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    /// Returns true if the tag was present
    pub fn remove_tag(&mut self, tag: &Tag) -> bool {
        self.tags.remove(tag)
    }

    pub fn aggregate_row(&self) -> AggregateRow {
        self.aggregate_row_at(Utc::now())
    }

    /// Derive the display row for this task as of `now`.
    ///
    /// While the task is active (or has a single entry) the row shows the
    /// open session: started is the last entry and the session column is
    /// the time since it. Otherwise started/stopped are the last closed
    /// session's bounds.
    pub fn aggregate_row_at(&self, now: DateTime<Utc>) -> AggregateRow {
        let last = self.last();
        let open = self.history.len() < 2 || last.status == EntryStatus::Active;

        let (started, stopped, session) = if open {
            let started = self.history.last().map(|e| e.timestamp);
            let session = started.map(|ts| truncate_secs((now - ts).to_std().unwrap_or(Duration::ZERO)));
            (started, None, session)
        } else {
            let prev = &self.history[self.history.len() - 2];
            (Some(prev.timestamp), Some(last.timestamp), None)
        };

        AggregateRow {
            title: wrap_title(self.title.as_str(), TITLE_WRAP_WIDTH),
            created: self.created_at,
            started,
            stopped,
            total: truncate_secs(last.cumulative_duration),
            session,
            status: last.status,
        }
    }
}

/// Display tuple for one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateRow {
    pub title: String,
    pub created: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub stopped: Option<DateTime<Utc>>,
    pub total: Duration,
    pub session: Option<Duration>,
    pub status: EntryStatus,
}

fn truncate_secs(d: Duration) -> Duration {
    Duration::from_secs(d.as_secs())
}

/// Break a title into lines of at most `width` characters, splitting on
/// words only. A single word longer than `width` gets a line of its own.
pub fn wrap_title(title: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    for word in title.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_704_067_200 + secs, 0).unwrap()
    }

    fn record(title: &str) -> TaskRecord {
        TaskRecord::new(Title::new(title).unwrap(), at(0))
    }

    #[test]
    fn test_title_normalization() {
        assert_eq!(Title::new("  write   report ").unwrap().as_str(), "write report");
        let args = vec!["write".to_string(), "report".to_string()];
        assert_eq!(Title::from_args(&args).unwrap().as_str(), "write report");
        assert_eq!(Title::new("   "), Err(TrackerError::InvalidTitle));
        assert_eq!(Title::from_args(&[]), Err(TrackerError::InvalidTitle));
    }

    #[test]
    fn test_tag_normalization() {
        assert_eq!(Tag::parse("#work").unwrap().as_str(), "#work");
        assert_eq!(Tag::parse("  Work ").unwrap().as_str(), "#work");
        assert_eq!(Tag::parse("#WORK").unwrap(), Tag::parse("work").unwrap());
        assert!(Tag::parse("").is_err());
        assert!(Tag::parse("#").is_err());
        assert!(Tag::parse("two words").is_err());
        assert!(Tag::parse("##double").is_err());
    }

    #[test]
    fn test_append_alternates() {
        let mut task = record("a");
        task.append_at(EntryStatus::Active, at(0)).unwrap();
        task.append_at(EntryStatus::Stopped, at(60)).unwrap();
        task.append_at(EntryStatus::Active, at(120)).unwrap();
        for (i, entry) in task.history.iter().enumerate() {
            assert_eq!(entry.status, EntryStatus::expected_at(i));
        }
        assert!(task.check_history().is_ok());
    }

    #[test]
    fn test_append_out_of_order_is_fatal() {
        let mut task = record("a");
        let err = task.append_at(EntryStatus::Stopped, at(0)).unwrap_err();
        assert!(err.is_fatal());
        assert!(task.history.is_empty());

        task.append_at(EntryStatus::Active, at(0)).unwrap();
        let err = task.append_at(EntryStatus::Active, at(5)).unwrap_err();
        assert_eq!(
            err,
            TrackerError::HistoryOrder {
                title: task.title.clone(),
                position: 1,
                attempted: EntryStatus::Active,
            }
        );
        assert_eq!(task.history.len(), 1);
    }

    #[test]
    fn test_cumulative_duration() {
        let mut task = record("a");
        task.append_at(EntryStatus::Active, at(0)).unwrap();
        task.append_at(EntryStatus::Stopped, at(100)).unwrap();
        task.append_at(EntryStatus::Active, at(1000)).unwrap();
        assert_eq!(task.total_duration(), Duration::from_secs(100));
        task.append_at(EntryStatus::Stopped, at(1050)).unwrap();
        assert_eq!(task.total_duration(), Duration::from_secs(150));
    }

    #[test]
    fn test_last_on_empty_history_is_sentinel() {
        let task = record("a");
        assert_eq!(task.last(), SessionEntry::sentinel());
        assert_eq!(task.status(), EntryStatus::Stopped);
    }

    #[test]
    fn test_check_history_detects_corruption() {
        let mut task = record("a");
        task.history.push(SessionEntry {
            timestamp: at(0),
            cumulative_duration: Duration::ZERO,
            status: EntryStatus::Stopped,
        });
        assert!(task.check_history().unwrap_err().is_fatal());
    }

    fn entry(secs: i64, total: u64, status: EntryStatus) -> SessionEntry {
        SessionEntry {
            timestamp: at(secs),
            cumulative_duration: Duration::from_secs(total),
            status,
        }
    }

    #[test]
    fn test_check_history_rejects_bad_durations() {
        // first entry must start from zero
        let mut task = record("a");
        task.history.push(entry(0, 5, EntryStatus::Active));
        assert!(matches!(task.check_history(), Err(TrackerError::Inconsistent(_))));

        // stopping cannot shrink the total
        let mut task = record("a");
        task.history.push(entry(0, 0, EntryStatus::Active));
        task.history.push(entry(10, 30, EntryStatus::Stopped));
        task.history.push(entry(20, 30, EntryStatus::Active));
        task.history.push(entry(30, 3, EntryStatus::Stopped));
        assert!(task.check_history().unwrap_err().is_fatal());

        // resuming carries the total unchanged
        let mut task = record("a");
        task.history.push(entry(0, 0, EntryStatus::Active));
        task.history.push(entry(10, 10, EntryStatus::Stopped));
        task.history.push(entry(20, 500, EntryStatus::Active));
        assert!(task.check_history().is_err());

        let mut task = record("a");
        task.history.push(entry(0, 0, EntryStatus::Active));
        task.history.push(entry(10, 10, EntryStatus::Stopped));
        task.history.push(entry(20, 10, EntryStatus::Active));
        assert!(task.check_history().is_ok());
    }

    #[test]
    fn test_append_overflow_is_fatal() {
        let mut task = record("a");
        task.history.push(entry(0, 0, EntryStatus::Active));
        task.history.push(entry(1, u64::MAX, EntryStatus::Stopped));
        task.history.push(entry(2, u64::MAX, EntryStatus::Active));
        assert!(task.check_history().is_ok());

        let err = task.append_at(EntryStatus::Stopped, at(100)).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(task.history.len(), 3);
    }

    #[test]
    fn test_aggregate_row_active() {
        let mut task = record("a");
        task.append_at(EntryStatus::Active, at(10)).unwrap();
        let row = task.aggregate_row_at(at(75));
        assert_eq!(row.started, Some(at(10)));
        assert_eq!(row.stopped, None);
        assert_eq!(row.session, Some(Duration::from_secs(65)));
        assert_eq!(row.total, Duration::ZERO);
        assert_eq!(row.status, EntryStatus::Active);
    }

    #[test]
    fn test_aggregate_row_stopped() {
        let mut task = record("a");
        task.append_at(EntryStatus::Active, at(10)).unwrap();
        task.append_at(EntryStatus::Stopped, at(40)).unwrap();
        task.append_at(EntryStatus::Active, at(100)).unwrap();
        task.append_at(EntryStatus::Stopped, at(130)).unwrap();
        let row = task.aggregate_row_at(at(500));
        assert_eq!(row.started, Some(at(100)));
        assert_eq!(row.stopped, Some(at(130)));
        assert_eq!(row.session, None);
        assert_eq!(row.total, Duration::from_secs(60));
        assert_eq!(row.status, EntryStatus::Stopped);
    }

    #[test]
    fn test_aggregate_row_truncates_to_seconds() {
        let mut task = record("a");
        task.append_at(EntryStatus::Active, at(0)).unwrap();
        task.append_at(EntryStatus::Stopped, at(2) + chrono::Duration::milliseconds(750)).unwrap();
        assert_eq!(task.aggregate_row_at(at(10)).total, Duration::from_secs(2));
    }

    #[test]
    fn test_wrap_title() {
        assert_eq!(wrap_title("write report", 10), "write\nreport");
        assert_eq!(wrap_title("fix it now", 10), "fix it now");
        assert_eq!(wrap_title("a supercalifragilistic b", 10), "a\nsupercalifragilistic\nb");
        assert_eq!(wrap_title("", 10), "");
    }
}
