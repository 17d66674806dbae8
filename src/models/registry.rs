//! Task registry: the root aggregate holding every task, the active pointer,
//! and the tag index.
//!
//! Invariants maintained by every mutation:
//! - at most one task is active, and it is the one named by `current_active`
//! - every `(tag, title)` pair in the tag index is also in that task's tag set,
//!   and vice versa

use crate::error::{Result, TrackerError};
use crate::models::{EntryStatus, Tag, TaskRecord, Title};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Secondary index from tag to the titles carrying it.
/// Tags with no titles are never kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagIndex {
    view: BTreeMap<Tag, BTreeSet<Title>>,
}

impl TagIndex {
    pub fn titles(&self, tag: &Tag) -> Option<&BTreeSet<Title>> {
        self.view.get(tag)
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.view.contains_key(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &BTreeSet<Title>)> {
        self.view.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    fn insert(&mut self, tag: Tag, title: Title) {
        self.view.entry(tag).or_default().insert(title);
    }

    fn remove_pair(&mut self, tag: &Tag, title: &Title) {
        if let Some(titles) = self.view.get_mut(tag) {
            titles.remove(title);
            if titles.is_empty() {
                self.view.remove(tag);
            }
        }
    }

    fn take(&mut self, tag: &Tag) -> Option<BTreeSet<Title>> {
        self.view.remove(tag)
    }

    fn clear(&mut self) {
        self.view.clear();
    }
}

/// Outcome of a registry state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// `title` became active; `stopped` is the task that was auto-stopped
    Started {
        title: Title,
        stopped: Option<Title>,
        created: bool,
    },
    Stopped {
        title: Title,
    },
    AlreadyActive {
        title: Title,
    },
    NothingToStop,
    NothingToResume,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRegistry {
    #[serde(default)]
    current_active: Option<Title>,
    #[serde(default)]
    last_active: Option<Title>,
    #[serde(default)]
    tasks: BTreeMap<Title, TaskRecord>,
    #[serde(default)]
    tags: TagIndex,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_active(&self) -> Option<&Title> {
        self.current_active.as_ref()
    }

    /// Most recently active title. May name a task that has since been removed.
    pub fn last_active(&self) -> Option<&Title> {
        self.last_active.as_ref()
    }

    pub fn current(&self) -> Option<&TaskRecord> {
        self.current_active.as_ref().and_then(|t| self.tasks.get(t))
    }

    pub fn get(&self, title: &Title) -> Option<&TaskRecord> {
        self.tasks.get(title)
    }

    pub fn contains(&self, title: &Title) -> bool {
        self.tasks.contains_key(title)
    }

    /// All tasks in title order
    pub fn tasks(&self) -> impl Iterator<Item = &TaskRecord> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tag_index(&self) -> &TagIndex {
        &self.tags
    }

    pub fn insert_entry(&mut self, title: &Title, status: EntryStatus) -> Result<Transition> {
        self.insert_entry_at(title, status, Utc::now())
    }

    /// Drive the active/stopped state machine for `title`.
    ///
    /// | target is current | status  | effect                                   |
    /// |-------------------|---------|------------------------------------------|
    /// | yes               | Stopped | stop it, move it to `last_active`        |
    /// | yes               | Active  | nothing                                  |
    /// | no                | Active  | stop current (if any), activate `title`  |
    /// | no                | Stopped | nothing                                  |
    pub fn insert_entry_at(
        &mut self,
        title: &Title,
        status: EntryStatus,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let is_current = self.current_active.as_ref() == Some(title);
        let transition = match (is_current, status) {
            (true, EntryStatus::Stopped) => self.stop_current(title, now)?,
            (true, EntryStatus::Active) => Transition::AlreadyActive { title: title.clone() },
            (false, EntryStatus::Active) => self.switch_active(title, now)?,
            (false, EntryStatus::Stopped) => Transition::NothingToStop,
        };
        debug!("{} {:?} -> {:?}", title, status, transition);
        Ok(transition)
    }

    fn stop_current(&mut self, title: &Title, now: DateTime<Utc>) -> Result<Transition> {
        let Some(record) = self.tasks.get_mut(title) else {
            return Ok(Transition::NothingToStop);
        };
        record.append_at(EntryStatus::Stopped, now)?;
        self.last_active = self.current_active.take();
        Ok(Transition::Stopped { title: title.clone() })
    }

    fn switch_active(&mut self, title: &Title, now: DateTime<Utc>) -> Result<Transition> {
        // Refuse before touching the current task so a corrupt target leaves
        // the registry as it was.
        if let Some(record) = self.tasks.get(title) {
            let position = record.history.len();
            if EntryStatus::expected_at(position) != EntryStatus::Active {
                return Err(TrackerError::HistoryOrder {
                    title: title.clone(),
                    position,
                    attempted: EntryStatus::Active,
                });
            }
        }

        let mut stopped = None;
        if let Some(previous) = self.current_active.clone() {
            if let Some(record) = self.tasks.get_mut(&previous) {
                record.append_at(EntryStatus::Stopped, now)?;
                stopped = Some(previous);
            }
        }
        self.last_active = self.current_active.replace(title.clone());

        let created = !self.tasks.contains_key(title);
        let record = self
            .tasks
            .entry(title.clone())
            .or_insert_with(|| TaskRecord::new(title.clone(), now));
        record.append_at(EntryStatus::Active, now)?;

        Ok(Transition::Started {
            title: title.clone(),
            stopped,
            created,
        })
    }

    pub fn stop_active(&mut self) -> Result<Transition> {
        self.stop_active_at(Utc::now())
    }

    pub fn stop_active_at(&mut self, now: DateTime<Utc>) -> Result<Transition> {
        match self.current_active.clone() {
            Some(title) => self.insert_entry_at(&title, EntryStatus::Stopped, now),
            None => Ok(Transition::NothingToStop),
        }
    }

    /// Title `resume` would activate: the current task, else the last active
    /// one if it still exists. A removed `last_active` counts as nothing.
    pub fn resume_target(&self) -> Option<&Title> {
        self.current_active
            .as_ref()
            .or_else(|| self.last_active.as_ref().filter(|t| self.tasks.contains_key(*t)))
    }

    pub fn resume(&mut self) -> Result<Transition> {
        self.resume_at(Utc::now())
    }

    pub fn resume_at(&mut self, now: DateTime<Utc>) -> Result<Transition> {
        match self.resume_target().cloned() {
            Some(title) => self.insert_entry_at(&title, EntryStatus::Active, now),
            None => Ok(Transition::NothingToResume),
        }
    }

    /// Remove a task and every tag association pointing at it.
    ///
    /// Removing the active task clears `current_active` and leaves the removed
    /// title in `last_active`.
    pub fn remove_by_title(&mut self, title: &Title) -> Option<TaskRecord> {
        let record = self.tasks.remove(title)?;
        for tag in &record.tags {
            self.tags.remove_pair(tag, title);
        }
        if self.current_active.as_ref() == Some(title) {
            self.current_active = None;
            self.last_active = Some(title.clone());
        }
        debug!("removed task '{}'", title);
        Some(record)
    }

    /// Remove every task together with the tag index. Returns how many tasks
    /// were removed. `last_active` is kept.
    pub fn remove_all(&mut self) -> usize {
        let removed = self.tasks.len();
        self.tasks.clear();
        self.tags.clear();
        self.current_active = None;
        debug!("removed all {} tasks", removed);
        removed
    }

    /// Attach `tag` to `title`. Returns false if the task already had it.
    pub fn add_tag(&mut self, tag: &Tag, title: &Title) -> Result<bool> {
        let record = self
            .tasks
            .get_mut(title)
            .ok_or_else(|| TrackerError::NotFound(title.clone()))?;
        let added = record.tags.insert(tag.clone());
        self.tags.insert(tag.clone(), title.clone());
        Ok(added)
    }

    /// Remove `tag` from every task. Returns the titles that carried it;
    /// an unknown tag is a no-op.
    pub fn remove_tag(&mut self, tag: &Tag) -> Vec<Title> {
        let Some(titles) = self.tags.take(tag) else {
            return Vec::new();
        };
        for title in &titles {
            if let Some(record) = self.tasks.get_mut(title) {
                record.remove_tag(tag);
            }
        }
        titles.into_iter().collect()
    }

    /// Remove `tag` from a single task. Returns false if it was not tagged.
    pub fn untag(&mut self, tag: &Tag, title: &Title) -> Result<bool> {
        let record = self
            .tasks
            .get_mut(title)
            .ok_or_else(|| TrackerError::NotFound(title.clone()))?;
        let removed = record.remove_tag(tag);
        self.tags.remove_pair(tag, title);
        Ok(removed)
    }

    /// Every tag with the number of tasks carrying it, in tag order
    pub fn tag_counts(&self) -> Vec<(&Tag, usize)> {
        self.tags.iter().map(|(tag, titles)| (tag, titles.len())).collect()
    }

    /// Verify the registry invariants, typically right after loading a snapshot
    pub fn check_consistency(&self) -> Result<()> {
        for (key, record) in &self.tasks {
            if key != &record.title {
                return Err(TrackerError::Inconsistent(format!(
                    "task stored under '{}' is titled '{}'",
                    key, record.title
                )));
            }
            if Title::new(key.as_str()).as_ref() != Ok(key) {
                return Err(TrackerError::Inconsistent(format!(
                    "task title '{}' is not normalized",
                    key
                )));
            }
            if let Some(tag) = record.tags.iter().find(|t| Tag::parse(t.as_str()).as_ref() != Ok(*t)) {
                return Err(TrackerError::Inconsistent(format!(
                    "tag '{}' on '{}' is not normalized",
                    tag, key
                )));
            }
            record.check_history()?;
            let is_current = self.current_active.as_ref() == Some(key);
            if record.status() == EntryStatus::Active && !is_current {
                return Err(TrackerError::Inconsistent(format!(
                    "'{}' is active but '{}' is the current task",
                    key,
                    self.current_active.as_ref().map(Title::as_str).unwrap_or("nothing")
                )));
            }
            for tag in &record.tags {
                if !self.tags.titles(tag).is_some_and(|titles| titles.contains(key)) {
                    return Err(TrackerError::Inconsistent(format!(
                        "tag {} on '{}' is missing from the tag index",
                        tag, key
                    )));
                }
            }
        }

        if let Some(current) = &self.current_active {
            match self.tasks.get(current) {
                Some(record) if record.status() == EntryStatus::Active => {}
                Some(_) => {
                    return Err(TrackerError::Inconsistent(format!(
                        "current task '{}' is not active",
                        current
                    )))
                }
                None => {
                    return Err(TrackerError::Inconsistent(format!(
                        "current task '{}' does not exist",
                        current
                    )))
                }
            }
        }

        for (tag, titles) in self.tags.iter() {
            if titles.is_empty() {
                return Err(TrackerError::Inconsistent(format!("tag {} has no tasks", tag)));
            }
            for title in titles {
                if !self.tasks.get(title).is_some_and(|r| r.has_tag(tag)) {
                    return Err(TrackerError::Inconsistent(format!(
                        "tag index maps {} to '{}' which does not carry it",
                        tag, title
                    )));
                }
            }
        }
        Ok(())
    }
}
