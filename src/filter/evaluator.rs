//! Tag filter evaluator
//!
//! Selects tasks from the registry by tag. Candidates come from the tag
//! index, one lookup per query tag, and are then checked against the
//! combinator:
//!
//! - `All` - the task carries every query tag
//! - `Any` - the task carries at least one query tag
//!
//! A task reachable through several query tags is returned once. An empty
//! query returns every task.

use crate::models::{Tag, TaskRecord, TaskRegistry, Title};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    #[default]
    All,
    Any,
}

impl Combinator {
    /// Evaluate the combinator against a task. Untagged tasks never match.
    pub fn matches(&self, record: &TaskRecord, tags: &[Tag]) -> bool {
        if record.tags.is_empty() {
            return false;
        }
        match self {
            Combinator::All => contains_all(record, tags),
            Combinator::Any => contains_any(record, tags),
        }
    }
}

pub fn contains_all(record: &TaskRecord, tags: &[Tag]) -> bool {
    !record.tags.is_empty() && tags.iter().all(|tag| record.tags.contains(tag))
}

pub fn contains_any(record: &TaskRecord, tags: &[Tag]) -> bool {
    tags.iter().any(|tag| record.tags.contains(tag))
}

/// Get tasks matching `tags` under `combinator`, in title order
pub fn filter_tasks<'a>(
    registry: &'a TaskRegistry,
    tags: &[Tag],
    combinator: Combinator,
) -> Vec<&'a TaskRecord> {
    if tags.is_empty() {
        return registry.tasks().collect();
    }

    let mut candidates: BTreeSet<&Title> = BTreeSet::new();
    for tag in tags {
        if let Some(titles) = registry.tag_index().titles(tag) {
            candidates.extend(titles.iter());
        }
    }

    candidates
        .into_iter()
        .filter_map(|title| registry.get(title))
        .filter(|record| combinator.matches(record, tags))
        .collect()
}

impl TaskRegistry {
    pub fn filter(&self, tags: &[Tag], combinator: Combinator) -> Vec<&TaskRecord> {
        filter_tasks(self, tags, combinator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryStatus;
    use chrono::{TimeZone, Utc};

    fn title(s: &str) -> Title {
        Title::new(s).unwrap()
    }

    fn tag(s: &str) -> Tag {
        Tag::parse(s).unwrap()
    }

    fn titles(records: &[&TaskRecord]) -> Vec<String> {
        records.iter().map(|r| r.title.to_string()).collect()
    }

    /// first: #tag1 #tag2, second: #tag1, third: untagged
    fn registry() -> TaskRegistry {
        let mut reg = TaskRegistry::new();
        for (i, t) in ["first", "second", "third"].iter().enumerate() {
            let now = Utc.timestamp_opt(1_704_067_200 + i as i64, 0).unwrap();
            reg.insert_entry_at(&title(t), EntryStatus::Active, now).unwrap();
        }
        reg.add_tag(&tag("#tag1"), &title("first")).unwrap();
        reg.add_tag(&tag("#tag2"), &title("first")).unwrap();
        reg.add_tag(&tag("#tag1"), &title("second")).unwrap();
        reg
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let reg = registry();
        assert_eq!(titles(&reg.filter(&[], Combinator::All)), vec!["first", "second", "third"]);
        assert_eq!(titles(&reg.filter(&[], Combinator::Any)), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_contains_any() {
        let reg = registry();
        let found = reg.filter(&[tag("#tag1"), tag("#tag2")], Combinator::Any);
        assert_eq!(titles(&found), vec!["first", "second"]);
    }

    #[test]
    fn test_contains_all() {
        let reg = registry();
        let found = reg.filter(&[tag("#tag1"), tag("#tag2")], Combinator::All);
        assert_eq!(titles(&found), vec!["first"]);
        let found = reg.filter(&[tag("#tag1")], Combinator::All);
        assert_eq!(titles(&found), vec!["first", "second"]);
    }

    #[test]
    fn test_contains_all_excludes_partial_matches() {
        let mut reg = registry();
        reg.add_tag(&tag("#tag2"), &title("third")).unwrap();
        let found = reg.filter(&[tag("#tag1"), tag("#tag2")], Combinator::All);
        assert_eq!(titles(&found), vec!["first"]);
    }

    #[test]
    fn test_no_duplicate_rows() {
        let reg = registry();
        let found = reg.filter(&[tag("#tag1"), tag("#tag2"), tag("#tag1")], Combinator::Any);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_unknown_tag_matches_nothing() {
        let reg = registry();
        assert!(reg.filter(&[tag("#nope")], Combinator::Any).is_empty());
        assert!(reg.filter(&[tag("#tag1"), tag("#nope")], Combinator::All).is_empty());
    }

    #[test]
    fn test_tag_round_trip() {
        let mut reg = registry();
        reg.add_tag(&tag("#fresh"), &title("third")).unwrap();
        assert_eq!(titles(&reg.filter(&[tag("#fresh")], Combinator::Any)), vec!["third"]);
        reg.remove_tag(&tag("#fresh"));
        assert!(reg.filter(&[tag("#fresh")], Combinator::Any).is_empty());
        assert!(reg.tag_index().titles(&tag("#fresh")).is_none());
    }

    #[test]
    fn test_remove_tag_then_filter() {
        let mut reg = registry();
        reg.remove_tag(&tag("#tag1"));
        assert!(reg.filter(&[tag("#tag1"), tag("#tag2")], Combinator::All).is_empty());
        assert_eq!(titles(&reg.filter(&[tag("#tag2")], Combinator::Any)), vec!["first"]);
    }

    #[test]
    fn test_combinators_reject_untagged() {
        let reg = registry();
        let third = reg.get(&title("third")).unwrap();
        assert!(!Combinator::All.matches(third, &[]));
        assert!(!Combinator::Any.matches(third, &[tag("#tag1")]));
        assert!(!contains_all(third, &[]));
    }
}
