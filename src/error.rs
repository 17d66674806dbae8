//! Error types for the task registry
//!
//! Recoverable errors (`NotFound`, `InvalidTag`, `InvalidTitle`) are caused by
//! user input. `HistoryOrder` and `Inconsistent` mean the registry is corrupt;
//! the operation that hit them must be aborted and nothing persisted.

use crate::models::{EntryStatus, Title};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Task '{0}' not found")]
    NotFound(Title),

    #[error("Invalid tag: '{0}'. Tags are single words, e.g. #work")]
    InvalidTag(String),

    #[error("Task title cannot be empty")]
    InvalidTitle,

    #[error("Session history of '{title}' is corrupt: entry {position} cannot be {attempted}")]
    HistoryOrder {
        title: Title,
        position: usize,
        attempted: EntryStatus,
    },

    #[error("Registry is inconsistent: {0}")]
    Inconsistent(String),
}

impl TrackerError {
    /// Whether this error signals registry corruption
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::HistoryOrder { .. } | Self::Inconsistent(_))
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
