//! Core Task type, its priority scale, and the orderings used for display.
//!
//! # Invariants
//! - `completed_at.is_some()` if and only if the task is completed
//! - `name` is non-empty and at most [`MAX_TASK_NAME_LEN`] characters
//! - every task belongs to exactly one owner

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum task name length, in characters.
pub const MAX_TASK_NAME_LEN: usize = 200;

/// Format users type deadlines in.
pub const DEADLINE_INPUT_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Opaque per-platform user identifier.
///
/// Every store operation is scoped by one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A chat user. Created lazily on first interaction, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Persistent task identifier (assigned by the store, monotonically increasing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task priority. Ordered `Low < Medium < High`; stored as 1, 2, 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Numeric value used by the relational schema.
    pub fn value(self) -> i64 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn from_value(value: i64) -> Result<Self, TaskError> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            other => Err(TaskError::UnknownPriority(other)),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Priority::Low => "⚪",
            Priority::Medium => "🟡",
            Priority::High => "🔴",
        }
    }

    /// Token suffix used by the priority buttons (`priority_<slug>`).
    pub fn slug(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// Fields needed to create a task. The store assigns id, owner and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Priority,
    pub deadline: Option<NaiveDateTime>,
}

impl NewTask {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDateTime) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// A stored task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner: UserId,
    pub name: String,
    pub description: Option<String>,
    /// Free-text category; not required to match a stored `Category`.
    pub category: Option<String>,
    pub priority: Priority,
    /// Naive local date-time, as typed by the user.
    pub deadline: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
    /// Set iff the task is completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Ordering of the task list: priority descending, deadline ascending with
    /// tasks without a deadline last, then insertion order.
    pub fn list_order(a: &Task, b: &Task) -> Ordering {
        b.priority
            .cmp(&a.priority)
            .then_with(|| match (a.deadline, b.deadline) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Ordering of the today and per-category views: priority descending,
    /// then creation time, then insertion order.
    pub fn agenda_order(a: &Task, b: &Task) -> Ordering {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Validate and normalise a task name.
pub fn validate_task_name(raw: &str) -> Result<String, TaskError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(TaskError::EmptyName);
    }
    if name.chars().count() > MAX_TASK_NAME_LEN {
        return Err(TaskError::NameTooLong {
            max: MAX_TASK_NAME_LEN,
        });
    }
    Ok(name.to_string())
}

/// Parse a deadline typed as `DD-MM-YYYY HH:MM:SS`.
pub fn parse_deadline(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), DEADLINE_INPUT_FORMAT).ok()
}

/// Errors that can occur while validating task data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task name cannot be empty")]
    EmptyName,

    #[error("Task name is too long (max {max} characters)")]
    NameTooLong { max: usize },

    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    #[error("Category name is too long (max {max} characters)")]
    CategoryNameTooLong { max: usize },

    #[error("Unknown priority value: {0}")]
    UnknownPriority(i64),
}
