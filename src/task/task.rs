//! Core Task type.
//!
//! # Invariants
//! - A task accepted by the store has a non-empty `title` and a chosen priority
//! - `is_completed` only moves from `false` to `true`

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::priority::TaskPriority;

/// Unique identifier for a task.
///
/// # Properties
/// - Assigned when the draft is created, before the task is ever persisted
/// - Immutable once created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Create a new unique task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an ID from its string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A to-do item.
///
/// `priority` keeps the raw stored value: `0` means no priority has been
/// chosen yet, `1..=3` map onto [`TaskPriority`]. Ordering in the store is by
/// this raw value, so High (1) sorts first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    priority: i16,
    #[serde(default)]
    is_completed: bool,
    created_at: DateTime<Utc>,
}

impl Task {
    /// Create an empty draft: no title, no due date, no priority.
    pub fn draft() -> Self {
        Self {
            id: TaskId::new(),
            title: String::new(),
            due_date: None,
            priority: 0,
            is_completed: false,
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    /// Create a draft with a title and priority already filled in.
    pub fn new(title: impl Into<String>, priority: TaskPriority) -> Self {
        let mut task = Self::draft();
        task.title = title.into();
        task.set_priority(priority);
        task
    }

    /// Rebuild a task from stored columns.
    pub(crate) fn from_parts(
        id: TaskId,
        title: String,
        due_date: Option<DateTime<Utc>>,
        priority: i16,
        is_completed: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            due_date,
            priority,
            is_completed,
            created_at,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    /// Raw priority value as persisted (`0` = not chosen).
    pub fn raw_priority(&self) -> i16 {
        self.priority
    }

    /// The chosen priority, or `None` while the user hasn't picked one.
    pub fn priority(&self) -> Option<TaskPriority> {
        TaskPriority::from_raw(self.priority)
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Timestamps are kept at microsecond precision, which is what the
    /// stores persist.
    pub fn set_due_date(&mut self, due_date: Option<DateTime<Utc>>) {
        self.due_date = due_date.map(|d| d.trunc_subsecs(6));
    }

    pub fn set_priority(&mut self, priority: TaskPriority) {
        self.priority = priority.raw();
    }

    /// Mark the task as completed. There is no way back.
    pub fn mark_completed(&mut self) {
        self.is_completed = true;
    }

    /// Returns a copy of this task with `is_completed` set.
    pub fn completed(&self) -> Self {
        let mut task = self.clone();
        task.mark_completed();
        task
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_has_no_title_or_priority() {
        let draft = Task::draft();
        assert_eq!(draft.title(), "");
        assert_eq!(draft.raw_priority(), 0);
        assert!(draft.priority().is_none());
        assert!(!draft.is_completed());
    }

    #[test]
    fn test_new_task_keeps_raw_priority() {
        let task = Task::new("Buy milk", TaskPriority::High);
        assert_eq!(task.raw_priority(), 1);
        assert_eq!(task.priority(), Some(TaskPriority::High));
    }

    #[test]
    fn test_completed_copy_leaves_original_untouched() {
        let task = Task::new("Walk dog", TaskPriority::Low);
        let done = task.completed();
        assert!(done.is_completed());
        assert!(!task.is_completed());
        assert_eq!(done.id(), task.id());
    }

    #[test]
    fn test_task_json_shape() {
        let task = Task::new("Pay rent", TaskPriority::Medium);
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["title"], "Pay rent");
        assert_eq!(json["priority"], 2);
        assert_eq!(json["is_completed"], false);
        assert!(json.get("due_date").is_none());
        assert_eq!(json["id"], task.id().to_string());
    }
}
