//! Display mapping for list rows. Kept outside the core types so a front end
//! can render tasks without reaching into them.

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::task::Task;

/// What a list row shows for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub title: String,
    /// "!!" for High, "!" for Medium, empty for Low or no priority.
    pub marker: String,
    /// "Due: MM/DD/YYYY" when the task has a due date.
    pub due_label: Option<String>,
    pub completed: bool,
}

impl TaskRow {
    /// Build a row using the local calendar for the due label.
    pub fn from_task(task: &Task) -> Self {
        Self::from_task_in(task, &Local)
    }

    pub fn from_task_in<Tz: TimeZone>(task: &Task, tz: &Tz) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            title: task.title().to_string(),
            marker: task
                .priority()
                .map(|p| p.marker().to_string())
                .unwrap_or_default(),
            due_label: task.due_date().map(|d| due_label(d, tz)),
            completed: task.is_completed(),
        }
    }
}

fn due_label<Tz: TimeZone>(date: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("Due: {}", date.with_timezone(tz).format("%m/%d/%Y"))
}

impl std::fmt::Display for TaskRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let check = if self.completed { "[x]" } else { "[ ]" };
        write!(f, "{} {:<2} {}", check, self.marker, self.title)?;
        if let Some(due) = &self.due_label {
            write!(f, "  ({})", due)?;
        }
        Ok(())
    }
}
