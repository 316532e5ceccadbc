//! Add/edit form logic for a single task.
//!
//! The form keeps a draft [`Task`] and an ordered list of fields. The due
//! date picker is only part of the layout while the due-date toggle is on.
//! Nothing reaches the store until [`TaskForm::save`] passes validation.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveTime, Offset, TimeZone, Utc};

use crate::error::{FormError, TaskListError, ValidationError};
use crate::store::TaskStore;
use crate::task::{Task, TaskPriority};

/// Whether the form creates a task or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Add,
    Edit,
}

/// One input field of the form, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    /// Shows or hides the due date picker.
    DueDateToggle,
    DueDatePicker,
    Priority,
}

impl FormField {
    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::DueDateToggle => "Due Date",
            Self::DueDatePicker => "",
            Self::Priority => "Priority",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::DueDateToggle => "due date toggle",
            Self::DueDatePicker => "due date",
            Self::Priority => "priority",
        }
    }
}

/// A value coming from one of the form's inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(DateTime<Utc>),
    Priority(TaskPriority),
    /// The due-date switch was flipped.
    Toggle,
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Date(_) => "a date",
            Self::Priority(_) => "a priority",
            Self::Toggle => "a toggle",
        }
    }
}

/// Receives form notifications.
pub trait FormObserver: Send + Sync {
    /// The due date picker was shown (`true`) or hidden.
    fn on_due_date_visibility_changed(&self, is_on: bool);

    /// Some draft attribute changed; the caller may enable its save action.
    fn on_changes_made(&self);

    /// Validation or the commit failed.
    fn on_error(&self, error: &TaskListError);
}

/// Midnight at the start of `now`'s calendar day, in `now`'s time zone.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    match now.timezone().from_local_datetime(&midnight).earliest() {
        Some(start) => start.with_timezone(&Utc),
        // Midnight skipped by a DST jump; fall back to the current offset.
        None => {
            let offset = now.offset().fix();
            Utc.from_utc_datetime(&(midnight - offset))
        }
    }
}

pub struct TaskForm {
    mode: DisplayMode,
    draft: Task,
    due_date_visible: bool,
    store: Arc<TaskStore>,
    observer: Arc<dyn FormObserver>,
}

impl TaskForm {
    /// A form for a brand new task.
    pub fn new_task(store: Arc<TaskStore>, observer: Arc<dyn FormObserver>) -> Self {
        Self {
            mode: DisplayMode::Add,
            draft: Task::draft(),
            due_date_visible: false,
            store,
            observer,
        }
    }

    /// A form editing `task`. The picker starts visible iff the task has a due date.
    pub fn edit_task(store: Arc<TaskStore>, task: Task, observer: Arc<dyn FormObserver>) -> Self {
        Self {
            mode: DisplayMode::Edit,
            due_date_visible: task.due_date().is_some(),
            draft: task,
            store,
            observer,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn draft(&self) -> &Task {
        &self.draft
    }

    pub fn is_due_date_visible(&self) -> bool {
        self.due_date_visible
    }

    /// Fields in display order.
    pub fn fields(&self) -> Vec<FormField> {
        if self.due_date_visible {
            vec![
                FormField::Title,
                FormField::DueDateToggle,
                FormField::DueDatePicker,
                FormField::Priority,
            ]
        } else {
            vec![FormField::Title, FormField::DueDateToggle, FormField::Priority]
        }
    }

    /// Apply an input from the field at `row`.
    ///
    /// Each call changes exactly one draft attribute (or the picker visibility)
    /// and then signals `on_changes_made`.
    pub fn handle_input(&mut self, row: usize, value: FieldValue) -> Result<(), TaskListError> {
        let fields = self.fields();
        let Some(&field) = fields.get(row) else {
            return Err(self.report(FormError::RowOutOfBounds {
                row,
                len: fields.len(),
            }));
        };

        match (field, value) {
            (FormField::Title, FieldValue::Text(title)) => self.draft.set_title(title),
            (FormField::DueDatePicker, FieldValue::Date(date)) => {
                self.draft.set_due_date(Some(date))
            }
            (FormField::Priority, FieldValue::Priority(priority)) => {
                self.draft.set_priority(priority)
            }
            (FormField::DueDateToggle, FieldValue::Toggle) => self.toggle_due_date(),
            (field, value) => {
                return Err(self.report(FormError::WrongValue {
                    field: field.name(),
                    value: value.kind(),
                }));
            }
        }

        self.observer.on_changes_made();
        Ok(())
    }

    fn toggle_due_date(&mut self) {
        if self.due_date_visible {
            self.draft.set_due_date(None);
        } else {
            self.draft.set_due_date(Some(Utc::now()));
        }
        self.due_date_visible = !self.due_date_visible;
        self.observer
            .on_due_date_visibility_changed(self.due_date_visible);
    }

    /// Run the save-time checks against the local calendar.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_at(&Local::now())
    }

    /// Run the save-time checks in order, stopping at the first failure.
    pub fn validate_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<(), ValidationError> {
        if self.draft.title().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.draft.priority().is_none() {
            return Err(ValidationError::PriorityNotChosen);
        }
        if let Some(due) = self.draft.due_date() {
            if due < start_of_day(now) {
                return Err(ValidationError::DueDateInPast);
            }
        }
        Ok(())
    }

    /// Validate the draft and commit it. Returns the saved task.
    pub async fn save(&self) -> Result<Task, TaskListError> {
        if let Err(e) = self.validate() {
            return Err(self.report(e));
        }

        if let Err(e) = self.store.save_task(self.draft.clone()).await {
            let context = match self.mode {
                DisplayMode::Add => "Failed to add new task",
                DisplayMode::Edit => "Failed to update task",
            };
            return Err(self.report(TaskListError::store(context, e)));
        }

        tracing::info!("Saved task '{}'", self.draft.title());
        Ok(self.draft.clone())
    }

    fn report(&self, error: impl Into<TaskListError>) -> TaskListError {
        let error = error.into();
        tracing::debug!("Form rejected input: {}", error);
        self.observer.on_error(&error);
        error
    }
}
