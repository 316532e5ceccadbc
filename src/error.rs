//! Error types for the store, the form and the list manager.
//!
//! Every error here is recoverable: the in-memory list stays usable and the
//! caller decides whether to retry.

use thiserror::Error;

/// Failure reading from or writing to the task store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Store worker failed: {0}")]
    Worker(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Worker(e.to_string())
    }
}

/// A draft that failed one of the save-time checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a title for your task")]
    EmptyTitle,

    #[error("Please select a priority for your task")]
    PriorityNotChosen,

    #[error("Please select a future due date for your task")]
    DueDateInPast,
}

/// Input that doesn't fit the form's field layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Row {row} is out of bounds ({len} fields)")]
    RowOutOfBounds { row: usize, len: usize },

    #[error("Field '{field}' does not accept {value}")]
    WrongValue { field: &'static str, value: &'static str },
}

/// Anything a list or form operation reports to its observer.
#[derive(Debug, Error)]
pub enum TaskListError {
    #[error("Index {index} is out of bounds")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("To Do Item is already completed.")]
    AlreadyCompleted,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error("{context}\n{source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl TaskListError {
    pub(crate) fn store(context: &'static str, source: StoreError) -> Self {
        TaskListError::Store { context, source }
    }

    /// Whether the failure came from the store rather than from the request.
    pub fn is_store_error(&self) -> bool {
        matches!(self, TaskListError::Store { .. })
    }
}
