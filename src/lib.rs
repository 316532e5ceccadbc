//! # todo-list
//!
//! Core of a to-do list: a task store with transactional saves, the list
//! manager a UI drives with gestures, and the add/edit form logic.
//!
//! ## Architecture
//!
//! ```text
//!   UI event ──► TaskListManager / TaskForm
//!                        │
//!                        ▼
//!                 ┌─────────────┐      stage / delete / save
//!                 │  TaskStore  │ ◄──────────────────────────
//!                 └──────┬──────┘
//!                        │ commit(ChangeSet)
//!           ┌────────────┼────────────┐
//!           ▼            ▼            ▼
//!       in-memory    JSON file     SQLite
//! ```
//!
//! Observers hear about every outcome only after the manager's list has been
//! fully updated.
//!
//! ## Modules
//! - `task`: the to-do entity and priorities
//! - `store`: unit of work and storage backends
//! - `manager`: the ordered in-memory list and its operations
//! - `form`: draft editing and save-time validation
//! - `present`: row text for front ends

pub mod config;
pub mod error;
pub mod form;
pub mod manager;
pub mod present;
pub mod store;
pub mod task;

pub use config::Config;
pub use error::{FormError, StoreError, TaskListError, ValidationError};
pub use form::{DisplayMode, FieldValue, FormField, FormObserver, TaskForm};
pub use manager::{TaskListManager, TaskListObserver};
pub use store::{create_task_store, PrioritySort, StoreType, TaskStore};
pub use task::{Task, TaskId, TaskPriority};
