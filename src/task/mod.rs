//! Task module - the to-do entity and its priority levels.

mod priority;
pub mod task;

pub use priority::TaskPriority;
pub use task::{Task, TaskId};
