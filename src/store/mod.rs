//! Task storage with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `file`: JSON snapshot file
//! - `sqlite`: SQLite database
//!
//! [`TaskStore`] is the unit of work in front of a backend: callers stage
//! inserts, updates and deletes, then [`TaskStore::save`] commits the whole
//! pending set as one transaction. A failed commit leaves the durable state
//! untouched and drops the pending set.
//!
//! Callers that own a single change ([`TaskStore::save_task`],
//! [`TaskStore::delete_task`]) commit it directly and never see or disturb
//! what others have staged.

mod file;
mod memory;
mod sqlite;

pub use file::FileBackend;
pub use memory::InMemoryBackend;
pub use sqlite::SqliteBackend;

use crate::error::StoreError;
use crate::task::{Task, TaskId};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Order in which `fetch_all` returns tasks. Ties on priority fall back to
/// creation time, then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrioritySort {
    /// High (1) first.
    #[default]
    Ascending,
    Descending,
}

/// Sort tasks by raw priority, then `created_at`, then id.
pub fn sort_tasks(tasks: &mut [Task], order: PrioritySort) {
    tasks.sort_by(|a, b| {
        let by_priority = a.raw_priority().cmp(&b.raw_priority());
        let by_priority = match order {
            PrioritySort::Ascending => by_priority,
            PrioritySort::Descending => by_priority.reverse(),
        };
        by_priority
            .then_with(|| a.created_at().cmp(&b.created_at()))
            .then_with(|| a.id().cmp(&b.id()))
    });
}

/// Sanitize a string for use as a filename.
pub fn sanitize_filename(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        "default".to_string()
    } else {
        out
    }
}

/// Pending mutations waiting for the next commit.
///
/// A task is either upserted or deleted, never both: staging a task cancels a
/// pending delete of the same id and vice versa.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    upserts: BTreeMap<TaskId, Task>,
    deletes: BTreeSet<TaskId>,
}

impl ChangeSet {
    pub fn upsert(&mut self, task: Task) {
        self.deletes.remove(&task.id());
        self.upserts.insert(task.id(), task);
    }

    pub fn delete(&mut self, id: TaskId) {
        self.upserts.remove(&id);
        self.deletes.insert(id);
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.upserts.len() + self.deletes.len()
    }

    pub fn upserts(&self) -> impl Iterator<Item = &Task> {
        self.upserts.values()
    }

    pub fn deletes(&self) -> impl Iterator<Item = &TaskId> {
        self.deletes.iter()
    }

    /// Check every staged task against the store's constraints.
    pub fn check_constraints(&self) -> Result<(), StoreError> {
        for task in self.upserts() {
            if task.title().is_empty() {
                return Err(StoreError::Constraint(format!(
                    "task {} has an empty title",
                    task.id()
                )));
            }
            if task.priority().is_none() {
                return Err(StoreError::Constraint(format!(
                    "task {} has no priority (raw value {})",
                    task.id(),
                    task.raw_priority()
                )));
            }
        }
        Ok(())
    }

    /// Apply the change set to a map of tasks keyed by id.
    pub fn apply_to(&self, tasks: &mut HashMap<TaskId, Task>) {
        for id in &self.deletes {
            tasks.remove(id);
        }
        for task in self.upserts.values() {
            tasks.insert(task.id(), task.clone());
        }
    }
}

/// Storage backend trait - implemented by all backends.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Whether this backend persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Load every stored task in the requested order.
    async fn load_all(&self, order: PrioritySort) -> Result<Vec<Task>, StoreError>;

    /// Apply a change set atomically: either all of it lands or none of it.
    async fn commit(&self, changes: &ChangeSet) -> Result<(), StoreError>;
}

/// Unit of work over a [`StoreBackend`].
pub struct TaskStore {
    backend: Box<dyn StoreBackend>,
    pending: Mutex<ChangeSet>,
}

impl TaskStore {
    pub fn new(backend: impl StoreBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            pending: Mutex::new(ChangeSet::default()),
        }
    }

    /// A store backed by a fresh in-memory map.
    pub fn in_memory() -> Self {
        Self::new(InMemoryBackend::new())
    }

    pub fn is_persistent(&self) -> bool {
        self.backend.is_persistent()
    }

    /// Every committed task in the requested order. Pending changes are not visible.
    pub async fn fetch_all(&self, order: PrioritySort) -> Result<Vec<Task>, StoreError> {
        let tasks = self.backend.load_all(order).await?;
        tracing::debug!("Fetched {} tasks", tasks.len());
        Ok(tasks)
    }

    /// Record an insert or update to be committed by the next `save`.
    pub async fn stage(&self, task: Task) {
        self.pending.lock().await.upsert(task);
    }

    /// Mark a task for removal. Takes effect on the next `save`.
    pub async fn delete(&self, task: &Task) {
        self.pending.lock().await.delete(task.id());
    }

    /// Commit all pending changes as one transaction.
    ///
    /// The pending set is cleared whether the commit succeeds or not.
    pub async fn save(&self) -> Result<(), StoreError> {
        let mut pending = self.pending.lock().await;
        let changes = std::mem::take(&mut *pending);
        self.commit(&changes).await
    }

    /// Insert or update one task in its own transaction.
    ///
    /// Changes staged by other callers are left pending, so a failure here
    /// never drops them and their failures never drop this one.
    pub async fn save_task(&self, task: Task) -> Result<(), StoreError> {
        let mut changes = ChangeSet::default();
        changes.upsert(task);
        self.commit(&changes).await
    }

    /// Delete one task in its own transaction. See [`save_task`](Self::save_task).
    pub async fn delete_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut changes = ChangeSet::default();
        changes.delete(task.id());
        self.commit(&changes).await
    }

    async fn commit(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }

        changes.check_constraints()?;
        self.backend.commit(changes).await?;
        tracing::debug!("Committed {} changes", changes.len());
        Ok(())
    }

    /// Drop every pending change without touching the durable state.
    pub async fn discard_changes(&self) {
        let mut pending = self.pending.lock().await;
        if !pending.is_empty() {
            tracing::debug!("Discarding {} pending changes", pending.len());
        }
        *pending = ChangeSet::default();
    }

    pub async fn has_changes(&self) -> bool {
        !self.pending.lock().await.is_empty()
    }
}

/// Store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreType {
    Memory,
    File,
    #[default]
    Sqlite,
}

impl StoreType {
    /// Parse from an environment variable or CLI value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "file" | "json" => Some(Self::File),
            "sqlite" | "db" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Create a task store based on type and configuration.
pub async fn create_task_store(
    store_type: StoreType,
    base_dir: PathBuf,
    profile: &str,
) -> Result<TaskStore, StoreError> {
    match store_type {
        StoreType::Memory => Ok(TaskStore::in_memory()),
        StoreType::File => {
            let backend = FileBackend::new(base_dir, profile).await?;
            Ok(TaskStore::new(backend))
        }
        StoreType::Sqlite => {
            let backend = SqliteBackend::new(base_dir, profile).await?;
            Ok(TaskStore::new(backend))
        }
    }
}
