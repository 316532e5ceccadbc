//! In-memory task backend (non-persistent).

use super::{sort_tasks, ChangeSet, PrioritySort, StoreBackend};
use crate::error::StoreError;
use crate::task::{Task, TaskId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemoryBackend {
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreBackend for InMemoryBackend {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn load_all(&self, order: PrioritySort) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.tasks.read().await.values().cloned().collect();
        sort_tasks(&mut tasks, order);
        Ok(tasks)
    }

    async fn commit(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        changes.apply_to(&mut *self.tasks.write().await);
        Ok(())
    }
}
