//! JSON file-based task backend.

use super::{sanitize_filename, sort_tasks, ChangeSet, PrioritySort, StoreBackend};
use crate::error::StoreError;
use crate::task::{Task, TaskId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Serialize, Deserialize, Default)]
struct TaskSnapshot {
    tasks: HashMap<TaskId, Task>,
}

#[derive(Clone)]
pub struct FileBackend {
    path: PathBuf,
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
    persist_lock: Arc<Mutex<()>>,
}

impl FileBackend {
    pub async fn new(base_dir: PathBuf, profile: &str) -> Result<Self, StoreError> {
        fs::create_dir_all(&base_dir).await?;
        let filename = format!("tasks-{}.json", sanitize_filename(profile));
        let path = base_dir.join(filename);
        let snapshot = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<TaskSnapshot>(&bytes) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!("Failed to parse task file {}: {}", path.display(), e);
                    TaskSnapshot::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => TaskSnapshot::default(),
            Err(err) => return Err(err.into()),
        };

        tracing::debug!(
            "Opened task file {} with {} tasks",
            path.display(),
            snapshot.tasks.len()
        );

        Ok(Self {
            path,
            tasks: Arc::new(RwLock::new(snapshot.tasks)),
            persist_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, tasks: &HashMap<TaskId, Task>) -> Result<(), StoreError> {
        let snapshot = TaskSnapshot {
            tasks: tasks.clone(),
        };
        let data = serde_json::to_vec_pretty(&snapshot)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data).await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StoreBackend for FileBackend {
    fn is_persistent(&self) -> bool {
        true
    }

    // The snapshot read at open time is authoritative for the life of the
    // process: reads never touch the disk and never see other writers.
    async fn load_all(&self, order: PrioritySort) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.tasks.read().await.values().cloned().collect();
        sort_tasks(&mut tasks, order);
        Ok(tasks)
    }

    async fn commit(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        let _guard = self.persist_lock.lock().await;

        // Build the next state off to the side; only swap it in once it's on disk.
        let mut next = self.tasks.read().await.clone();
        changes.apply_to(&mut next);
        self.persist(&next).await?;
        *self.tasks.write().await = next;
        Ok(())
    }
}
