//! SQLite-based task backend.

use super::{sanitize_filename, ChangeSet, PrioritySort, StoreBackend};
use crate::error::StoreError;
use crate::task::{Task, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    due_date TEXT,
    priority INTEGER NOT NULL DEFAULT 0,
    is_completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_priority ON tasks(priority, created_at);
"#;

const SELECT_ASC: &str = "SELECT id, title, due_date, priority, is_completed, created_at
     FROM tasks
     ORDER BY priority ASC, created_at ASC, id ASC";

const SELECT_DESC: &str = "SELECT id, title, due_date, priority, is_completed, created_at
     FROM tasks
     ORDER BY priority DESC, created_at ASC, id ASC";

/// Fixed-width RFC3339 so that text ordering matches time ordering.
fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(id: &str, s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            reason: format!("bad timestamp '{}': {}", s, e),
        })
}

/// A row as it comes out of SQLite, before any parsing.
struct TaskRow {
    id: String,
    title: String,
    due_date: Option<String>,
    priority: i16,
    is_completed: bool,
    created_at: String,
}

impl TaskRow {
    fn into_task(self) -> Result<Task, StoreError> {
        let id = TaskId::parse(&self.id).map_err(|e| StoreError::Corrupt {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;
        let due_date = self
            .due_date
            .as_deref()
            .map(|s| parse_time(&self.id, s))
            .transpose()?;
        let created_at = parse_time(&self.id, &self.created_at)?;
        Ok(Task::from_parts(
            id,
            self.title,
            due_date,
            self.priority,
            self.is_completed,
            created_at,
        ))
    }
}

pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl SqliteBackend {
    pub async fn new(base_dir: PathBuf, profile: &str) -> Result<Self, StoreError> {
        let db_path = base_dir.join(format!("tasks-{}.db", sanitize_filename(profile)));

        tokio::fs::create_dir_all(&base_dir).await?;

        // Open database in blocking task
        let path = db_path.clone();
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path)?;
            conn.execute_batch(SCHEMA)?;
            Ok::<_, StoreError>(conn)
        })
        .await??;

        tracing::debug!("Opened task database {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[async_trait]
impl StoreBackend for SqliteBackend {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn load_all(&self, order: PrioritySort) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let query = match order {
                PrioritySort::Ascending => SELECT_ASC,
                PrioritySort::Descending => SELECT_DESC,
            };
            let mut stmt = conn.prepare(query)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(TaskRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        due_date: row.get(2)?,
                        priority: row.get(3)?,
                        is_completed: row.get::<_, i32>(4)? != 0,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(TaskRow::into_task)
                .collect::<Result<Vec<_>, StoreError>>()
        })
        .await?
    }

    async fn commit(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let deletes: Vec<String> = changes.deletes().map(|id| id.to_string()).collect();
        let upserts: Vec<Task> = changes.upserts().cloned().collect();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            // Dropping the transaction without commit rolls it back.
            let tx = conn.transaction()?;

            for id in &deletes {
                tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            }

            for task in &upserts {
                tx.execute(
                    "INSERT INTO tasks (id, title, due_date, priority, is_completed, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET
                        title = excluded.title,
                        due_date = excluded.due_date,
                        priority = excluded.priority,
                        is_completed = excluded.is_completed",
                    params![
                        task.id().to_string(),
                        task.title(),
                        task.due_date().map(format_time),
                        task.raw_priority(),
                        task.is_completed() as i32,
                        format_time(task.created_at()),
                    ],
                )?;
            }

            tx.commit()?;
            Ok::<_, StoreError>(())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskPriority;
    use chrono::Duration;

    async fn open(dir: &Path) -> SqliteBackend {
        SqliteBackend::new(dir.to_path_buf(), "test")
            .await
            .expect("open sqlite backend")
    }

    #[tokio::test]
    async fn test_round_trip_preserves_fields() {
        let temp = tempfile::tempdir().expect("tempdir");
        let backend = open(temp.path()).await;
        assert!(backend.db_path().ends_with("tasks-test.db"));

        let mut task = Task::new("Dentist", TaskPriority::Medium);
        task.set_due_date(Some(Utc::now() + Duration::days(3)));
        task.mark_completed();

        let mut changes = ChangeSet::default();
        changes.upsert(task.clone());
        backend.commit(&changes).await.expect("commit");

        let reopened = open(temp.path()).await;
        let tasks = reopened.load_all(PrioritySort::Ascending).await.unwrap();
        assert_eq!(tasks, vec![task]);
    }

    #[tokio::test]
    async fn test_order_by_priority_in_sql() {
        let temp = tempfile::tempdir().expect("tempdir");
        let backend = open(temp.path()).await;

        let mut changes = ChangeSet::default();
        changes.upsert(Task::new("medium", TaskPriority::Medium));
        changes.upsert(Task::new("low", TaskPriority::Low));
        changes.upsert(Task::new("high", TaskPriority::High));
        backend.commit(&changes).await.unwrap();

        let asc = backend.load_all(PrioritySort::Ascending).await.unwrap();
        let titles: Vec<&str> = asc.iter().map(|t| t.title()).collect();
        assert_eq!(titles, vec!["high", "medium", "low"]);

        let desc = backend.load_all(PrioritySort::Descending).await.unwrap();
        let titles: Vec<&str> = desc.iter().map(|t| t.title()).collect();
        assert_eq!(titles, vec!["low", "medium", "high"]);
    }

    #[tokio::test]
    async fn test_update_and_delete_in_one_commit() {
        let temp = tempfile::tempdir().expect("tempdir");
        let backend = open(temp.path()).await;

        let keep = Task::new("keep", TaskPriority::High);
        let gone = Task::new("gone", TaskPriority::Low);
        let mut changes = ChangeSet::default();
        changes.upsert(keep.clone());
        changes.upsert(gone.clone());
        backend.commit(&changes).await.unwrap();

        let mut renamed = keep.clone();
        renamed.set_title("kept");
        let mut changes = ChangeSet::default();
        changes.upsert(renamed.clone());
        changes.delete(gone.id());
        backend.commit(&changes).await.unwrap();

        let tasks = backend.load_all(PrioritySort::Ascending).await.unwrap();
        assert_eq!(tasks, vec![renamed]);
    }

    #[tokio::test]
    async fn test_corrupt_row_reports_store_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let backend = open(temp.path()).await;
        {
            let conn = backend.conn.lock().await;
            conn.execute(
                "INSERT INTO tasks (id, title, priority, created_at) VALUES ('nope', 'x', 1, 'yesterday')",
                [],
            )
            .unwrap();
        }

        let err = backend.load_all(PrioritySort::Ascending).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
