//! Task list manager - the in-memory ordered list mirrored against the store.
//!
//! ## Flow
//! 1. The UI calls [`TaskListManager::fetch_tasks`] once when it presents the list
//! 2. Gestures map to [`TaskListManager::remove_item`] and [`TaskListManager::complete_item`]
//! 3. Each operation commits its own change through the shared [`TaskStore`]
//! 4. The observer hears about the outcome only after `tasks` has been updated
//!
//! The manager is the single owner of `tasks`. Every mutation takes `&mut self`,
//! so a fetch result can never replace the list while a remove or complete is
//! in flight.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::error::{StoreError, TaskListError};
use crate::form::{FormObserver, TaskForm};
use crate::store::{PrioritySort, TaskStore};
use crate::task::Task;

/// Receives list notifications. Called on the manager's own context, after
/// the list has been fully updated.
pub trait TaskListObserver: Send + Sync {
    /// The list was replaced or an entry was removed.
    fn on_tasks_changed(&self);

    /// An operation failed. `error` displays as a human-readable description.
    fn on_error(&self, error: &TaskListError);
}

/// A fetch running on a spawned task. Hand it back to
/// [`TaskListManager::finish_fetch`] to apply the result.
pub struct PendingFetch {
    handle: JoinHandle<Result<Vec<Task>, StoreError>>,
}

pub struct TaskListManager {
    tasks: Vec<Task>,
    store: Arc<TaskStore>,
    observer: Arc<dyn TaskListObserver>,
}

impl TaskListManager {
    pub fn new(store: Arc<TaskStore>, observer: Arc<dyn TaskListObserver>) -> Self {
        Self {
            tasks: Vec::new(),
            store,
            observer,
        }
    }

    /// The current list, ordered by priority as of the last fetch.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Start reading the store on a background task.
    pub fn begin_fetch(&self) -> PendingFetch {
        let store = Arc::clone(&self.store);
        let handle =
            tokio::spawn(async move { store.fetch_all(PrioritySort::Ascending).await });
        PendingFetch { handle }
    }

    /// Join a fetch started by [`begin_fetch`](Self::begin_fetch), replace the
    /// list, then notify.
    pub async fn finish_fetch(&mut self, pending: PendingFetch) -> Result<(), TaskListError> {
        let result = match pending.handle.await {
            Ok(result) => result,
            Err(e) => Err(StoreError::from(e)),
        };

        match result {
            Ok(tasks) => {
                tracing::debug!("Replacing task list with {} fetched tasks", tasks.len());
                self.tasks = tasks;
                self.observer.on_tasks_changed();
                Ok(())
            }
            Err(e) => Err(self.report(TaskListError::store("Failed to fetch tasks", e))),
        }
    }

    /// Fetch every task sorted by priority (High first) and replace the list.
    pub async fn fetch_tasks(&mut self) -> Result<(), TaskListError> {
        let pending = self.begin_fetch();
        self.finish_fetch(pending).await
    }

    /// Delete the task at `index` from the store and, once committed, from the list.
    ///
    /// Returns the removed task. On any failure the list is left unchanged.
    pub async fn remove_item(&mut self, index: usize) -> Result<Task, TaskListError> {
        self.check_index(index)?;

        if let Err(e) = self.store.delete_task(&self.tasks[index]).await {
            return Err(self.report(TaskListError::store("Failed to remove item", e)));
        }

        let removed = self.tasks.remove(index);
        tracing::info!("Removed task '{}'", removed.title());
        self.observer.on_tasks_changed();
        Ok(removed)
    }

    /// Mark the task at `index` completed and drop it from the list.
    ///
    /// The completed record stays in the store. The in-memory entry is only
    /// touched after the commit succeeds, so a failed commit leaves list and
    /// store in agreement.
    pub async fn complete_item(&mut self, index: usize) -> Result<Task, TaskListError> {
        self.check_index(index)?;

        if self.tasks[index].is_completed() {
            return Err(self.report(TaskListError::AlreadyCompleted));
        }

        let completed = self.tasks[index].completed();
        if let Err(e) = self.store.save_task(completed.clone()).await {
            return Err(self.report(TaskListError::store("Failed to complete the item", e)));
        }

        self.tasks.remove(index);
        tracing::info!("Completed task '{}'", completed.title());
        self.observer.on_tasks_changed();
        Ok(completed)
    }

    /// Open a form for a new task.
    pub fn add_form(&self, observer: Arc<dyn FormObserver>) -> TaskForm {
        TaskForm::new_task(Arc::clone(&self.store), observer)
    }

    /// Open a form editing the task at `index`.
    pub fn edit_form(
        &self,
        index: usize,
        observer: Arc<dyn FormObserver>,
    ) -> Result<TaskForm, TaskListError> {
        self.check_index(index)?;
        Ok(TaskForm::edit_task(
            Arc::clone(&self.store),
            self.tasks[index].clone(),
            observer,
        ))
    }

    fn check_index(&self, index: usize) -> Result<(), TaskListError> {
        if index < self.tasks.len() {
            Ok(())
        } else {
            Err(self.report(TaskListError::IndexOutOfBounds {
                index,
                len: self.tasks.len(),
            }))
        }
    }

    fn report(&self, error: TaskListError) -> TaskListError {
        tracing::warn!("{}", error);
        self.observer.on_error(&error);
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FieldValue;
    use crate::store::tests::FlakyBackend;
    use crate::task::TaskPriority;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        changes: Mutex<usize>,
        errors: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        fn changes(&self) -> usize {
            *self.changes.lock().unwrap()
        }

        fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }
    }

    impl TaskListObserver for RecordingObserver {
        fn on_tasks_changed(&self) {
            *self.changes.lock().unwrap() += 1;
        }

        fn on_error(&self, error: &TaskListError) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    async fn seeded_store(tasks: Vec<Task>) -> Arc<TaskStore> {
        let store = Arc::new(TaskStore::in_memory());
        for task in tasks {
            store.stage(task).await;
        }
        store.save().await.expect("seed store");
        store
    }

    fn manager(store: Arc<TaskStore>) -> (TaskListManager, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        (TaskListManager::new(store, observer.clone()), observer)
    }

    fn titles(manager: &TaskListManager) -> Vec<&str> {
        manager.tasks().iter().map(|t| t.title()).collect()
    }

    #[tokio::test]
    async fn test_fetch_tasks_success() {
        let store = seeded_store(vec![Task::new("Test1", TaskPriority::High)]).await;
        let (mut manager, observer) = manager(store);

        manager.fetch_tasks().await.expect("fetch");

        assert_eq!(manager.len(), 1);
        assert_eq!(observer.changes(), 1);
        assert!(observer.errors().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_orders_high_before_medium() {
        let store = seeded_store(vec![
            Task::new("medium", TaskPriority::Medium),
            Task::new("high", TaskPriority::High),
        ])
        .await;
        let (mut manager, _) = manager(store);

        manager.fetch_tasks().await.unwrap();
        assert_eq!(titles(&manager), vec!["high", "medium"]);
    }

    #[tokio::test]
    async fn test_fetch_twice_is_identical() {
        let store = seeded_store(vec![
            Task::new("a", TaskPriority::Low),
            Task::new("b", TaskPriority::Medium),
            Task::new("c", TaskPriority::Medium),
            Task::new("d", TaskPriority::High),
        ])
        .await;
        let (mut manager, _) = manager(store);

        manager.fetch_tasks().await.unwrap();
        let first = manager.tasks().to_vec();
        manager.fetch_tasks().await.unwrap();
        assert_eq!(manager.tasks(), first.as_slice());
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_list_and_reports() {
        let backend = FlakyBackend::default();
        let fail = backend.fail_loads.clone();
        let store = Arc::new(TaskStore::new(backend));
        store.stage(Task::new("kept", TaskPriority::High)).await;
        store.save().await.unwrap();
        let (mut manager, observer) = manager(store);
        manager.fetch_tasks().await.unwrap();

        fail.store(true, Ordering::SeqCst);
        let err = manager.fetch_tasks().await.unwrap_err();

        assert!(err.is_store_error());
        assert_eq!(titles(&manager), vec!["kept"]);
        assert_eq!(observer.changes(), 1);
        assert_eq!(observer.errors().len(), 1);
        assert!(observer.errors()[0].starts_with("Failed to fetch tasks"));
    }

    #[tokio::test]
    async fn test_begin_and_finish_fetch() {
        let store = seeded_store(vec![Task::new("x", TaskPriority::Low)]).await;
        let (mut manager, observer) = manager(store);

        let pending = manager.begin_fetch();
        assert!(manager.is_empty(), "list is untouched until the fetch is joined");
        manager.finish_fetch(pending).await.unwrap();

        assert_eq!(manager.len(), 1);
        assert_eq!(observer.changes(), 1);
    }

    #[tokio::test]
    async fn test_remove_item_success() {
        let store = seeded_store(vec![Task::new("Test1", TaskPriority::High)]).await;
        let (mut manager, observer) = manager(store.clone());
        manager.fetch_tasks().await.unwrap();

        let removed = manager.remove_item(0).await.expect("remove");

        assert_eq!(removed.title(), "Test1");
        assert!(manager.is_empty());
        assert_eq!(observer.changes(), 2);
        assert!(store
            .fetch_all(PrioritySort::Ascending)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_remove_item_out_of_bounds() {
        let store = seeded_store(vec![Task::new("only", TaskPriority::Low)]).await;
        let (mut manager, observer) = manager(store);
        manager.fetch_tasks().await.unwrap();

        let err = manager.remove_item(10).await.unwrap_err();

        assert!(matches!(
            err,
            TaskListError::IndexOutOfBounds { index: 10, len: 1 }
        ));
        assert_eq!(titles(&manager), vec!["only"]);
        assert_eq!(observer.errors(), vec!["Index 10 is out of bounds".to_string()]);
    }

    #[tokio::test]
    async fn test_remove_item_on_empty_list() {
        let (mut manager, observer) = manager(Arc::new(TaskStore::in_memory()));
        assert!(manager.remove_item(0).await.is_err());
        assert!(manager.is_empty());
        assert_eq!(observer.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_item_commit_failure_keeps_entry() {
        let backend = FlakyBackend::default();
        let fail = backend.fail_commits.clone();
        let store = Arc::new(TaskStore::new(backend));
        store.stage(Task::new("stuck", TaskPriority::Medium)).await;
        store.save().await.unwrap();
        let (mut manager, observer) = manager(store.clone());
        manager.fetch_tasks().await.unwrap();

        fail.store(true, Ordering::SeqCst);
        let err = manager.remove_item(0).await.unwrap_err();

        assert!(err.is_store_error());
        assert_eq!(titles(&manager), vec!["stuck"]);
        assert!(observer.errors()[0].starts_with("Failed to remove item"));
        assert!(!store.has_changes().await);
    }

    #[tokio::test]
    async fn test_complete_item_success() {
        let store = seeded_store(vec![Task::new("Test1", TaskPriority::High)]).await;
        let (mut manager, observer) = manager(store.clone());
        manager.fetch_tasks().await.unwrap();

        let completed = manager.complete_item(0).await.expect("complete");

        assert!(completed.is_completed());
        assert!(manager.is_empty());
        assert_eq!(observer.changes(), 2);

        // Completion does not delete the record.
        manager.fetch_tasks().await.unwrap();
        assert_eq!(manager.len(), 1);
        assert!(manager.tasks()[0].is_completed());
        assert_eq!(manager.tasks()[0].id(), completed.id());
    }

    #[tokio::test]
    async fn test_complete_item_already_completed() {
        let mut done = Task::new("Test1", TaskPriority::High);
        done.mark_completed();
        let store = seeded_store(vec![done]).await;
        let (mut manager, observer) = manager(store);
        manager.fetch_tasks().await.unwrap();
        let before = manager.tasks().to_vec();

        let err = manager.complete_item(0).await.unwrap_err();

        assert!(matches!(err, TaskListError::AlreadyCompleted));
        assert_eq!(manager.tasks(), before.as_slice());
        assert_eq!(
            observer.errors(),
            vec!["To Do Item is already completed.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_complete_item_out_of_bounds() {
        let (mut manager, observer) = manager(Arc::new(TaskStore::in_memory()));
        let err = manager.complete_item(3).await.unwrap_err();
        assert!(matches!(err, TaskListError::IndexOutOfBounds { .. }));
        assert_eq!(observer.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_item_commit_failure_leaves_task_untouched() {
        let backend = FlakyBackend::default();
        let fail = backend.fail_commits.clone();
        let store = Arc::new(TaskStore::new(backend));
        store.stage(Task::new("pending", TaskPriority::Low)).await;
        store.save().await.unwrap();
        let (mut manager, observer) = manager(store.clone());
        manager.fetch_tasks().await.unwrap();

        fail.store(true, Ordering::SeqCst);
        assert!(manager.complete_item(0).await.is_err());

        assert_eq!(manager.len(), 1);
        assert!(!manager.tasks()[0].is_completed());
        assert!(observer.errors()[0].starts_with("Failed to complete the item"));

        let stored = store.fetch_all(PrioritySort::Ascending).await.unwrap();
        assert!(!stored[0].is_completed());

        // Once the store recovers the same gesture goes through.
        fail.store(false, Ordering::SeqCst);
        manager.complete_item(0).await.expect("retry");
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_failed_remove_keeps_changes_staged_by_others() {
        let backend = FlakyBackend::default();
        let fail = backend.fail_commits.clone();
        let store = Arc::new(TaskStore::new(backend));
        store.save_task(Task::new("existing", TaskPriority::High)).await.unwrap();
        let (mut manager, _) = manager(store.clone());
        manager.fetch_tasks().await.unwrap();

        store.stage(Task::new("draft", TaskPriority::Low)).await;
        fail.store(true, Ordering::SeqCst);
        assert!(manager.remove_item(0).await.is_err());
        fail.store(false, Ordering::SeqCst);

        store.save().await.expect("save staged draft");
        manager.fetch_tasks().await.unwrap();
        assert_eq!(titles(&manager), vec!["existing", "draft"]);
    }

    #[tokio::test]
    async fn test_form_save_reports_its_own_failure() {
        let backend = FlakyBackend::default();
        let fail = backend.fail_commits.clone();
        let store = Arc::new(TaskStore::new(backend));
        let (mut manager, _) = manager(store.clone());
        manager.fetch_tasks().await.unwrap();

        let form_observer = Arc::new(crate::form::tests::RecordingFormObserver::default());
        let mut form = manager.add_form(form_observer.clone());
        form.handle_input(0, FieldValue::Text("Buy milk".into())).unwrap();
        form.handle_input(2, FieldValue::Priority(TaskPriority::High))
            .unwrap();

        // Someone else's pending change does not mask the form's failure.
        store.stage(Task::new("other", TaskPriority::Low)).await;
        fail.store(true, Ordering::SeqCst);
        let err = form.save().await.unwrap_err();

        assert!(err.is_store_error());
        assert_eq!(form_observer.errors().len(), 1);
        assert!(store.has_changes().await);

        fail.store(false, Ordering::SeqCst);
        form.save().await.expect("retry");
        manager.fetch_tasks().await.unwrap();
        assert_eq!(titles(&manager), vec!["Buy milk"]);
    }

    #[tokio::test]
    async fn test_add_then_fetch_shows_new_task() {
        let (mut manager, observer) = manager(Arc::new(TaskStore::in_memory()));
        manager.fetch_tasks().await.unwrap();
        assert!(manager.is_empty());

        let form_observer = Arc::new(crate::form::tests::RecordingFormObserver::default());
        let mut form = manager.add_form(form_observer.clone());
        form.handle_input(0, FieldValue::Text("Buy milk".into())).unwrap();
        form.handle_input(2, FieldValue::Priority(TaskPriority::High))
            .unwrap();
        let saved = form.save().await.expect("save");

        manager.fetch_tasks().await.unwrap();

        assert_eq!(manager.len(), 1);
        let task = &manager.tasks()[0];
        assert_eq!(task.id(), saved.id());
        assert_eq!(task.title(), "Buy milk");
        assert_eq!(task.priority(), Some(TaskPriority::High));
        assert!(task.due_date().is_none());
        assert!(!task.is_completed());
        assert!(form_observer.errors().is_empty());
        assert!(observer.errors().is_empty());
    }

    #[tokio::test]
    async fn test_edit_form_out_of_bounds() {
        let (manager, observer) = manager(Arc::new(TaskStore::in_memory()));
        let form_observer = Arc::new(crate::form::tests::RecordingFormObserver::default());
        assert!(manager.edit_form(0, form_observer).is_err());
        assert_eq!(observer.errors().len(), 1);
    }
}
