//! Persistence seam for tasks.
//!
//! [`TaskRepository`] is the only way the service reads or writes tasks. The crate ships an
//! in-memory implementation; durable backends implement the same trait in the host application.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{Task, TaskId, TaskStatus};

/// Errors a storage backend can report.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The backend could not complete the operation.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Key-addressed storage of tasks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Inserts or replaces a task.
    ///
    /// A task without an identifier is assigned a fresh one. Returns the task as stored.
    async fn save(&self, task: Task) -> Result<Task, RepositoryError>;

    /// Looks up a task. A missing id yields `Ok(None)`.
    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, RepositoryError>;

    /// Returns a snapshot of every task, ordered by id.
    async fn find_all(&self) -> Result<Vec<Task>, RepositoryError>;

    /// Returns a snapshot of the tasks in `status`, ordered by id.
    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, RepositoryError>;

    /// Removes a task. Removing a missing id is not an error.
    async fn delete(&self, id: TaskId) -> Result<(), RepositoryError>;

    /// Number of stored tasks.
    async fn count(&self) -> Result<usize, RepositoryError>;
}

#[derive(Debug)]
struct Store {
    tasks: BTreeMap<TaskId, Task>,
    next_id: u64,
}

/// [`TaskRepository`] kept in process memory.
///
/// One lock guards both the map and the id counter, so id assignment and insertion are atomic.
#[derive(Debug)]
pub struct InMemoryTaskRepository {
    store: RwLock<Store>,
}

impl Default for InMemoryTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store {
                tasks: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn save(&self, mut task: Task) -> Result<Task, RepositoryError> {
        let mut store = self.store.write().await;
        let id = match task.id() {
            Some(id) => {
                // Keep the counter ahead of ids supplied by the caller.
                store.next_id = store.next_id.max(id.value().saturating_add(1));
                id
            }
            None => {
                let id = TaskId::new(store.next_id);
                store.next_id = store.next_id.checked_add(1).ok_or_else(|| {
                    RepositoryError::Backend("task id space exhausted".to_string())
                })?;
                task.assign_id(id);
                id
            }
        };
        store.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        Ok(self.store.read().await.tasks.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.store.read().await.tasks.values().cloned().collect())
    }

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, RepositoryError> {
        Ok(self
            .store
            .read()
            .await
            .tasks
            .values()
            .filter(|task| task.status() == status)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: TaskId) -> Result<(), RepositoryError> {
        self.store.write().await.tasks.remove(&id);
        Ok(())
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.store.read().await.tasks.len())
    }
}
