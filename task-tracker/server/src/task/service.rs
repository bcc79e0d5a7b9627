use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::fee::{FeeCalculator, FeeStrategy};
use super::repository::TaskRepository;
use super::{Priority, Task, TaskError, TaskId, TaskStatus};
use crate::clock::Clock;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Input for creating a task. Values are raw client input and are validated by the service.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<String>,
}

/// Partial update of a task. `None` leaves a field unchanged.
///
/// `description` and `due_date` are doubly optional: `Some(None)` clears the field.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<String>>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

/// Overdue fee of a single task.
#[derive(Debug, Clone, PartialEq)]
pub struct OverdueFee {
    pub task_id: TaskId,
    pub task_title: String,
    pub days_overdue: i64,
    pub fee: f64,
    pub strategy: FeeStrategy,
}

/// Task counts partitioned by status.
///
/// `total == pending + in_progress + completed` always holds; `overdue` counts open tasks
/// whose due date has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
}

/// Business operations on tasks.
///
/// Every read and write goes through the injected repository. Operations that read, modify and
/// write back a task are serialized so concurrent updates cannot overwrite each other.
pub struct TaskService {
    repository: Arc<dyn TaskRepository>,
    fees: FeeCalculator,
    clock: Arc<dyn Clock>,
    writes: Mutex<()>,
}

impl TaskService {
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        fees: FeeCalculator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            fees,
            clock,
            writes: Mutex::new(()),
        }
    }

    /// Today's date according to the service clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Validates and stores a new pending task.
    ///
    /// # Arguments
    ///
    /// * `new_task` - Title (required), optional description, optional `YYYY-MM-DD` due date and
    ///   optional priority (defaults to medium).
    ///
    /// # Returns
    ///
    /// The stored task with its assigned id, or a validation error naming the offending field.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, new_task: NewTask) -> Result<Task, TaskError> {
        let mut task = Task::new(new_task.title, Priority::default(), self.clock.now())?;
        task.set_due_date(parse_optional_date("dueDate", new_task.due_date.as_deref())?);
        if let Some(priority) = new_task.priority {
            task.set_priority(priority.parse()?);
        }
        task.set_description(new_task.description);

        let _guard = self.writes.lock().await;
        let created = self.repository.save(task).await?;
        tracing::info!(task_id = ?created.id(), "Created task");
        Ok(created)
    }

    /// Looks up a task. Absence is not an error here; callers decide.
    #[tracing::instrument(skip(self))]
    pub async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, TaskError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    /// Lists tasks, optionally only those in `status`.
    #[tracing::instrument(skip(self))]
    pub async fn find_all(&self, status: Option<&str>) -> Result<Vec<Task>, TaskError> {
        let tasks = match status {
            Some(status) => {
                let status: TaskStatus = status.parse()?;
                self.repository.find_by_status(status).await?
            }
            None => self.repository.find_all().await?,
        };
        Ok(tasks)
    }

    /// Applies the fields present in `patch` to an existing task.
    ///
    /// Nothing is stored if any field fails validation.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task, TaskError> {
        let _guard = self.writes.lock().await;
        let mut task = self.require(id).await?;

        if let Some(title) = patch.title {
            task.set_title(title)?;
        }
        if let Some(description) = patch.description {
            task.set_description(description);
        }
        if let Some(due_date) = patch.due_date {
            task.set_due_date(parse_optional_date("dueDate", due_date.as_deref())?);
        }
        if let Some(priority) = patch.priority {
            task.set_priority(priority.parse()?);
        }
        if let Some(status) = patch.status {
            task.transition_to(status.parse()?, self.clock.now())?;
        }

        Ok(self.repository.save(task).await?)
    }

    /// Removes a task.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: TaskId) -> Result<(), TaskError> {
        let _guard = self.writes.lock().await;
        self.require(id).await?;
        self.repository.delete(id).await?;
        tracing::info!(task_id = %id, "Deleted task");
        Ok(())
    }

    /// Marks a task as completed.
    ///
    /// Completing an already completed task returns it unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn complete_task(&self, id: TaskId) -> Result<Task, TaskError> {
        let _guard = self.writes.lock().await;
        let mut task = self.require(id).await?;

        if !task.complete(self.clock.now()) {
            tracing::debug!(task_id = %id, "Task already completed");
            return Ok(task);
        }

        let completed = self.repository.save(task).await?;
        tracing::info!(task_id = %id, "Completed task");
        Ok(completed)
    }

    /// Computes the overdue fee of a task as of `as_of`.
    #[tracing::instrument(skip(self))]
    pub async fn calculate_overdue_fee(
        &self,
        id: TaskId,
        as_of: NaiveDate,
    ) -> Result<OverdueFee, TaskError> {
        let task = self.require(id).await?;
        let quote = self
            .fees
            .calculate(task.priority(), task.days_overdue(as_of))?;

        Ok(OverdueFee {
            task_id: id,
            task_title: task.title().to_string(),
            days_overdue: quote.days_overdue,
            fee: quote.fee,
            strategy: quote.strategy,
        })
    }

    /// Counts tasks by status, plus the open tasks that are overdue today.
    #[tracing::instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<TaskStats, TaskError> {
        let today = self.clock.today();
        let stats = self
            .repository
            .find_all()
            .await?
            .iter()
            .fold(TaskStats::default(), |mut stats, task| {
                stats.total += 1;
                match task.status() {
                    TaskStatus::Pending => stats.pending += 1,
                    TaskStatus::InProgress => stats.in_progress += 1,
                    TaskStatus::Completed => stats.completed += 1,
                }
                if task.is_overdue(today) {
                    stats.overdue += 1;
                }
                stats
            });
        Ok(stats)
    }

    async fn require(&self, id: TaskId) -> Result<Task, TaskError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| TaskError::not_found(id))
    }
}

/// Parses a `YYYY-MM-DD` date, reporting failures against `field`.
pub fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, TaskError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        TaskError::validation(
            field,
            format!("Invalid date '{raw}', expected format: YYYY-MM-DD"),
        )
    })
}

fn parse_optional_date(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<NaiveDate>, TaskError> {
    raw.map(|raw| parse_date(field, raw)).transpose()
}
