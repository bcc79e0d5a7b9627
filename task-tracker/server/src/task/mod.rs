use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod api;
pub mod fee;
pub mod repository;
pub mod service;

use repository::RepositoryError;

/// Identifier of a stored task. Assigned once by the repository and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw numeric value of the identifier.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(TaskId)
            .map_err(|_| TaskError::NotFound(s.to_string()))
    }
}

/// How urgent a task is. Drives the overdue-fee multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(TaskError::validation(
                "priority",
                format!("Unsupported priority '{other}', expected one of: high, medium, low"),
            )),
        }
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(TaskError::validation(
                "status",
                format!(
                    "Unsupported status '{other}', expected one of: pending, in_progress, completed"
                ),
            )),
        }
    }
}

/// Error type for task operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Input was malformed or violates a task invariant. `field` names the offending input.
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },
    /// No task exists under the given identifier.
    #[error("Task not found: {0}")]
    NotFound(String),
    /// The storage backend failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl TaskError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        TaskError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(id: impl ToString) -> Self {
        TaskError::NotFound(id.to_string())
    }
}

/// A trackable unit of work.
///
/// Invariants upheld by every constructor and mutator:
/// * the title is never blank,
/// * `completed_at` is set if and only if the status is [`TaskStatus::Completed`],
/// * `id` and `created_at` never change once set.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    id: Option<TaskId>,
    title: String,
    description: Option<String>,
    due_date: Option<NaiveDate>,
    priority: Priority,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a pending, not yet persisted task.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `title` if the title is blank after trimming.
    pub fn new(
        title: impl Into<String>,
        priority: Priority,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TaskError> {
        Ok(Self {
            id: None,
            title: validate_title(title.into())?,
            description: None,
            due_date: None,
            priority,
            status: TaskStatus::Pending,
            created_at,
            completed_at: None,
        })
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = due_date;
        self
    }

    /// Returns the identifier, or `None` if the task was never saved.
    pub fn id(&self) -> Option<TaskId> {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Replaces the title.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `title` if the new title is blank after trimming.
    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), TaskError> {
        self.title = validate_title(title.into())?;
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    pub fn set_due_date(&mut self, due_date: Option<NaiveDate>) {
        self.due_date = due_date;
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// Marks the task as completed and stamps `completed_at`.
    ///
    /// Completing an already completed task leaves it untouched, including the original
    /// `completed_at`. Returns `true` if the status changed.
    pub fn complete(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_completed() {
            return false;
        }
        self.status = TaskStatus::Completed;
        self.completed_at = Some(at);
        true
    }

    /// Moves the task to `status`.
    ///
    /// Moving to [`TaskStatus::Completed`] behaves like [`Task::complete`].
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `status` when asked to move a completed task back
    /// to an open state.
    pub fn transition_to(
        &mut self,
        status: TaskStatus,
        at: DateTime<Utc>,
    ) -> Result<(), TaskError> {
        match (self.status, status) {
            (_, TaskStatus::Completed) => {
                self.complete(at);
                Ok(())
            }
            (TaskStatus::Completed, reopened) => Err(TaskError::validation(
                "status",
                format!("Completed tasks cannot be moved back to {reopened}"),
            )),
            (_, open) => {
                self.status = open;
                Ok(())
            }
        }
    }

    /// Whole days the task is past its due date as of `today`.
    ///
    /// Zero when there is no due date, the due date has not passed, or the task is completed.
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        match self.due_date {
            Some(due) if !self.is_completed() => (today - due).num_days().max(0),
            _ => 0,
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.days_overdue(today) > 0
    }

    /// Gives an unsaved task its identifier. Has no effect on a task that already has one.
    pub fn assign_id(&mut self, id: TaskId) {
        if self.id.is_none() {
            self.id = Some(id);
        }
    }
}

fn validate_title(title: String) -> Result<String, TaskError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskError::validation("title", "Title is required"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn can_create_pending_task_with_trimmed_title() {
        let task = Task::new("  Write report  ", Priority::High, created_at()).unwrap();

        assert_eq!(task.id(), None);
        assert_eq!(task.title(), "Write report");
        assert_eq!(task.status(), TaskStatus::Pending);
        assert_eq!(task.priority(), Priority::High);
        assert_eq!(task.created_at(), created_at());
        assert_eq!(task.completed_at(), None);
    }

    #[test]
    fn cannot_create_task_with_blank_title() {
        let result = Task::new("   \t", Priority::Low, created_at());

        match result {
            Err(TaskError::Validation { field, .. }) => assert_eq!(field, "title"),
            other => panic!("expected title validation error, got {other:?}"),
        }
    }

    #[test]
    fn cannot_set_blank_title_and_keeps_previous_one() {
        let mut task = Task::new("Original", Priority::Low, created_at()).unwrap();

        let result = task.set_title("");

        assert!(result.is_err());
        assert_eq!(task.title(), "Original");
    }

    #[test]
    fn can_complete_task_once() {
        let mut task = Task::new("Ship it", Priority::Medium, created_at()).unwrap();
        let first = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap();

        assert!(task.complete(first));
        assert!(!task.complete(second));

        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.completed_at(), Some(first));
    }

    #[test]
    fn cannot_reopen_completed_task() {
        let mut task = Task::new("Done", Priority::Medium, created_at()).unwrap();
        task.complete(created_at());

        let result = task.transition_to(TaskStatus::Pending, created_at());

        assert!(matches!(
            result,
            Err(TaskError::Validation { field: "status", .. })
        ));
        assert!(task.completed_at().is_some());
    }

    #[test]
    fn can_move_between_open_states() {
        let mut task = Task::new("Work", Priority::Medium, created_at()).unwrap();

        task.transition_to(TaskStatus::InProgress, created_at()).unwrap();
        assert_eq!(task.status(), TaskStatus::InProgress);
        assert_eq!(task.completed_at(), None);

        task.transition_to(TaskStatus::Completed, created_at()).unwrap();
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.completed_at(), Some(created_at()));
    }

    #[test]
    fn can_count_days_overdue() {
        let task = Task::new("Late", Priority::High, created_at())
            .unwrap()
            .with_due_date(Some(date(2026, 3, 10)));

        assert_eq!(task.days_overdue(date(2026, 3, 9)), 0);
        assert_eq!(task.days_overdue(date(2026, 3, 10)), 0);
        assert_eq!(task.days_overdue(date(2026, 3, 15)), 5);
        assert!(task.is_overdue(date(2026, 3, 11)));
    }

    #[test]
    fn completed_or_undated_tasks_are_never_overdue() {
        let undated = Task::new("Someday", Priority::Low, created_at()).unwrap();
        let mut done = Task::new("Done late", Priority::Low, created_at())
            .unwrap()
            .with_due_date(Some(date(2026, 1, 1)));
        done.complete(created_at());

        assert_eq!(undated.days_overdue(date(2030, 1, 1)), 0);
        assert_eq!(done.days_overdue(date(2030, 1, 1)), 0);
    }

    #[test]
    fn can_parse_priority_and_status() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("in_progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!(matches!(
            "urgent".parse::<Priority>(),
            Err(TaskError::Validation { field: "priority", .. })
        ));
        assert!(matches!(
            "archived".parse::<TaskStatus>(),
            Err(TaskError::Validation { field: "status", .. })
        ));
    }

    #[test]
    fn unparsable_task_id_is_not_found() {
        assert_eq!("42".parse::<TaskId>().unwrap(), TaskId::new(42));
        assert_eq!(
            "abc".parse::<TaskId>().unwrap_err().to_string(),
            "Task not found: abc"
        );
    }
}
