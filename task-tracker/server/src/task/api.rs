//! JSON endpoints for tasks and task statistics.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

use crate::task::service::{NewTask, OverdueFee, TaskPatch, TaskService, TaskStats};
use crate::task::{Priority, Task, TaskError, TaskId, TaskStatus};
use crate::web::error::ApiError;

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().map(str::to_string),
            status: task.status(),
            priority: task.priority(),
            due_date: task.due_date(),
            created_at: task.created_at(),
            completed_at: task.completed_at(),
        }
    }
}

/// API response for listing tasks.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub data: Vec<TaskJson>,
    pub total: usize,
}

/// Query parameters for listing tasks.
#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    /// Optional status to filter by
    #[serde(default)]
    status: Option<String>,
}

/// Body of `POST /tasks`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    priority: Option<String>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(request: CreateTaskRequest) -> Self {
        NewTask {
            title: request.title.unwrap_or_default(),
            description: request.description,
            due_date: request.due_date,
            priority: request.priority,
        }
    }
}

/// Body of `PUT /tasks/{id}`. Absent `description` and `dueDate` are cleared.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceTaskRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl From<ReplaceTaskRequest> for TaskPatch {
    fn from(request: ReplaceTaskRequest) -> Self {
        TaskPatch {
            title: Some(request.title.unwrap_or_default()),
            description: Some(request.description),
            due_date: Some(request.due_date),
            priority: request.priority,
            status: request.status,
        }
    }
}

/// Body of `PATCH /tasks/{id}`. Only present fields change; `null` clears optional fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchTaskRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    due_date: Option<Option<String>>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl From<PatchTaskRequest> for TaskPatch {
    fn from(request: PatchTaskRequest) -> Self {
        TaskPatch {
            title: request.title,
            description: request.description,
            due_date: request.due_date,
            priority: request.priority,
            status: request.status,
        }
    }
}

/// Marks a field as present, so an explicit `null` becomes `Some(None)`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Query parameters for the overdue-fee endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueFeeQuery {
    /// Reference date, defaults to today
    #[serde(default)]
    as_of: Option<NaiveDate>,
}

/// API response for the overdue fee of a task.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueFeeJson {
    pub task_id: TaskId,
    pub task_title: String,
    pub overdue_days: i64,
    pub fee: f64,
    pub calculation_strategy: String,
}

impl From<OverdueFee> for OverdueFeeJson {
    fn from(fee: OverdueFee) -> Self {
        Self {
            task_id: fee.task_id,
            task_title: fee.task_title,
            overdue_days: fee.days_overdue,
            fee: fee.fee,
            calculation_strategy: fee.strategy.to_string(),
        }
    }
}

/// API response for task statistics.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatsJson {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
}

impl From<TaskStats> for StatsJson {
    fn from(stats: TaskStats) -> Self {
        Self {
            total: stats.total,
            pending: stats.pending,
            in_progress: stats.in_progress,
            completed: stats.completed,
            overdue: stats.overdue,
        }
    }
}

/// Handler for GET /tasks - Returns all tasks, optionally filtered by status.
#[tracing::instrument(skip(service))]
pub async fn list_tasks_handler(
    State(service): State<Arc<TaskService>>,
    WithRejection(Query(query), _): WithRejection<Query<TaskListQuery>, ApiError>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let data: Vec<TaskJson> = service
        .find_all(query.status.as_deref())
        .await?
        .into_iter()
        .map(TaskJson::from)
        .collect();
    let total = data.len();
    Ok(Json(TaskListResponse { data, total }))
}

/// Handler for GET /tasks/{id}.
#[tracing::instrument(skip(service))]
pub async fn get_task_handler(
    State(service): State<Arc<TaskService>>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ApiError>,
) -> Result<Json<TaskJson>, ApiError> {
    let id: TaskId = id.parse()?;
    let task = service
        .find_by_id(id)
        .await?
        .ok_or_else(|| TaskError::not_found(id))?;
    Ok(Json(task.into()))
}

/// Handler for POST /tasks.
#[tracing::instrument(skip(service))]
pub async fn create_task_handler(
    State(service): State<Arc<TaskService>>,
    WithRejection(Json(request), _): WithRejection<Json<CreateTaskRequest>, ApiError>,
) -> Result<(StatusCode, Json<TaskJson>), ApiError> {
    let task = service.create_task(request.into()).await?;
    Ok((StatusCode::CREATED, Json(task.into())))
}

/// Handler for PUT /tasks/{id}.
#[tracing::instrument(skip(service))]
pub async fn replace_task_handler(
    State(service): State<Arc<TaskService>>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ApiError>,
    WithRejection(Json(request), _): WithRejection<Json<ReplaceTaskRequest>, ApiError>,
) -> Result<Json<TaskJson>, ApiError> {
    let id: TaskId = id.parse()?;
    let task = service.update_task(id, request.into()).await?;
    Ok(Json(task.into()))
}

/// Handler for PATCH /tasks/{id}.
#[tracing::instrument(skip(service))]
pub async fn patch_task_handler(
    State(service): State<Arc<TaskService>>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ApiError>,
    WithRejection(Json(request), _): WithRejection<Json<PatchTaskRequest>, ApiError>,
) -> Result<Json<TaskJson>, ApiError> {
    let id: TaskId = id.parse()?;
    let task = service.update_task(id, request.into()).await?;
    Ok(Json(task.into()))
}

/// Handler for DELETE /tasks/{id}.
#[tracing::instrument(skip(service))]
pub async fn delete_task_handler(
    State(service): State<Arc<TaskService>>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ApiError>,
) -> Result<StatusCode, ApiError> {
    let id: TaskId = id.parse()?;
    service.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /tasks/{id}/complete.
#[tracing::instrument(skip(service))]
pub async fn complete_task_handler(
    State(service): State<Arc<TaskService>>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ApiError>,
) -> Result<Json<TaskJson>, ApiError> {
    let id: TaskId = id.parse()?;
    let task = service.complete_task(id).await?;
    Ok(Json(task.into()))
}

/// Handler for GET /tasks/{id}/overdue-fee.
#[tracing::instrument(skip(service))]
pub async fn overdue_fee_handler(
    State(service): State<Arc<TaskService>>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ApiError>,
    WithRejection(Query(query), _): WithRejection<Query<OverdueFeeQuery>, ApiError>,
) -> Result<Json<OverdueFeeJson>, ApiError> {
    let id: TaskId = id.parse()?;
    let as_of = query.as_of.unwrap_or_else(|| service.today());
    let fee = service.calculate_overdue_fee(id, as_of).await?;
    Ok(Json(fee.into()))
}

/// Handler for GET /stats.
#[tracing::instrument(skip(service))]
pub async fn stats_handler(
    State(service): State<Arc<TaskService>>,
) -> Result<Json<StatsJson>, ApiError> {
    let stats = service.get_stats().await?;
    Ok(Json(stats.into()))
}

/// Creates and returns the tasks router.
pub fn create_task_router(service: Arc<TaskService>) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .put(replace_task_handler)
                .patch(patch_task_handler)
                .delete(delete_task_handler),
        )
        .route("/tasks/{id}/complete", post(complete_task_handler))
        .route("/tasks/{id}/overdue-fee", get(overdue_fee_handler))
        .route("/stats", get(stats_handler))
        .with_state(service)
}
