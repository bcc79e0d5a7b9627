use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::task::TaskError;

/// Uniform JSON body of every failed request.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// HTTP status code, repeated in the body.
    pub code: u16,
    pub message: String,
    /// Milliseconds since the Unix epoch when the error was produced.
    pub timestamp: i64,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Error type for HTTP handlers.
///
/// This is the only place domain errors are turned into status codes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Task(#[from] TaskError),
    /// The request body was not valid JSON for the endpoint.
    #[error("body: {0}")]
    Body(#[from] JsonRejection),
    /// The query string could not be parsed.
    #[error("query: {0}")]
    Query(#[from] QueryRejection),
    /// A path parameter could not be decoded.
    #[error("path: {0}")]
    Path(#[from] PathRejection),
    #[error("No route for {0}")]
    RouteNotFound(String),
    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed { method: Method, path: String },
    /// A handler panicked while serving the request.
    #[error("handler panicked: {0}")]
    Panic(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Task(TaskError::Validation { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Task(TaskError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Task(TaskError::Repository(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Body(_) | ApiError::Query(_) => StatusCode::BAD_REQUEST,
            // Path parameters are task ids, and an id that cannot be read names no task.
            ApiError::Path(PathRejection::FailedToDeserializePathParams(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Path(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Panic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self, "Request rejected");
            self.to_string()
        };
        (status, Json(ErrorResponse::new(status, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::repository::RepositoryError;

    async fn into_parts(error: ApiError) -> (StatusCode, ErrorResponse) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn can_map_validation_error_to_bad_request() {
        let error = ApiError::from(TaskError::validation("title", "Title is required"));

        let (status, body) = into_parts(error).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, 400);
        assert_eq!(body.message, "title: Title is required");
        assert!(body.timestamp > 0);
    }

    #[tokio::test]
    async fn can_map_not_found_error() {
        let (status, body) = into_parts(TaskError::not_found(12).into()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, 404);
        assert_eq!(body.message, "Task not found: 12");
    }

    #[tokio::test]
    async fn can_hide_repository_details_behind_internal_error() {
        let error = TaskError::from(RepositoryError::Backend(
            "connection refused at 10.0.0.3:5432".to_string(),
        ));

        let (status, body) = into_parts(error.into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, 500);
        assert_eq!(body.message, "Internal server error");
    }

    #[tokio::test]
    async fn can_hide_panic_details_behind_internal_error() {
        let error = ApiError::Panic("index out of bounds".to_string());

        let (status, body) = into_parts(error).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, 500);
        assert_eq!(body.message, "Internal server error");
    }

    #[tokio::test]
    async fn can_map_method_not_allowed() {
        let error = ApiError::MethodNotAllowed {
            method: Method::POST,
            path: "/stats".to_string(),
        };

        let (status, body) = into_parts(error).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body.code, 405);
        assert_eq!(body.message, "Method POST not allowed for /stats");
    }
}
