use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use task_tracker_server::clock::FixedClock;
use task_tracker_server::task::fee::FeeCalculator;
use task_tracker_server::task::repository::InMemoryTaskRepository;
use task_tracker_server::task::service::TaskService;
use tower::ServiceExt;

/// Instant every test clock is pinned to.
#[allow(dead_code)]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap()
}

/// Service over an empty in-memory repository and a clock pinned to [`fixed_now`].
pub fn setup_service() -> Arc<TaskService> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    Arc::new(TaskService::new(
        Arc::new(InMemoryTaskRepository::new()),
        FeeCalculator::default(),
        Arc::new(FixedClock::new(fixed_now())),
    ))
}

/// Full application router backed by [`setup_service`].
#[allow(dead_code)]
pub fn setup_app() -> Router {
    task_tracker_server::web::create_app(setup_service())
}

/// Sends a request through the router and returns the status and the decoded JSON body.
///
/// An empty body decodes to `Value::Null`.
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
