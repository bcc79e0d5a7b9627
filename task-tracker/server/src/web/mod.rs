use axum::Json;
use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::task::api::create_task_router;
use crate::task::fee::FeeCalculator;
use crate::task::repository::InMemoryTaskRepository;
use crate::task::service::{NewTask, TaskService};
use crate::web::error::ApiError;

pub mod error;

/// Body of the health check endpoint.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    service: &'static str,
    status: &'static str,
    version: &'static str,
}

/// Builds the complete application router around an already constructed service.
///
/// Unknown routes, unsupported methods and panicking handlers all answer with an
/// [`error::ErrorResponse`] body.
pub fn create_app(service: Arc<TaskService>) -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(health_check_handler))
        .merge(create_task_router(service))
        .fallback(route_not_found_handler)
        .method_not_allowed_fallback(method_not_allowed_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(CorsLayer::permissive()),
        )
}

async fn route_not_found_handler(uri: Uri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}

async fn method_not_allowed_handler(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed {
        method,
        path: uri.path().to_string(),
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Panic(detail).into_response()
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = Arc::new(TaskService::new(
        Arc::new(InMemoryTaskRepository::new()),
        FeeCalculator::new(config.fee_base_rate),
        clock.clone(),
    ));

    if config.seed_demo_data {
        seed_demo_data(&service, clock.as_ref()).await?;
    }

    let app = create_app(service);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Inserts a couple of sample tasks due in the next few days.
async fn seed_demo_data(service: &TaskService, clock: &dyn Clock) -> anyhow::Result<()> {
    let today = clock.today();
    let samples = [
        ("Finish weekly assignment", "Wire up the quality gates", 3, "high"),
        ("Fix reported defects", "Add missing null checks", 5, "medium"),
    ];
    for (title, description, due_in_days, priority) in samples {
        service
            .create_task(NewTask {
                title: title.to_string(),
                description: Some(description.to_string()),
                due_date: Some((today + chrono::Duration::days(due_in_days)).to_string()),
                priority: Some(priority.to_string()),
            })
            .await?;
    }
    tracing::info!("Seeded {} demo tasks", samples.len());
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: env!("CARGO_PKG_NAME"),
        status: "UP",
        version: env!("CARGO_PKG_VERSION"),
    })
}
