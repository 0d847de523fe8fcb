//! HTTP surface for jobtrack (axum).

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use jobtrack_core::{DateRange, JobComparison, JobRecord, StatsResult, StreakStats};
use jobtrack_service::{
    CheckJobRequest, CompareJobRequest, JobService, JobServiceError, SaveJobRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

pub const CRATE_NAME: &str = "jobtrack-web";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<JobService>,
}

impl AppState {
    pub fn new(service: JobService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/job", post(save_job_handler))
        .route("/api/job/check", post(check_job_handler))
        .route("/api/job/compare", post(compare_job_handler))
        .route("/api/job/recent", get(recent_jobs_handler))
        .route("/api/job/stats", get(stats_handler))
        .route("/api/job/streak", get(streak_handler))
        .route("/api/job/{page_id}", put(mark_applied_handler))
        .with_state(Arc::new(state))
}

/// Bind `0.0.0.0:port` and serve until ctrl-c.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding port {port}"))?;
    info!(port, "server listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Failure of one request, rendered as `{"error": ...}`.
#[derive(Debug)]
enum ApiError {
    InvalidBody(JsonRejection),
    Service {
        failure: &'static str,
        error: JobServiceError,
    },
}

impl ApiError {
    fn service(failure: &'static str) -> impl FnOnce(JobServiceError) -> Self {
        move |error| Self::Service { failure, error }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidBody(rejection) => {
                warn!(error = %rejection.body_text(), "rejected request body");
                (StatusCode::BAD_REQUEST, "Invalid request body".to_string())
            }
            Self::Service { failure, error } => match error {
                JobServiceError::Validation(message) => (StatusCode::BAD_REQUEST, message),
                JobServiceError::Conflict { url } => {
                    info!(url = %url, "duplicate job rejected");
                    (StatusCode::CONFLICT, "Job already exists".to_string())
                }
                JobServiceError::NotFound { id } => {
                    info!(id = %id, "job not found");
                    (StatusCode::NOT_FOUND, "Job not found".to_string())
                }
                err @ (JobServiceError::Upstream(_)
                | JobServiceError::MalformedUpstreamResponse(_)) => {
                    error!(error = ?err, "{failure}");
                    (StatusCode::INTERNAL_SERVER_ERROR, failure.to_string())
                }
            },
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn save_job_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SaveJobRequest>, JsonRejection>,
) -> ApiResult<JobRecord> {
    let Json(request) = payload.map_err(ApiError::InvalidBody)?;
    let saved = state
        .service
        .save_job(request)
        .await
        .map_err(ApiError::service("Failed to save job"))?;
    Ok(Json(saved))
}

async fn check_job_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CheckJobRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload.map_err(ApiError::InvalidBody)?;
    state
        .service
        .check_exists(&request.url)
        .await
        .map_err(ApiError::service("Failed to check job"))?;
    Ok(Json(json!({})))
}

async fn compare_job_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CompareJobRequest>, JsonRejection>,
) -> ApiResult<JobComparison> {
    let Json(request) = payload.map_err(ApiError::InvalidBody)?;
    let comparison = state
        .service
        .compare_job_posting(request)
        .await
        .map_err(ApiError::service("Failed to compare job posting"))?;
    Ok(Json(comparison))
}

async fn recent_jobs_handler(State(state): State<Arc<AppState>>) -> ApiResult<Vec<JobRecord>> {
    let jobs = state
        .service
        .recent_jobs()
        .await
        .map_err(ApiError::service("Failed to fetch saved jobs"))?;
    Ok(Json(jobs))
}

async fn mark_applied_handler(
    State(state): State<Arc<AppState>>,
    Path(page_id): Path<String>,
) -> ApiResult<Value> {
    state
        .service
        .mark_applied(&page_id)
        .await
        .map_err(ApiError::service("Failed to update job"))?;
    Ok(Json(json!({})))
}

#[derive(Debug, Deserialize)]
struct StatsParams {
    range: Option<String>,
}

async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsParams>,
) -> ApiResult<StatsResult> {
    let range = DateRange::from_query(params.range.as_deref());
    let stats = state
        .service
        .stats(range)
        .await
        .map_err(ApiError::service("Failed to fetch stats"))?;
    Ok(Json(stats))
}

async fn streak_handler(State(state): State<Arc<AppState>>) -> ApiResult<StreakStats> {
    let streak = state
        .service
        .streak()
        .await
        .map_err(ApiError::service("Failed to fetch streak"))?;
    Ok(Json(streak))
}
