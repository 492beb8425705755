use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    analysis_queue::QueueStats,
    auth::AuthUser,
    cache::{CacheService, TASK_STATUS_TTL_SECS},
    errors::ApiError,
    AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskStatusResponse {
    pub task_id: Uuid,
    pub report_id: Uuid,
    pub status: String,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RequeueResponse {
    pub requeued: i64,
    pub message: String,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks/{task_id}", get(get_task_status))
        .route("/stats", get(get_queue_stats))
        .route("/requeue-failed", post(requeue_failed))
}

#[utoipa::path(
    get,
    path = "/api/queue/tasks/{task_id}",
    tag = "queue",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("task_id" = Uuid, Path, description = "Analysis task ID")
    ),
    responses(
        (status = 200, description = "Task status", body = TaskStatusResponse),
        (status = 404, description = "Task not found")
    )
)]
async fn get_task_status(
    State(state): State<Arc<AppState>>,
    _auth_user: AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
    let cache_key = CacheService::key("task", &task_id.to_string());
    if let Some(cached) = state.cache.get::<TaskStatusResponse>(&cache_key).await {
        return Ok(Json(cached));
    }

    let item = state
        .queue
        .get_task(task_id)
        .await
        .map_err(|e| ApiError::internal_server_error(e.to_string()))?
        .ok_or(ApiError::NotFound)?;

    let response = TaskStatusResponse {
        task_id: item.id,
        report_id: item.report_id,
        status: item.status,
        attempts: item.attempts,
        created_at: item.created_at,
        started_at: item.started_at,
        completed_at: item.completed_at,
        error_message: item.error_message,
    };

    state
        .cache
        .set(&cache_key, &response, TASK_STATUS_TTL_SECS)
        .await;

    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/queue/stats",
    tag = "queue",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Queue statistics", body = QueueStats)
    )
)]
async fn get_queue_stats(
    State(state): State<Arc<AppState>>,
    _auth_user: AuthUser,
) -> Result<Json<QueueStats>, ApiError> {
    let stats = state
        .queue
        .get_stats()
        .await
        .map_err(|e| ApiError::internal_server_error(e.to_string()))?;

    Ok(Json(stats))
}

#[utoipa::path(
    post,
    path = "/api/queue/requeue-failed",
    tag = "queue",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Failed tasks requeued", body = RequeueResponse)
    )
)]
async fn requeue_failed(
    State(state): State<Arc<AppState>>,
    _auth_user: AuthUser,
) -> Result<Json<RequeueResponse>, ApiError> {
    let requeued = state
        .queue
        .requeue_failed_items()
        .await
        .map_err(|e| ApiError::internal_server_error(e.to_string()))?;

    Ok(Json(RequeueResponse {
        requeued,
        message: format!("Requeued {} failed analysis tasks", requeued),
    }))
}
