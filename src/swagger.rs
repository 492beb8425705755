use axum::Router;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    analysis_queue::QueueStats,
    models::{
        CreateUser, LoginRequest, LoginResponse, QueryLogResponse, QueryLogStatus, ReportResponse,
        ReportStatus, ReportSummary, ReportUploadResponse, UserResponse,
    },
    routes::queue::{RequeueResponse, TaskStatusResponse},
    routes::reports::{AnalyzeRequest, AnalyzeTaskResponse, SyncAnalysisResponse},
    AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth endpoints
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::me,
        // Report endpoints
        crate::routes::reports::upload_report,
        crate::routes::reports::list_reports,
        crate::routes::reports::get_report,
        crate::routes::reports::delete_report,
        crate::routes::reports::analyze_report,
        crate::routes::reports::analyze_report_sync,
        crate::routes::reports::list_report_queries,
        // Queue endpoints
        crate::routes::queue::get_task_status,
        crate::routes::queue::get_queue_stats,
        crate::routes::queue::requeue_failed,
    ),
    components(
        schemas(
            CreateUser, LoginRequest, LoginResponse, UserResponse,
            ReportResponse, ReportSummary, ReportUploadResponse, ReportStatus,
            QueryLogResponse, QueryLogStatus, AnalyzeRequest, AnalyzeTaskResponse, SyncAnalysisResponse,
            TaskStatusResponse, RequeueResponse, QueueStats
        )
    ),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "reports", description = "Blood test report upload and analysis endpoints"),
        (name = "queue", description = "Analysis queue management endpoints"),
    ),
    info(
        title = "Hemoscan API",
        version = "0.3.1",
        description = "Blood test report analysis API"
    ),
    servers(
        (url = "/api", description = "API base path")
    )
)]
pub struct ApiDoc;

pub fn create_swagger_router() -> Router<Arc<AppState>> {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
