use axum::{
    extract::{Multipart, Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    analysis::{fallback_analysis, DEFAULT_QUERY},
    auth::AuthUser,
    cache::{CacheService, ANALYSIS_TTL_SECS, REPORT_DETAIL_TTL_SECS, REPORT_LIST_TTL_SECS},
    errors::{report::ReportError, upload::UploadError},
    extraction::PdfExtractor,
    models::{
        QueryLogResponse, QueryLogStatus, Report, ReportResponse, ReportSummary,
        ReportUploadResponse,
    },
    services::file_service::{has_pdf_extension, is_pdf_payload},
    AppState,
};

const SYNC_ANALYSIS_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeTaskResponse {
    pub task_id: Uuid,
    pub report_id: Uuid,
    pub query_log_id: Uuid,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncAnalysisResponse {
    pub report_id: Uuid,
    pub query: String,
    pub analysis: String,
    pub confidence: f64,
    pub fallback: bool,
    pub processing_time_ms: i64,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(upload_report).get(list_reports))
        .route("/{id}", get(get_report).delete(delete_report))
        .route("/{id}/analyze", post(analyze_report))
        .route("/{id}/analyze/sync", post(analyze_report_sync))
        .route("/{id}/queries", get(list_report_queries))
}

fn report_list_key(user_id: Uuid) -> String {
    CacheService::key("reports", &user_id.to_string())
}

fn report_detail_key(user_id: Uuid, report_id: Uuid) -> String {
    CacheService::key("report", &format!("{}:{}", user_id, report_id))
}

fn analysis_key(report_id: Uuid, query: &str) -> String {
    CacheService::key("analysis", &format!("{}:{}", report_id, query))
}

#[utoipa::path(
    post,
    path = "/api/reports",
    tag = "reports",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Report uploaded and queued for analysis", body = ReportUploadResponse),
        (status = 400, description = "Missing or empty file"),
        (status = 413, description = "File exceeds the size limit"),
        (status = 415, description = "File is not a PDF")
    )
)]
async fn upload_report(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ReportUploadResponse>, UploadError> {
    let mut upload: Option<(String, String, Vec<u8>)> = None;
    let mut query: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::multipart(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("unknown.pdf").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| UploadError::multipart(e.to_string()))?;
                upload = Some((filename, content_type, data.to_vec()));
            }
            Some("query") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| UploadError::multipart(e.to_string()))?;
                if !text.trim().is_empty() {
                    query = Some(text);
                }
            }
            _ => {}
        }
    }

    let (filename, content_type, data) = upload.ok_or(UploadError::MissingFile)?;
    let query = query.unwrap_or_else(|| DEFAULT_QUERY.to_string());

    // All validation happens before any row or file is created.
    if data.is_empty() {
        return Err(UploadError::EmptyFile);
    }

    if !has_pdf_extension(&filename) || !is_pdf_payload(&data) {
        return Err(UploadError::unsupported_media_type(filename, content_type));
    }

    let max_bytes = state.config.max_file_size_mb * 1024 * 1024;
    if data.len() as u64 > max_bytes {
        return Err(UploadError::FileTooLarge {
            filename,
            max_mb: state.config.max_file_size_mb,
        });
    }

    let (stored_filename, file_path) = state
        .file_service
        .save_report_file(&data)
        .await
        .map_err(UploadError::storage)?;

    let report = match register_upload(&state, &auth_user, &stored_filename, &file_path, &data, &query)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            // The stored file must not outlive a failed registration.
            if let Err(cleanup) = state.file_service.delete_file(&file_path).await {
                warn!("Failed to remove orphaned upload {}: {}", file_path, cleanup);
            }
            return Err(UploadError::storage(e));
        }
    };

    state.cache.delete(&report_list_key(auth_user.user.id)).await;

    info!(
        "Report {} uploaded by {} ({} bytes) and queued for analysis",
        report.id, auth_user.user.username, report.file_size
    );

    Ok(Json(ReportUploadResponse {
        id: report.id,
        filename: report.filename,
        file_size: report.file_size,
        processing_status: report.processing_status,
        message: "Report uploaded successfully and queued for analysis".to_string(),
    }))
}

/// Create the report row, its pending query log, and the analysis job.
async fn register_upload(
    state: &AppState,
    auth_user: &AuthUser,
    stored_filename: &str,
    file_path: &str,
    data: &[u8],
    query: &str,
) -> anyhow::Result<Report> {
    let report = state
        .db
        .create_report(auth_user.user.id, stored_filename, file_path, data.len() as i64)
        .await?;

    let query_log = state
        .db
        .create_query_log(auth_user.user.id, report.id, query)
        .await?;

    state.queue.enqueue(report.id, query_log.id, query).await?;

    Ok(report)
}

#[utoipa::path(
    get,
    path = "/api/reports",
    tag = "reports",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Reports owned by the current user", body = Vec<ReportSummary>),
        (status = 401, description = "Unauthorized")
    )
)]
async fn list_reports(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<Json<Vec<ReportSummary>>, ReportError> {
    let cache_key = report_list_key(auth_user.user.id);
    if let Some(cached) = state.cache.get::<Vec<ReportSummary>>(&cache_key).await {
        return Ok(Json(cached));
    }

    let reports = state
        .db
        .list_reports_for_user(auth_user.user.id)
        .await
        .map_err(|e| ReportError::database(e.to_string()))?;

    let summaries: Vec<ReportSummary> = reports.iter().map(ReportSummary::from).collect();
    state
        .cache
        .set(&cache_key, &summaries, REPORT_LIST_TTL_SECS)
        .await;

    Ok(Json(summaries))
}

#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    tag = "reports",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Report details", body = ReportResponse),
        (status = 404, description = "Report not found")
    )
)]
async fn get_report(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportResponse>, ReportError> {
    let cache_key = report_detail_key(auth_user.user.id, id);
    if let Some(cached) = state.cache.get::<ReportResponse>(&cache_key).await {
        return Ok(Json(cached));
    }

    let report = state
        .db
        .get_report_by_id(id, auth_user.user.id)
        .await
        .map_err(|e| ReportError::database(e.to_string()))?
        .ok_or_else(|| ReportError::not_found_by_id(id))?;

    let response = ReportResponse::from(report);

    // Only terminal reports are cached; a pending or processing report would
    // serve a stale status for the whole TTL.
    if response.processing_status.is_terminal() {
        state
            .cache
            .set(&cache_key, &response, REPORT_DETAIL_TTL_SECS)
            .await;
    }

    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/api/reports/{id}",
    tag = "reports",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Report deleted"),
        (status = 404, description = "Report not found")
    )
)]
async fn delete_report(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ReportError> {
    let report = state
        .db
        .delete_report(id, auth_user.user.id)
        .await
        .map_err(|e| ReportError::database(e.to_string()))?
        .ok_or_else(|| ReportError::not_found_by_id(id))?;

    // Query logs and queue entries cascade at the schema level. The stored
    // file is removed best-effort; a missing file does not fail the delete.
    if let Err(e) = state.file_service.delete_file(&report.file_path).await {
        warn!("Failed to remove stored file {}: {}", report.file_path, e);
    }

    state.cache.delete(&report_list_key(auth_user.user.id)).await;
    state
        .cache
        .delete(&report_detail_key(auth_user.user.id, id))
        .await;

    info!("Report {} deleted by {}", id, auth_user.user.username);

    Ok(Json(serde_json::json!({
        "message": "Report deleted successfully",
        "id": id
    })))
}

#[utoipa::path(
    post,
    path = "/api/reports/{id}/analyze",
    tag = "reports",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis queued", body = AnalyzeTaskResponse),
        (status = 404, description = "Report not found")
    )
)]
async fn analyze_report(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeTaskResponse>, ReportError> {
    let report = state
        .db
        .get_report_by_id(id, auth_user.user.id)
        .await
        .map_err(|e| ReportError::database(e.to_string()))?
        .ok_or_else(|| ReportError::not_found_by_id(id))?;

    let query = request
        .query
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_QUERY.to_string());

    let query_log = state
        .db
        .create_query_log(auth_user.user.id, report.id, &query)
        .await
        .map_err(|e| ReportError::database(e.to_string()))?;

    let task_id = state
        .queue
        .enqueue(report.id, query_log.id, &query)
        .await
        .map_err(|e| ReportError::database(e.to_string()))?;

    Ok(Json(AnalyzeTaskResponse {
        task_id,
        report_id: report.id,
        query_log_id: query_log.id,
        status: "queued".to_string(),
        message: "Analysis queued for background processing".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/reports/{id}/analyze/sync",
    tag = "reports",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis result", body = SyncAnalysisResponse),
        (status = 404, description = "Report not found"),
        (status = 410, description = "Stored report file is missing")
    )
)]
async fn analyze_report_sync(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<SyncAnalysisResponse>, ReportError> {
    let start_time = std::time::Instant::now();

    let report = state
        .db
        .get_report_by_id(id, auth_user.user.id)
        .await
        .map_err(|e| ReportError::database(e.to_string()))?
        .ok_or_else(|| ReportError::not_found_by_id(id))?;

    let query = request
        .query
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_QUERY.to_string());

    let cache_key = analysis_key(report.id, &query);
    if let Some(cached) = state.cache.get::<SyncAnalysisResponse>(&cache_key).await {
        return Ok(Json(cached));
    }

    let text = report_text(&state, &report).await?;

    let query_log = state
        .db
        .create_query_log(auth_user.user.id, report.id, &query)
        .await
        .map_err(|e| ReportError::database(e.to_string()))?;

    // Bounded wait: past the deadline the templated fallback answers instead
    // of keeping the request open.
    let outcome = match timeout(
        Duration::from_secs(SYNC_ANALYSIS_TIMEOUT_SECS),
        state.analysis.analyze(&text, &query),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(
                "Sync analysis for report {} timed out after {}s, using fallback",
                report.id, SYNC_ANALYSIS_TIMEOUT_SECS
            );
            fallback_analysis(&query)
        }
    };

    let elapsed_ms = start_time.elapsed().as_millis() as i64;
    state
        .db
        .finish_query_log(query_log.id, QueryLogStatus::Completed, &outcome.text, elapsed_ms)
        .await
        .map_err(|e| ReportError::database(e.to_string()))?;

    let response = SyncAnalysisResponse {
        report_id: report.id,
        query,
        analysis: outcome.text,
        confidence: outcome.confidence,
        fallback: outcome.fallback,
        processing_time_ms: elapsed_ms,
    };

    state.cache.set(&cache_key, &response, ANALYSIS_TTL_SECS).await;

    Ok(Json(response))
}

/// Text to analyze for a report: the stored extraction when the worker has
/// already produced one, otherwise a fresh extraction from the stored file.
/// Extraction runs off-thread; it must never stall the request executor.
async fn report_text(state: &AppState, report: &Report) -> Result<String, ReportError> {
    if let Some(text) = report
        .extracted_text
        .as_ref()
        .filter(|t| !t.trim().is_empty())
    {
        return Ok(text.clone());
    }

    if !state.file_service.file_exists(&report.file_path) {
        return Err(ReportError::FileMissing {
            id: report.id,
            path: report.file_path.clone(),
        });
    }

    Ok(PdfExtractor::new()
        .extract_text_off_thread(&report.file_path)
        .await)
}

#[utoipa::path(
    get,
    path = "/api/reports/{id}/queries",
    tag = "reports",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Query history for the report", body = Vec<QueryLogResponse>),
        (status = 404, description = "Report not found")
    )
)]
async fn list_report_queries(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<QueryLogResponse>>, ReportError> {
    state
        .db
        .get_report_by_id(id, auth_user.user.id)
        .await
        .map_err(|e| ReportError::database(e.to_string()))?
        .ok_or_else(|| ReportError::not_found_by_id(id))?;

    let logs = state
        .db
        .list_query_logs_for_report(id, auth_user.user.id)
        .await
        .map_err(|e| ReportError::database(e.to_string()))?;

    Ok(Json(logs.into_iter().map(QueryLogResponse::from).collect()))
}
