use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, ToSchema)]
pub enum QueryLogStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
}

impl std::fmt::Display for QueryLogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryLogStatus::Pending => write!(f, "pending"),
            QueryLogStatus::Completed => write!(f, "completed"),
            QueryLogStatus::Failed => write!(f, "failed"),
        }
    }
}

impl TryFrom<String> for QueryLogStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(QueryLogStatus::Pending),
            "completed" => Ok(QueryLogStatus::Completed),
            "failed" => Ok(QueryLogStatus::Failed),
            _ => Err(format!("Invalid query log status: {}", value)),
        }
    }
}

/// One recorded analysis request/response exchange against a report.
///
/// Created in `Pending` state when an analysis is requested; the worker fills
/// in the response and terminal status. Immutable after completion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QueryLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub report_id: Uuid,
    pub query_text: String,
    pub response_text: Option<String>,
    pub processing_time_ms: Option<i64>,
    #[sqlx(try_from = "String")]
    pub status: QueryLogStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryLogResponse {
    pub id: Uuid,
    pub report_id: Uuid,
    pub query_text: String,
    pub response_text: Option<String>,
    pub processing_time_ms: Option<i64>,
    pub status: QueryLogStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<QueryLog> for QueryLogResponse {
    fn from(log: QueryLog) -> Self {
        Self {
            id: log.id,
            report_id: log.report_id,
            query_text: log.query_text,
            response_text: log.response_text,
            processing_time_ms: log.processing_time_ms,
            status: log.status,
            created_at: log.created_at,
            completed_at: log.completed_at,
        }
    }
}
