use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Processing lifecycle of an uploaded report.
///
/// Transitions only move forward: `Pending -> Processing -> Completed | Failed`.
/// Terminal reports are never mutated again except by deletion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, ToSchema)]
pub enum ReportStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
}

impl ReportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Completed | ReportStatus::Failed)
    }

    pub fn can_transition_to(&self, next: ReportStatus) -> bool {
        match (self, next) {
            (ReportStatus::Pending, ReportStatus::Processing) => true,
            (ReportStatus::Processing, ReportStatus::Completed) => true,
            (ReportStatus::Processing, ReportStatus::Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Pending => write!(f, "pending"),
            ReportStatus::Processing => write!(f, "processing"),
            ReportStatus::Completed => write!(f, "completed"),
            ReportStatus::Failed => write!(f, "failed"),
        }
    }
}

impl TryFrom<String> for ReportStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "processing" => Ok(ReportStatus::Processing),
            "completed" => Ok(ReportStatus::Completed),
            "failed" => Ok(ReportStatus::Failed),
            _ => Err(format!("Invalid report status: {}", value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub upload_date: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub processing_status: ReportStatus,
    pub extracted_text: Option<String>,
    pub analysis_result: Option<String>,
    pub confidence_score: Option<f64>,
}

/// Summary row returned by the report listing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportSummary {
    pub id: Uuid,
    pub filename: String,
    pub upload_date: DateTime<Utc>,
    pub processing_status: ReportStatus,
    pub confidence_score: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportResponse {
    pub id: Uuid,
    pub filename: String,
    pub file_size: i64,
    pub upload_date: DateTime<Utc>,
    pub processing_status: ReportStatus,
    pub extracted_text: Option<String>,
    pub analysis_result: Option<String>,
    pub confidence_score: Option<f64>,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            id: report.id,
            filename: report.filename,
            file_size: report.file_size,
            upload_date: report.upload_date,
            processing_status: report.processing_status,
            extracted_text: report.extracted_text,
            analysis_result: report.analysis_result,
            confidence_score: report.confidence_score,
        }
    }
}

impl From<&Report> for ReportSummary {
    fn from(report: &Report) -> Self {
        Self {
            id: report.id,
            filename: report.filename.clone(),
            upload_date: report.upload_date,
            processing_status: report.processing_status,
            confidence_score: report.confidence_score,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportUploadResponse {
    pub id: Uuid,
    pub filename: String,
    pub file_size: i64,
    pub processing_status: ReportStatus,
    pub message: String,
}
