use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use super::AppError;

/// Errors related to report lookup and lifecycle operations
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Report not found")]
    NotFound,

    #[error("Report with ID {id} not found")]
    NotFoundById { id: Uuid },

    #[error("Stored file for report {id} is missing: {path}")]
    FileMissing { id: Uuid, path: String },

    #[error("Invalid status transition from '{from}' to '{to}' for report {id}")]
    InvalidStatusTransition { id: Uuid, from: String, to: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl AppError for ReportError {
    fn status_code(&self) -> StatusCode {
        match self {
            ReportError::NotFound | ReportError::NotFoundById { .. } => StatusCode::NOT_FOUND,
            ReportError::FileMissing { .. } => StatusCode::GONE,
            ReportError::InvalidStatusTransition { .. } => StatusCode::CONFLICT,
            ReportError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            ReportError::NotFound | ReportError::NotFoundById { .. } => {
                "Report not found".to_string()
            }
            ReportError::FileMissing { .. } => {
                "The stored file for this report is no longer available".to_string()
            }
            ReportError::InvalidStatusTransition { .. } => {
                "Report is not in a state that allows this operation".to_string()
            }
            ReportError::Database { .. } => "An internal error occurred".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ReportError::NotFound => "REPORT_NOT_FOUND",
            ReportError::NotFoundById { .. } => "REPORT_NOT_FOUND_BY_ID",
            ReportError::FileMissing { .. } => "REPORT_FILE_MISSING",
            ReportError::InvalidStatusTransition { .. } => "REPORT_INVALID_STATUS_TRANSITION",
            ReportError::Database { .. } => "REPORT_DATABASE_ERROR",
        }
    }
}

impl_into_response!(ReportError);

impl ReportError {
    pub fn not_found_by_id(id: Uuid) -> Self {
        Self::NotFoundById { id }
    }

    pub fn database<S: Into<String>>(message: S) -> Self {
        Self::Database { message: message.into() }
    }
}
