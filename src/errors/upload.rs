use axum::http::StatusCode;
use thiserror::Error;

use super::AppError;

/// Errors raised while validating and storing an uploaded report file
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No file found in upload")]
    MissingFile,

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Unsupported media type '{mime_type}' for '{filename}': only PDF reports are accepted")]
    UnsupportedMediaType { filename: String, mime_type: String },

    #[error("File '{filename}' exceeds the maximum allowed size of {max_mb} MB")]
    FileTooLarge { filename: String, max_mb: u64 },

    #[error("Failed to store uploaded file: {source}")]
    Storage {
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to read multipart request: {message}")]
    Multipart { message: String },
}

impl AppError for UploadError {
    fn status_code(&self) -> StatusCode {
        match self {
            UploadError::MissingFile => StatusCode::BAD_REQUEST,
            UploadError::EmptyFile => StatusCode::BAD_REQUEST,
            UploadError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            UploadError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            UploadError::Multipart { .. } => StatusCode::BAD_REQUEST,
        }
    }

    fn user_message(&self) -> String {
        match self {
            UploadError::MissingFile => "No file found in upload".to_string(),
            UploadError::EmptyFile => "Uploaded file is empty".to_string(),
            UploadError::UnsupportedMediaType { .. } => {
                "Only PDF blood test reports are accepted".to_string()
            }
            UploadError::FileTooLarge { max_mb, .. } => {
                format!("File exceeds the maximum allowed size of {} MB", max_mb)
            }
            UploadError::Storage { .. } => "Failed to store the uploaded file".to_string(),
            UploadError::Multipart { message } => message.clone(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            UploadError::MissingFile => "UPLOAD_MISSING_FILE",
            UploadError::EmptyFile => "UPLOAD_EMPTY_FILE",
            UploadError::UnsupportedMediaType { .. } => "UPLOAD_UNSUPPORTED_MEDIA_TYPE",
            UploadError::FileTooLarge { .. } => "UPLOAD_FILE_TOO_LARGE",
            UploadError::Storage { .. } => "UPLOAD_STORAGE_ERROR",
            UploadError::Multipart { .. } => "UPLOAD_MULTIPART_ERROR",
        }
    }
}

impl_into_response!(UploadError);

impl UploadError {
    pub fn unsupported_media_type<S: Into<String>>(filename: S, mime_type: S) -> Self {
        Self::UnsupportedMediaType {
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn storage(source: anyhow::Error) -> Self {
        Self::Storage { source }
    }

    pub fn multipart<S: Into<String>>(message: S) -> Self {
        Self::Multipart { message: message.into() }
    }
}
