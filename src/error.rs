//! Error types for the Docconv server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::convert::FetchError;
use crate::converter::ConverterError;

/// Conversion result type
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Errors surfaced by the conversion pipeline
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Missing or unusable input (no file, no URL, failed download)
    #[error("{0}")]
    Input(String),

    /// Requested output format is not supported
    #[error("Unsupported output format '{format}'. Supported formats: {}", .supported.join(", "))]
    UnsupportedFormat {
        format: String,
        supported: Vec<&'static str>,
    },

    /// Request body exceeds the upload limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Every configured converter failed
    #[error("{0}")]
    Conversion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConvertError::Input(_) | ConvertError::UnsupportedFormat { .. } => StatusCode::BAD_REQUEST,
            ConvertError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ConvertError::Conversion(_) | ConvertError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FetchError> for ConvertError {
    fn from(err: FetchError) -> Self {
        ConvertError::Input(format!("Could not download file from URL: {}", err))
    }
}

impl From<ConverterError> for ConvertError {
    fn from(err: ConverterError) -> Self {
        ConvertError::Conversion(format!("Conversion failed: {}", err))
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            ConvertError::Io(e) => {
                tracing::error!("IO error: {}", e);
                "An internal error occurred".to_string()
            }
            ConvertError::Conversion(msg) => {
                tracing::error!("Conversion error: {}", msg);
                msg.clone()
            }
            other => {
                tracing::debug!("Rejected request: {}", other);
                other.to_string()
            }
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ConvertError::Input("No file or URL provided".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ConvertError::UnsupportedFormat {
                format: "exe".into(),
                supported: vec!["pdf"],
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ConvertError::Conversion("pandoc exited with status 1".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ConvertError::PayloadTooLarge("Upload exceeds 10 bytes".into()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_unsupported_format_lists_supported() {
        let err = ConvertError::UnsupportedFormat {
            format: "exe".into(),
            supported: vec!["pdf", "docx", "md"],
        };
        assert_eq!(
            err.to_string(),
            "Unsupported output format 'exe'. Supported formats: pdf, docx, md"
        );
    }

    #[test]
    fn test_fetch_error_is_input_error() {
        let err: ConvertError = FetchError::Status(404).into();
        assert!(matches!(err, ConvertError::Input(_)));
        assert!(err.to_string().contains("Could not download file from URL"));
    }
}
