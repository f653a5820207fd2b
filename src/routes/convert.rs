//! Conversion endpoint
//!
//! `POST /convert` takes multipart fields:
//! - `format` (required) target format, e.g. `pdf`, `.DOCX`
//! - `file` uploaded document
//! - `url` document to download instead of uploading
//!
//! Exactly one of `file` and `url` must be given. The converted document is
//! returned as `application/octet-stream` named `<input stem>.<format>`.

use axum::{
    body::{Body, Bytes},
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::Response,
    routing::post,
    Router,
};

use crate::convert::{ConversionRequest, ConvertedDocument};
use crate::error::{ConvertError, Result};
use crate::state::AppState;

/// Create the convert router
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/convert", post(convert_document))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// POST /convert
async fn convert_document(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let mut multipart =
        multipart.map_err(|e| ConvertError::Input(format!("Expected a multipart form: {}", e)))?;

    let limit = state.config().server.max_upload_bytes;
    let mut format: Option<String> = None;
    let mut url: Option<String> = None;
    let mut upload: Option<(Option<String>, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        read_error(e, "Failed to read upload", limit)
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "format" => format = Some(read_text(field, limit).await?),
            "url" => url = Some(read_text(field, limit).await?),
            "file" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| read_error(e, "Failed to read file data", limit))?;

                tracing::debug!(file_name = ?file_name, bytes = data.len(), "Received upload");
                upload = Some((file_name, data));
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let request = ConversionRequest::from_parts(format, upload, url)?;
    let document = state.pipeline().run(request).await?;

    document_response(document)
}

async fn read_text(field: Field<'_>, limit: usize) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| read_error(e, "Failed to read form field", limit))
}

/// Body-limit overruns become 413; anything else is a malformed request
fn read_error(err: MultipartError, context: &str, limit: usize) -> ConvertError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ConvertError::PayloadTooLarge(format!(
            "Upload exceeds the maximum size of {} bytes",
            limit
        ))
    } else {
        ConvertError::Input(format!("{}: {}", context, err))
    }
}

fn document_response(document: ConvertedDocument) -> Result<Response> {
    let disposition = HeaderValue::from_str(&content_disposition(&document.file_name))
        .map_err(|e| ConvertError::Conversion(format!("Invalid output file name: {}", e)))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, document.data.len())
        .header(header::CONTENT_DISPOSITION, disposition)
        .header("X-Converter", document.converter.to_string())
        .body(Body::from(document.data))
        .map_err(|e| ConvertError::Conversion(e.to_string()))
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name
fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect();

    if ascii == file_name {
        format!("attachment; filename=\"{}\"", file_name)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            urlencoding::encode(file_name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_unicode() {
        assert_eq!(
            content_disposition("résumé.pdf"),
            "attachment; filename=\"r_sum_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
    }
}
