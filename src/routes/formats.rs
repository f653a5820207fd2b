//! Format listing endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::config::UnknownInputPolicy;
use crate::convert::{ConversionPipeline, SUPPORTED_OUTPUT_FORMATS};
use crate::state::AppState;

#[derive(Serialize)]
pub struct FormatsResponse {
    pub inputs: Vec<String>,
    pub outputs: Vec<&'static str>,
    pub notes: Vec<String>,
}

/// GET /formats
pub async fn list_formats(State(state): State<AppState>) -> Json<FormatsResponse> {
    let pipeline = state.pipeline();

    Json(FormatsResponse {
        inputs: pipeline.table().extensions().map(str::to_string).collect(),
        outputs: SUPPORTED_OUTPUT_FORMATS.to_vec(),
        notes: notes(pipeline),
    })
}

/// Human-readable description of the active policies
fn notes(pipeline: &ConversionPipeline) -> Vec<String> {
    let mut notes = vec!["Pandoc is the primary converter.".to_string()];

    if pipeline.converters().fallback_enabled() {
        notes.push("LibreOffice is used as a fallback when pandoc fails.".to_string());
    } else {
        notes.push("LibreOffice fallback is disabled.".to_string());
    }

    match pipeline.table().unknown_policy() {
        UnknownInputPolicy::Fixed(ident) => notes.push(format!(
            "Files with unlisted extensions are read as '{}'.",
            ident
        )),
        UnknownInputPolicy::AutoDetect => {
            notes.push("Files with unlisted extensions are auto-detected by the converter.".to_string())
        }
    }

    if pipeline.normalize_text() {
        notes.push("Text inputs are re-encoded as UTF-8 before conversion.".to_string());
    }

    notes.push("PDF output may require LaTeX for some formats.".to_string());
    notes
}
