//! Conversion request and result types

use std::fmt;

use axum::body::Bytes;

use crate::converter::ConverterKind;
use crate::error::ConvertError;

/// Where the input document comes from
#[derive(Debug, Clone)]
pub enum InputSource {
    /// Uploaded bytes plus the name the client declared
    Upload { file_name: String, data: Bytes },
    /// Document to download
    Url(String),
}

/// A validated `/convert` request: a target format and exactly one source
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub output_format: String,
    pub source: InputSource,
}

impl ConversionRequest {
    /// Build a request from raw form fields
    ///
    /// Empty fields count as absent, so a browser form with an empty file
    /// picker behaves like one without the field.
    pub fn from_parts(
        format: Option<String>,
        upload: Option<(Option<String>, Bytes)>,
        url: Option<String>,
    ) -> Result<Self, ConvertError> {
        let upload = upload.filter(|(name, data)| {
            !data.is_empty() || name.as_deref().is_some_and(|n| !n.trim().is_empty())
        });
        let url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());

        let source = match (upload, url) {
            (None, None) => return Err(ConvertError::Input("No file or URL provided".to_string())),
            (Some(_), Some(_)) => {
                return Err(ConvertError::Input(
                    "Provide either a file or a URL, not both".to_string(),
                ))
            }
            (Some((file_name, data)), None) => InputSource::Upload {
                file_name: file_name.unwrap_or_default(),
                data,
            },
            (None, Some(url)) => InputSource::Url(url),
        };

        let output_format = format
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| ConvertError::Input("No target format provided".to_string()))?;

        Ok(Self { output_format, source })
    }
}

/// Converted output, held in memory once every temp artifact is gone
#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    /// `<input stem>.<format>`
    pub file_name: String,
    pub data: Vec<u8>,
    /// Converter that produced `data`
    pub converter: ConverterKind,
}

/// Per-request pipeline stage, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStage {
    Validating,
    Fetching,
    Converting,
    Done,
    Failed,
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConversionStage::Validating => "validating",
            ConversionStage::Fetching => "fetching",
            ConversionStage::Converting => "converting",
            ConversionStage::Done => "done",
            ConversionStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, data: &'static [u8]) -> Option<(Option<String>, Bytes)> {
        Some((Some(name.to_string()), Bytes::from_static(data)))
    }

    #[test]
    fn test_requires_a_source() {
        let err = ConversionRequest::from_parts(Some("pdf".into()), None, None).unwrap_err();
        assert_eq!(err.to_string(), "No file or URL provided");

        // empty file picker and blank url are absent
        let err = ConversionRequest::from_parts(
            Some("pdf".into()),
            Some((Some(String::new()), Bytes::new())),
            Some("  ".into()),
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::Input(_)));
    }

    #[test]
    fn test_rejects_both_sources() {
        let err = ConversionRequest::from_parts(
            Some("pdf".into()),
            upload("report.docx", b"PK"),
            Some("http://example.com/report.docx".into()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn test_requires_format() {
        let err = ConversionRequest::from_parts(Some(" ".into()), upload("a.md", b"# a"), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "No target format provided");
    }

    #[test]
    fn test_builds_sources() {
        let request =
            ConversionRequest::from_parts(Some("pdf".into()), upload("report.docx", b"PK"), None)
                .unwrap();
        assert!(matches!(
            request.source,
            InputSource::Upload { ref file_name, .. } if file_name == "report.docx"
        ));

        let request = ConversionRequest::from_parts(
            Some("html".into()),
            None,
            Some(" http://example.com/a.md ".into()),
        )
        .unwrap();
        assert!(matches!(request.source, InputSource::Url(ref u) if u == "http://example.com/a.md"));
        assert_eq!(request.output_format, "html");
    }
}
