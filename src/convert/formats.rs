//! Format resolution
//!
//! Maps input file extensions to pandoc reader names and validates the
//! requested output format. The table is built once at startup and shared
//! read-only between requests.

use std::path::Path;

use crate::config::{ConversionConfig, UnknownInputPolicy};
use crate::error::ConvertError;

/// Output formats accepted by `/convert`
pub const SUPPORTED_OUTPUT_FORMATS: &[&str] = &[
    "pdf", "docx", "odt", "rtf", "md", "html", "txt", "pptx", "xlsx", "csv", "tex", "epub",
    "asciidoc", "mediawiki",
];

/// Default `extension -> input format` entries
const DEFAULT_INPUT_FORMATS: &[(&str, &str)] = &[
    ("docx", "docx"),
    // pandoc has no .doc reader; these succeed only through the fallback
    ("doc", "docx"),
    ("odt", "odt"),
    ("rtf", "rtf"),
    ("txt", "markdown"),
    ("md", "markdown"),
    ("markdown", "markdown"),
    ("html", "html"),
    ("htm", "html"),
    ("xhtml", "html"),
    ("epub", "epub"),
    ("pptx", "pptx"),
    ("xlsx", "xlsx"),
    ("csv", "csv"),
    ("tsv", "tsv"),
    ("tex", "latex"),
    ("latex", "latex"),
    ("asciidoc", "asciidoc"),
    ("adoc", "asciidoc"),
    ("mediawiki", "mediawiki"),
    ("wiki", "mediawiki"),
    ("rst", "rst"),
    ("org", "org"),
    ("textile", "textile"),
    ("ipynb", "ipynb"),
    ("typ", "typst"),
    ("fb2", "fb2"),
];

/// Input formats whose files are re-encoded as UTF-8 before conversion
pub const TEXT_LIKE_FORMATS: &[&str] = &[
    "markdown", "plain", "html", "latex", "rst", "mediawiki", "asciidoc", "csv", "tsv", "textile",
    "org",
];

/// Ordered extension table plus the policy for unmapped extensions
#[derive(Debug, Clone)]
pub struct FormatTable {
    entries: Vec<(String, String)>,
    unknown: UnknownInputPolicy,
}

impl FormatTable {
    /// Default table with the given unknown-extension policy
    pub fn new(unknown: UnknownInputPolicy) -> Self {
        Self {
            entries: DEFAULT_INPUT_FORMATS
                .iter()
                .map(|(ext, ident)| (ext.to_string(), ident.to_string()))
                .collect(),
            unknown,
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(config.unknown_input.clone()).with_overrides(&config.format_overrides)
    }

    /// Replace existing entries in place, append new ones
    pub fn with_overrides(mut self, overrides: &[(String, String)]) -> Self {
        for (ext, ident) in overrides {
            let ext = normalize_extension(ext);
            match self.entries.iter_mut().find(|(known, _)| *known == ext) {
                Some(entry) => entry.1 = ident.clone(),
                None => self.entries.push((ext, ident.clone())),
            }
        }
        self
    }

    /// Exact table lookup for an extension (case-insensitive, dots ignored)
    pub fn lookup(&self, extension: &str) -> Option<&str> {
        let extension = normalize_extension(extension);
        self.entries
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, ident)| ident.as_str())
    }

    /// Input-format hint for a file name; `None` means let the converter detect it
    pub fn resolve(&self, file_name: &str) -> Option<&str> {
        let mapped = file_extension(file_name).and_then(|ext| self.lookup(&ext));
        match (mapped, &self.unknown) {
            (Some(ident), _) => Some(ident),
            (None, UnknownInputPolicy::Fixed(ident)) => Some(ident.as_str()),
            (None, UnknownInputPolicy::AutoDetect) => None,
        }
    }

    /// Whether `file_name` maps to a text input format through the table
    ///
    /// The unknown-extension policy is not consulted: an unmapped file may be
    /// any binary format and must reach the converter byte for byte.
    pub fn is_text_input(&self, file_name: &str) -> bool {
        file_extension(file_name)
            .and_then(|ext| self.lookup(&ext))
            .is_some_and(is_text_like)
    }

    /// Known extensions, in table order
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(ext, _)| ext.as_str())
    }

    pub fn unknown_policy(&self) -> &UnknownInputPolicy {
        &self.unknown
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Lower-case, dot-free output format
pub fn normalize_output_format(format: &str) -> String {
    format.trim().trim_start_matches('.').to_lowercase()
}

/// Normalize and check against [`SUPPORTED_OUTPUT_FORMATS`]
pub fn validate_output_format(format: &str) -> Result<String, ConvertError> {
    let normalized = normalize_output_format(format);
    if SUPPORTED_OUTPUT_FORMATS.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(ConvertError::UnsupportedFormat {
            format: format.trim().to_string(),
            supported: SUPPORTED_OUTPUT_FORMATS.to_vec(),
        })
    }
}

pub fn is_text_like(input_format: &str) -> bool {
    TEXT_LIKE_FORMATS.contains(&input_format)
}

/// Lower-cased extension of a file name, if any
pub fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// File name without its final extension
pub fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("")
}

/// `<stem>.<format>` for the response, `converted` when the stem is unusable
pub fn output_file_name(input_name: &str, output_format: &str) -> String {
    let stem: String = file_stem(input_name)
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '"' | '\\' | '/' | ';'))
        .collect();
    let stem = stem.trim();
    let stem = if stem.is_empty() { "converted" } else { stem };
    format!("{}.{}", stem, output_format)
}
