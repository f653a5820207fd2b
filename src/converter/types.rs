//! Converter Types

use std::fmt;
use std::path::Path;

use serde::Serialize;

/// Converter backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    /// pandoc markup converter
    Pandoc,
    /// LibreOffice headless export
    LibreOffice,
}

impl fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConverterKind::Pandoc => f.write_str("pandoc"),
            ConverterKind::LibreOffice => f.write_str("libreoffice"),
        }
    }
}

/// One converter invocation: path in, path out
#[derive(Debug, Clone, Copy)]
pub struct ConversionJob<'a> {
    pub input: &'a Path,
    /// Input-format hint; `None` lets the converter detect it
    pub input_format: Option<&'a str>,
    /// Normalized output format (`pdf`, `md`, ...)
    pub output_format: &'a str,
    pub output: &'a Path,
}

/// Converter error types
#[derive(Debug, thiserror::Error)]
pub enum ConverterError {
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: ConverterKind,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with status {status}: {diagnostic}")]
    Failed {
        tool: ConverterKind,
        status: String,
        diagnostic: String,
    },

    #[error("{tool} timed out after {secs} seconds")]
    Timeout { tool: ConverterKind, secs: u64 },

    #[error("{tool} produced no output")]
    EmptyOutput { tool: ConverterKind },

    #[error("{tool} cannot produce '{format}'")]
    UnsupportedOutput { tool: ConverterKind, format: String },

    #[error("{tool} IO error: {source}")]
    Io {
        tool: ConverterKind,
        #[source]
        source: std::io::Error,
    },

    /// Primary and fallback converter both failed
    #[error("{primary}; fallback: {fallback}")]
    Exhausted {
        primary: Box<ConverterError>,
        fallback: Box<ConverterError>,
    },
}
