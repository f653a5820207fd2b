//! Conversion Pipeline Module
//!
//! Input resolution, format resolution and converter invocation for one
//! `/convert` request, plus the request-scoped temp file handling they share.
//!
//! Flow:
//! 1. Validate the output format against the supported set
//! 2. Write the upload (or download the URL) into a temp file
//! 3. Resolve the input-format hint from the file extension
//! 4. Run pandoc, optionally falling back to LibreOffice
//! 5. Read the output into memory and release every temp file

pub mod encoding;
pub mod formats;
pub mod input;
pub mod pipeline;
pub mod temp;
pub mod types;

pub use encoding::normalize_text_encoding;
pub use formats::{
    normalize_output_format, validate_output_format, FormatTable, SUPPORTED_OUTPUT_FORMATS,
    TEXT_LIKE_FORMATS,
};
pub use input::{FetchError, UrlFetcher};
pub use pipeline::ConversionPipeline;
pub use temp::{TempArtifact, TempSpace, ARTIFACT_PREFIX};
pub use types::{ConversionRequest, ConversionStage, ConvertedDocument, InputSource};
