//! Converter Module
//!
//! Wraps the external document converters.
//!
//! Supports two backends:
//! - pandoc (primary, markup conversion)
//! - LibreOffice headless (optional fallback, office documents)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docconv_server::converter::{ConverterChain, PandocConverter, ConversionJob};
//!
//! let pandoc = Arc::new(PandocConverter::new("pandoc", None, Duration::from_secs(120)));
//! let chain = ConverterChain::new(pandoc, None, false);
//!
//! chain.convert(&ConversionJob {
//!     input: &input_path,
//!     input_format: Some("markdown"),
//!     output_format: "html",
//!     output: &output_path,
//! }).await?;
//! ```

mod process;
mod provider;
mod service;
mod types;

pub use provider::{Converter, LibreOfficeConverter, PandocConverter};
pub use service::{ConverterChain, ToolAvailability};
pub use types::{ConversionJob, ConverterError, ConverterKind};

#[cfg(test)]
pub(crate) use provider::MockConverter;
