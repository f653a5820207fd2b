//! Converter Chain
//!
//! Runs the primary converter and, when the fallback policy is enabled,
//! retries a failed job once with the secondary converter.

use std::sync::Arc;

use tokio::sync::OnceCell;

use super::{
    process::ensure_output,
    provider::Converter,
    types::{ConversionJob, ConverterError, ConverterKind},
};

/// Which tools answered their availability probe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ToolAvailability {
    pub pandoc: bool,
    pub libreoffice: bool,
}

/// Primary converter plus optional fallback
pub struct ConverterChain {
    primary: Arc<dyn Converter>,
    secondary: Option<Arc<dyn Converter>>,
    fallback_enabled: bool,
    availability: OnceCell<ToolAvailability>,
}

impl ConverterChain {
    /// Create a chain. `secondary` is only used when `fallback_enabled` is set,
    /// but is still probed for `/health`.
    pub fn new(
        primary: Arc<dyn Converter>,
        secondary: Option<Arc<dyn Converter>>,
        fallback_enabled: bool,
    ) -> Self {
        Self {
            primary,
            secondary,
            fallback_enabled,
            availability: OnceCell::new(),
        }
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled && self.secondary.is_some()
    }

    /// Probe installed tools once and cache the answer
    pub async fn availability(&self) -> ToolAvailability {
        *self
            .availability
            .get_or_init(|| async {
                let mut availability = ToolAvailability::default();
                for converter in std::iter::once(&self.primary).chain(self.secondary.iter()) {
                    let available = converter.is_available().await;
                    match converter.kind() {
                        ConverterKind::Pandoc => availability.pandoc |= available,
                        ConverterKind::LibreOffice => availability.libreoffice |= available,
                    }
                }
                tracing::info!(
                    pandoc = availability.pandoc,
                    libreoffice = availability.libreoffice,
                    "Converter availability probed"
                );
                availability
            })
            .await
    }

    /// Run the job, returning the converter that produced the output
    pub async fn convert(&self, job: &ConversionJob<'_>) -> Result<ConverterKind, ConverterError> {
        let primary_error = match attempt(self.primary.as_ref(), job).await {
            Ok(kind) => return Ok(kind),
            Err(e) => e,
        };

        let secondary = match (&self.secondary, self.fallback_enabled) {
            (Some(secondary), true) => secondary,
            _ => return Err(primary_error),
        };

        tracing::warn!(
            "Converter {} failed: {}, trying {}",
            self.primary.kind(),
            primary_error,
            secondary.kind()
        );

        // Partial output from the failed run must not leak into the retry
        let _ = tokio::fs::remove_file(job.output).await;

        attempt(secondary.as_ref(), job)
            .await
            .map_err(|fallback_error| ConverterError::Exhausted {
                primary: Box::new(primary_error),
                fallback: Box::new(fallback_error),
            })
    }
}

/// One converter run; a missing or empty output file counts as failure
async fn attempt(converter: &dyn Converter, job: &ConversionJob<'_>) -> Result<ConverterKind, ConverterError> {
    converter.convert(job).await?;
    ensure_output(converter.kind(), job.output).await?;
    Ok(converter.kind())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::provider::MockConverter;

    struct Fixture {
        _dir: tempfile::TempDir,
        input: std::path::PathBuf,
        output: std::path::PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("report.docx");
        let output = dir.path().join("report.pdf");
        std::fs::write(&input, b"PK fake docx").unwrap();
        Fixture { _dir: dir, input, output }
    }

    fn job(f: &Fixture) -> ConversionJob<'_> {
        ConversionJob {
            input: &f.input,
            input_format: Some("docx"),
            output_format: "pdf",
            output: &f.output,
        }
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let f = fixture();
        let primary = Arc::new(MockConverter::succeeding(ConverterKind::Pandoc, b"%PDF primary"));
        let secondary = Arc::new(MockConverter::succeeding(ConverterKind::LibreOffice, b"%PDF secondary"));
        let chain = ConverterChain::new(primary.clone(), Some(secondary.clone()), true);

        let used = chain.convert(&job(&f)).await.unwrap();

        assert_eq!(used, ConverterKind::Pandoc);
        assert_eq!(secondary.call_count(), 0);
        assert_eq!(std::fs::read(&f.output).unwrap(), b"%PDF primary");
    }

    #[tokio::test]
    async fn test_no_fallback_policy_fails_fast() {
        let f = fixture();
        let primary = Arc::new(MockConverter::failing(ConverterKind::Pandoc));
        let secondary = Arc::new(MockConverter::succeeding(ConverterKind::LibreOffice, b"%PDF"));
        let chain = ConverterChain::new(primary, Some(secondary.clone()), false);

        let err = chain.convert(&job(&f)).await.unwrap_err();

        assert!(matches!(err, ConverterError::Failed { tool: ConverterKind::Pandoc, .. }));
        assert!(err.to_string().contains("pandoc mock failure"));
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fallback_policy_uses_secondary() {
        let f = fixture();
        let primary = Arc::new(MockConverter::failing(ConverterKind::Pandoc));
        let secondary = Arc::new(MockConverter::succeeding(ConverterKind::LibreOffice, b"%PDF secondary"));
        let chain = ConverterChain::new(primary.clone(), Some(secondary.clone()), true);

        let used = chain.convert(&job(&f)).await.unwrap();

        assert_eq!(used, ConverterKind::LibreOffice);
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 1);
        assert_eq!(std::fs::read(&f.output).unwrap(), b"%PDF secondary");
    }

    #[tokio::test]
    async fn test_fallback_exhausted_reports_both() {
        let f = fixture();
        let chain = ConverterChain::new(
            Arc::new(MockConverter::failing(ConverterKind::Pandoc)),
            Some(Arc::new(MockConverter::failing(ConverterKind::LibreOffice))),
            true,
        );

        let err = chain.convert(&job(&f)).await.unwrap_err();
        let message = err.to_string();

        assert!(matches!(err, ConverterError::Exhausted { .. }));
        assert!(message.contains("pandoc mock failure"));
        assert!(message.contains("libreoffice mock failure"));
    }

    #[tokio::test]
    async fn test_availability_is_cached() {
        let mut secondary = MockConverter::succeeding(ConverterKind::LibreOffice, b"");
        secondary.available = false;
        let chain = ConverterChain::new(
            Arc::new(MockConverter::succeeding(ConverterKind::Pandoc, b"")),
            Some(Arc::new(secondary)),
            false,
        );

        let first = chain.availability().await;
        assert_eq!(first, ToolAvailability { pandoc: true, libreoffice: false });
        assert_eq!(chain.availability().await, first);
        assert!(!chain.fallback_enabled());
    }
}
