//! Conversion pipeline
//!
//! Validating → Fetching → Converting → Done | Failed, strictly in order.
//! Temp artifacts live only inside [`ConversionPipeline::run`]; by the time it
//! returns, success or error, they have been removed.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use super::encoding::normalize_text_encoding;
use super::formats::{file_extension, output_file_name, validate_output_format, FormatTable};
use super::input::{parse_source_url, upload_file_name, url_file_name, FetchError, UrlFetcher};
use super::temp::{TempArtifact, TempSpace};
use super::types::{ConversionRequest, ConversionStage, ConvertedDocument, InputSource};
use crate::config::ConversionConfig;
use crate::converter::{ConversionJob, ConverterChain, LibreOfficeConverter, PandocConverter};
use crate::error::{ConvertError, Result};

/// Shared, immutable conversion pipeline
pub struct ConversionPipeline {
    table: Arc<FormatTable>,
    converters: ConverterChain,
    fetcher: UrlFetcher,
    temp: TempSpace,
    normalize_text: bool,
}

impl ConversionPipeline {
    pub fn new(
        table: Arc<FormatTable>,
        converters: ConverterChain,
        fetcher: UrlFetcher,
        temp: TempSpace,
        normalize_text: bool,
    ) -> Self {
        Self {
            table,
            converters,
            fetcher,
            temp,
            normalize_text,
        }
    }

    /// Wire pandoc, LibreOffice and the URL fetcher from configuration
    pub fn from_config(config: &ConversionConfig) -> std::result::Result<Self, FetchError> {
        let timeout = Duration::from_secs(config.converter_timeout_secs);
        let temp = TempSpace::new(&config.temp_dir);

        let pandoc = PandocConverter::new(&config.pandoc_path, config.pdf_engine.as_deref(), timeout);
        let libreoffice = LibreOfficeConverter::new(&config.libreoffice_path, timeout, temp.clone());
        let converters = ConverterChain::new(
            Arc::new(pandoc),
            Some(Arc::new(libreoffice)),
            config.fallback_enabled,
        );

        let fetcher = UrlFetcher::new(
            Duration::from_secs(config.fetch_timeout_secs),
            config.max_download_bytes,
        )?;

        Ok(Self::new(
            Arc::new(FormatTable::from_config(config)),
            converters,
            fetcher,
            temp,
            config.normalize_text,
        ))
    }

    pub fn table(&self) -> &FormatTable {
        &self.table
    }

    pub fn converters(&self) -> &ConverterChain {
        &self.converters
    }

    pub fn temp(&self) -> &TempSpace {
        &self.temp
    }

    pub fn normalize_text(&self) -> bool {
        self.normalize_text
    }

    /// Convert one request end to end
    pub async fn run(&self, request: ConversionRequest) -> Result<ConvertedDocument> {
        let span = tracing::info_span!("convert", request_id = %Uuid::new_v4());

        async move {
            let result = self.execute(request).await;
            match &result {
                Ok(document) => tracing::info!(
                    stage = %ConversionStage::Done,
                    file_name = %document.file_name,
                    converter = %document.converter,
                    bytes = document.data.len(),
                    "Conversion complete"
                ),
                Err(e) => tracing::warn!(stage = %ConversionStage::Failed, "Conversion failed: {}", e),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, request: ConversionRequest) -> Result<ConvertedDocument> {
        tracing::debug!(
            stage = %ConversionStage::Validating,
            format = %request.output_format,
            "Validating request"
        );
        let output_format = validate_output_format(&request.output_format)?;

        tracing::debug!(stage = %ConversionStage::Fetching, "Resolving input");
        let (input, file_name) = self.resolve_input(request.source).await?;

        let input_format = self.table.resolve(&file_name);
        if self.normalize_text && self.table.is_text_input(&file_name) {
            normalize_text_encoding(input.path()).await;
        }

        tracing::debug!(
            stage = %ConversionStage::Converting,
            file_name = %file_name,
            input_format = input_format.unwrap_or("auto"),
            output_format = %output_format,
            "Invoking converter"
        );
        let output = self.temp.create_file(&output_format).await?;
        let converter = self
            .converters
            .convert(&ConversionJob {
                input: input.path(),
                input_format,
                output_format: &output_format,
                output: output.path(),
            })
            .await?;

        let data = tokio::fs::read(output.path()).await?;
        release(output).await;
        release(input).await;

        Ok(ConvertedDocument {
            file_name: output_file_name(&file_name, &output_format),
            data,
            converter,
        })
    }

    /// Materialize the source as a temp file; returns it with the logical file name
    async fn resolve_input(&self, source: InputSource) -> Result<(TempArtifact, String)> {
        match source {
            InputSource::Upload { file_name, data } => {
                let file_name = upload_file_name(&file_name);
                let extension = file_extension(&file_name).unwrap_or_default();
                let input = self.temp.create_file(&extension).await?;
                tokio::fs::write(input.path(), &data).await?;
                Ok((input, file_name))
            }
            InputSource::Url(raw) => {
                let url = parse_source_url(&raw)?;
                let file_name = url_file_name(&url);
                let extension = file_extension(&file_name).unwrap_or_default();
                let input = self.temp.create_file(&extension).await?;
                self.fetcher.fetch_to(&url, input.path()).await.map_err(|e| {
                    tracing::warn!(url = %url, "Download failed: {}", e);
                    ConvertError::from(e)
                })?;
                Ok((input, file_name))
            }
        }
    }
}

async fn release(artifact: TempArtifact) {
    let path = artifact.path().to_path_buf();
    if let Err(e) = artifact.release().await {
        tracing::warn!(path = %path.display(), "Failed to remove temp artifact: {}", e);
    }
}
