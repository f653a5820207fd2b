//! Converter Providers
//!
//! Defines the converter trait and the pandoc and LibreOffice backends.

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use super::process::{ensure_output, probe, run_tool};
use super::types::{ConversionJob, ConverterError, ConverterKind};
use crate::convert::TempSpace;

/// Timeout for `--version` probes
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Converter trait
#[async_trait]
pub trait Converter: Send + Sync {
    /// Get the converter type
    fn kind(&self) -> ConverterKind;

    /// Check if the converter binary is installed and runnable
    async fn is_available(&self) -> bool;

    /// Convert `job.input` into `job.output`
    async fn convert(&self, job: &ConversionJob<'_>) -> Result<(), ConverterError>;
}

/// pandoc converter
pub struct PandocConverter {
    program: String,
    pdf_engine: Option<String>,
    timeout: Duration,
}

impl PandocConverter {
    pub fn new(program: &str, pdf_engine: Option<&str>, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            pdf_engine: pdf_engine.map(str::to_string),
            timeout,
        }
    }

    /// Build the pandoc argument list for a job
    fn args(&self, job: &ConversionJob<'_>) -> Result<Vec<OsString>, ConverterError> {
        let mut args: Vec<OsString> = vec![job.input.as_os_str().to_owned()];

        if let Some(reader) = job.input_format {
            args.push("-f".into());
            args.push(reader.into());
        }

        // pdf has no writer name; pandoc picks LaTeX from the output extension
        if let Some(writer) = pandoc_writer(job.output_format)? {
            args.push("-t".into());
            args.push(writer.into());
        }

        args.push("-o".into());
        args.push(job.output.as_os_str().to_owned());

        if job.output_format == "pdf" {
            if let Some(engine) = &self.pdf_engine {
                args.push(format!("--pdf-engine={}", engine).into());
            }
        }

        if job.output_format != "pdf" {
            // Whole documents (headers, <html> wrapper) rather than fragments
            args.push("--standalone".into());
        }

        Ok(args)
    }
}

/// Map an output format to its pandoc writer name
fn pandoc_writer(format: &str) -> Result<Option<&str>, ConverterError> {
    let writer = match format {
        "pdf" => return Ok(None),
        "md" => "markdown",
        "txt" => "plain",
        "tex" => "latex",
        "xlsx" | "csv" => {
            return Err(ConverterError::UnsupportedOutput {
                tool: ConverterKind::Pandoc,
                format: format.to_string(),
            })
        }
        other => other,
    };
    Ok(Some(writer))
}

#[async_trait]
impl Converter for PandocConverter {
    fn kind(&self) -> ConverterKind {
        ConverterKind::Pandoc
    }

    async fn is_available(&self) -> bool {
        probe(&self.program, PROBE_TIMEOUT).await
    }

    async fn convert(&self, job: &ConversionJob<'_>) -> Result<(), ConverterError> {
        let args = self.args(job)?;

        tracing::debug!(
            input_format = job.input_format.unwrap_or("auto"),
            output_format = job.output_format,
            "Running pandoc"
        );

        run_tool(ConverterKind::Pandoc, &self.program, &args, self.timeout).await?;
        Ok(())
    }
}

/// LibreOffice headless converter
pub struct LibreOfficeConverter {
    program: String,
    timeout: Duration,
    temp: TempSpace,
}

impl LibreOfficeConverter {
    pub fn new(program: &str, timeout: Duration, temp: TempSpace) -> Self {
        Self {
            program: program.to_string(),
            timeout,
            temp,
        }
    }
}

/// Map an output format to a LibreOffice `--convert-to` filter
fn libreoffice_filter(format: &str) -> Result<&str, ConverterError> {
    match format {
        "txt" => Ok("txt:Text (encoded):UTF8"),
        "md" | "tex" | "asciidoc" | "mediawiki" => Err(ConverterError::UnsupportedOutput {
            tool: ConverterKind::LibreOffice,
            format: format.to_string(),
        }),
        other => Ok(other),
    }
}

#[async_trait]
impl Converter for LibreOfficeConverter {
    fn kind(&self) -> ConverterKind {
        ConverterKind::LibreOffice
    }

    async fn is_available(&self) -> bool {
        probe(&self.program, PROBE_TIMEOUT).await
    }

    async fn convert(&self, job: &ConversionJob<'_>) -> Result<(), ConverterError> {
        let tool = ConverterKind::LibreOffice;
        let filter = libreoffice_filter(job.output_format)?;
        let extension = filter.split(':').next().unwrap_or(job.output_format);

        // soffice names its output after the input; give it a private dir and profile
        let out_dir = self
            .temp
            .create_dir()
            .await
            .map_err(|source| ConverterError::Io { tool, source })?;
        let profile = profile_url(&out_dir.path().join("profile"))
            .map_err(|source| ConverterError::Io { tool, source })?;

        let args: Vec<OsString> = vec![
            "--headless".into(),
            "--norestore".into(),
            format!("-env:UserInstallation={}", profile).into(),
            "--convert-to".into(),
            filter.into(),
            "--outdir".into(),
            out_dir.path().as_os_str().to_owned(),
            job.input.as_os_str().to_owned(),
        ];

        tracing::debug!(filter = filter, "Running LibreOffice");
        run_tool(tool, &self.program, &args, self.timeout).await?;

        let stem = job
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let produced = out_dir.path().join(format!("{}.{}", stem, extension));
        ensure_output(tool, &produced).await?;

        move_file(&produced, job.output)
            .await
            .map_err(|source| ConverterError::Io { tool, source })?;

        out_dir.release().await.map_err(|source| ConverterError::Io { tool, source })
    }
}

/// Percent-encoded `file://` URL for a LibreOffice profile directory
fn profile_url(profile: &Path) -> std::io::Result<String> {
    let absolute = if profile.is_absolute() {
        profile.to_path_buf()
    } else {
        std::env::current_dir()?.join(profile)
    };

    reqwest::Url::from_file_path(&absolute)
        .map(|url| url.to_string())
        .map_err(|()| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot express {} as a file URL", absolute.display()),
            )
        })
}

/// Rename, falling back to copy when source and target sit on different filesystems
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}

/// Mock converter for testing
#[cfg(test)]
pub struct MockConverter {
    pub kind: ConverterKind,
    pub available: bool,
    /// `Some(bytes)` writes the output, `None` fails
    pub output: Option<Vec<u8>>,
    pub calls: std::sync::atomic::AtomicUsize,
    /// Input bytes and format hint of every job seen
    pub seen: std::sync::Mutex<Vec<(Vec<u8>, Option<String>)>>,
}

#[cfg(test)]
impl MockConverter {
    pub fn succeeding(kind: ConverterKind, output: &[u8]) -> Self {
        Self {
            kind,
            available: true,
            output: Some(output.to_vec()),
            calls: std::sync::atomic::AtomicUsize::new(0),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn failing(kind: ConverterKind) -> Self {
        Self {
            kind,
            available: true,
            output: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Input bytes and format hint of the most recent job
    pub fn last_input(&self) -> Option<(Vec<u8>, Option<String>)> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[cfg(test)]
#[async_trait]
impl Converter for MockConverter {
    fn kind(&self) -> ConverterKind {
        self.kind
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn convert(&self, job: &ConversionJob<'_>) -> Result<(), ConverterError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let input = tokio::fs::read(job.input).await.unwrap_or_default();
        self.seen
            .lock()
            .unwrap()
            .push((input, job.input_format.map(str::to_string)));

        match &self.output {
            Some(bytes) => tokio::fs::write(job.output, bytes)
                .await
                .map_err(|source| ConverterError::Io { tool: self.kind, source }),
            None => Err(ConverterError::Failed {
                tool: self.kind,
                status: "1".to_string(),
                diagnostic: format!("{} mock failure", self.kind),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job<'a>(input: &'a Path, output: &'a Path, from: Option<&'a str>, to: &'a str) -> ConversionJob<'a> {
        ConversionJob {
            input,
            input_format: from,
            output_format: to,
            output,
        }
    }

    #[test]
    fn test_pandoc_args_with_hint() {
        let pandoc = PandocConverter::new("pandoc", None, Duration::from_secs(5));
        let input = PathBuf::from("/tmp/in.md");
        let output = PathBuf::from("/tmp/out.html");

        let args = pandoc.args(&job(&input, &output, Some("markdown"), "html")).unwrap();
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["/tmp/in.md", "-f", "markdown", "-t", "html", "-o", "/tmp/out.html", "--standalone"]
        );
    }

    #[test]
    fn test_pandoc_args_auto_detect_pdf() {
        let pandoc = PandocConverter::new("pandoc", Some("xelatex"), Duration::from_secs(5));
        let input = PathBuf::from("/tmp/in.docx");
        let output = PathBuf::from("/tmp/out.pdf");

        let args = pandoc.args(&job(&input, &output, None, "pdf")).unwrap();
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["/tmp/in.docx", "-o", "/tmp/out.pdf", "--pdf-engine=xelatex"]);
    }

    #[test]
    fn test_pandoc_writer_mapping() {
        assert_eq!(pandoc_writer("md").unwrap(), Some("markdown"));
        assert_eq!(pandoc_writer("txt").unwrap(), Some("plain"));
        assert_eq!(pandoc_writer("tex").unwrap(), Some("latex"));
        assert_eq!(pandoc_writer("docx").unwrap(), Some("docx"));
        assert_eq!(pandoc_writer("pdf").unwrap(), None);
        assert!(matches!(
            pandoc_writer("xlsx"),
            Err(ConverterError::UnsupportedOutput { .. })
        ));
    }

    #[test]
    fn test_libreoffice_filter_mapping() {
        assert_eq!(libreoffice_filter("pdf").unwrap(), "pdf");
        assert_eq!(libreoffice_filter("txt").unwrap(), "txt:Text (encoded):UTF8");
        assert!(libreoffice_filter("md").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_profile_url_is_percent_encoded() {
        assert_eq!(
            profile_url(Path::new("/tmp/docconv-abc/profile")).unwrap(),
            "file:///tmp/docconv-abc/profile"
        );
        assert_eq!(
            profile_url(Path::new("/var/tmp/doc conv/café/profile")).unwrap(),
            "file:///var/tmp/doc%20conv/caf%C3%A9/profile"
        );

        let relative = profile_url(Path::new("scratch/profile")).unwrap();
        assert!(relative.starts_with("file:///"));
        assert!(relative.ends_with("/scratch/profile"));
    }

    #[tokio::test]
    async fn test_mock_converter() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in.md");
        let output = dir.path().join("out.html");

        let ok = MockConverter::succeeding(ConverterKind::Pandoc, b"<p>ok</p>");
        ok.convert(&job(&input, &output, None, "html")).await.unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"<p>ok</p>");
        assert_eq!(ok.call_count(), 1);

        let failing = MockConverter::failing(ConverterKind::LibreOffice);
        assert!(failing.convert(&job(&input, &output, None, "html")).await.is_err());
    }
}
