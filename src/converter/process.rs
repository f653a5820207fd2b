//! Subprocess execution shared by the converter backends

use std::ffi::OsStr;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

use super::types::{ConverterError, ConverterKind};

/// Run a converter binary to completion, bounded by `timeout`
///
/// The child is killed if the timeout elapses or the future is dropped.
pub async fn run_tool<I, S>(
    tool: ConverterKind,
    program: &str,
    args: I,
    timeout: Duration,
) -> Result<Output, ConverterError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(tool = %tool, program = %program, "Spawning converter");

    let child = command
        .spawn()
        .map_err(|source| ConverterError::Spawn { tool, source })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| ConverterError::Io { tool, source })?,
        Err(_) => {
            return Err(ConverterError::Timeout {
                tool,
                secs: timeout.as_secs(),
            })
        }
    };

    if !output.status.success() {
        return Err(ConverterError::Failed {
            tool,
            status: output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string()),
            diagnostic: diagnostic(&output),
        });
    }

    Ok(output)
}

/// Best diagnostic text from a finished process: stderr, else stdout
fn diagnostic(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout)
    } else {
        stderr
    };
    let text = text.trim();
    if text.is_empty() {
        "no diagnostic output".to_string()
    } else {
        text.to_string()
    }
}

/// Check that a binary starts and answers `--version`
pub async fn probe(program: &str, timeout: Duration) -> bool {
    let mut command = Command::new(program);
    command
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(timeout, command.status()).await {
        Ok(Ok(status)) => status.success(),
        _ => false,
    }
}

/// Fail unless the converter left a non-empty file at `path`
pub async fn ensure_output(tool: ConverterKind, path: &std::path::Path) -> Result<(), ConverterError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(ConverterError::EmptyOutput { tool }),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_tool_success() {
        let output = run_tool(ConverterKind::Pandoc, "sh", ["-c", "echo ok"], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ok");
    }

    #[tokio::test]
    async fn test_run_tool_failure_carries_stderr() {
        let result = run_tool(
            ConverterKind::Pandoc,
            "sh",
            ["-c", "echo 'Unknown input format' >&2; exit 21"],
            Duration::from_secs(5),
        )
        .await;

        match result {
            Err(ConverterError::Failed { status, diagnostic, .. }) => {
                assert_eq!(status, "21");
                assert_eq!(diagnostic, "Unknown input format");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_tool_timeout() {
        let result = run_tool(
            ConverterKind::LibreOffice,
            "sh",
            ["-c", "sleep 5"],
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(result, Err(ConverterError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let result = run_tool(
            ConverterKind::Pandoc,
            "docconv-definitely-missing-binary",
            ["--version"],
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(ConverterError::Spawn { .. })));
        assert!(!probe("docconv-definitely-missing-binary", Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_ensure_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.html");

        assert!(ensure_output(ConverterKind::Pandoc, &path).await.is_err());
        std::fs::write(&path, b"").unwrap();
        assert!(ensure_output(ConverterKind::Pandoc, &path).await.is_err());
        std::fs::write(&path, b"<p>hi</p>").unwrap();
        assert!(ensure_output(ConverterKind::Pandoc, &path).await.is_ok());
    }
}
