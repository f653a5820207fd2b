//! Best-effort UTF-8 normalization of text inputs

use std::borrow::Cow;
use std::io::{self, Write};
use std::path::Path;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Leading bytes searched for NUL before treating a file as text
const SNIFF_LEN: usize = 8192;

/// Rewrite `path` as clean UTF-8
///
/// Invalid sequences become U+FFFD and a leading BOM is dropped. Files with a
/// NUL byte near the start are binary and left alone. Returns whether the
/// file was rewritten. Never fails: on any error the original bytes stay in
/// place and `false` is returned.
pub async fn normalize_text_encoding(path: &Path) -> bool {
    match try_normalize(path).await {
        Ok(changed) => {
            if changed {
                tracing::debug!(path = %path.display(), "Re-encoded input as UTF-8");
            }
            changed
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), "Skipping UTF-8 normalization: {}", e);
            false
        }
    }
}

async fn try_normalize(path: &Path) -> io::Result<bool> {
    let bytes = tokio::fs::read(path).await?;
    if looks_binary(&bytes) {
        tracing::debug!(path = %path.display(), "Input looks binary, not re-encoding");
        return Ok(false);
    }

    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
    let text = match String::from_utf8_lossy(body) {
        Cow::Borrowed(_) if body.len() == bytes.len() => return Ok(false),
        text => text.into_owned(),
    };

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || replace_contents(&target, text.as_bytes()))
        .await
        .map_err(io::Error::other)??;
    Ok(true)
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(SNIFF_LEN)].contains(&0)
}

/// Write into a sibling temp file and swap it over `path`
fn replace_contents(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut staging = tempfile::NamedTempFile::new_in(dir)?;
    staging.write_all(contents)?;
    staging.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_valid_utf8_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# Título\n\nCafé".as_bytes()).unwrap();

        assert!(!normalize_text_encoding(&path).await);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Título\n\nCafé");
    }

    #[tokio::test]
    async fn test_invalid_bytes_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.txt");
        // Latin-1 "café"
        std::fs::write(&path, b"caf\xe9 au lait").unwrap();

        assert!(normalize_text_encoding(&path).await);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "caf\u{FFFD} au lait");
        // no staging file left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_bom_stripped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.html");
        std::fs::write(&path, b"\xEF\xBB\xBF<p>hi</p>").unwrap();

        assert!(normalize_text_encoding(&path).await);
        assert_eq!(std::fs::read(&path).unwrap(), b"<p>hi</p>");
    }

    #[tokio::test]
    async fn test_binary_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sheet.xls");
        let ole: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00, 0x00, 0xFE, 0xFF];
        std::fs::write(&path, ole).unwrap();

        assert!(!normalize_text_encoding(&path).await);
        assert_eq!(std::fs::read(&path).unwrap(), ole);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(!normalize_text_encoding(&dir.path().join("missing.md")).await);
    }
}
