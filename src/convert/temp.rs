//! Request-scoped temporary files
//!
//! Every artifact gets a unique `docconv-` name under the temp root and is
//! removed when its handle is dropped, so early returns and errors clean up
//! the same way success does. Explicit releases run on the blocking pool.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir, TempPath};

/// Name prefix shared by all artifacts
pub const ARTIFACT_PREFIX: &str = "docconv-";

/// Longest extension kept on an artifact name
const MAX_SUFFIX_LEN: usize = 16;

/// Root directory that artifacts are allocated in
#[derive(Debug, Clone)]
pub struct TempSpace {
    root: PathBuf,
}

#[derive(Debug)]
enum Artifact {
    File(TempPath),
    Dir(TempDir),
}

/// A file or directory owned by one request
#[derive(Debug)]
pub struct TempArtifact {
    inner: Artifact,
}

impl TempSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Make sure the root exists
    pub async fn prepare(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Create an empty, uniquely named file ending in `extension`
    ///
    /// `extension` is sanitized; pass `""` for none.
    pub async fn create_file(&self, extension: &str) -> io::Result<TempArtifact> {
        let root = self.root.clone();
        let suffix = match sanitize_extension(extension) {
            ext if ext.is_empty() => ext,
            ext => format!(".{}", ext),
        };

        let path = blocking(move || {
            Builder::new()
                .prefix(ARTIFACT_PREFIX)
                .suffix(&suffix)
                .tempfile_in(&root)
                .map(|file| file.into_temp_path())
        })
        .await?;

        tracing::trace!(path = %path.display(), "Created temp file");
        Ok(TempArtifact {
            inner: Artifact::File(path),
        })
    }

    /// Create a uniquely named empty directory
    pub async fn create_dir(&self) -> io::Result<TempArtifact> {
        let root = self.root.clone();
        let dir = blocking(move || Builder::new().prefix(ARTIFACT_PREFIX).tempdir_in(&root)).await?;

        tracing::trace!(path = %dir.path().display(), "Created temp dir");
        Ok(TempArtifact {
            inner: Artifact::Dir(dir),
        })
    }
}

/// Keep ASCII alphanumerics only, lower-cased and bounded
fn sanitize_extension(extension: &str) -> String {
    extension
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_SUFFIX_LEN)
        .collect::<String>()
        .to_ascii_lowercase()
}

impl TempArtifact {
    pub fn path(&self) -> &Path {
        match &self.inner {
            Artifact::File(path) => path,
            Artifact::Dir(dir) => dir.path(),
        }
    }

    /// Remove the artifact now, reporting failures
    pub async fn release(self) -> io::Result<()> {
        let result = match self.inner {
            Artifact::File(path) => blocking(move || path.close()).await,
            Artifact::Dir(dir) => blocking(move || dir.close()).await,
        };
        match result {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

async fn blocking<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(io::Error::other)?
}
