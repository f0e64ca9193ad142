//! Compiled PDFs on disk, deleted when their guard goes out of scope.

use std::io;
use std::path::{Path, PathBuf};

use axum::body::Body;
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

const CHUNK_SIZE: usize = 64 * 1024;

/// Owns a generated artifact file. Dropping the guard removes the file; a file
/// that is already gone counts as removed.
#[derive(Debug)]
pub struct ArtifactGuard {
    path: PathBuf,
}

impl ArtifactGuard {
    /// Takes ownership of an existing file.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Copies `source` into a fresh temp file that outlives the source's directory.
    pub async fn persist_copy(source: &Path) -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("vitae-")
            .suffix(".pdf")
            .tempfile()?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        // From here on the guard cleans up if the copy fails.
        let guard = Self::new(path);
        tokio::fs::copy(source, &guard.path).await?;
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Streams the file as a response body. The guard travels with the stream, so
    /// the file is deleted once the body is fully sent or dropped early.
    pub async fn into_body(self) -> io::Result<Body> {
        let file = tokio::fs::File::open(&self.path).await?;
        let stream = futures::stream::try_unfold((file, self), |(mut file, guard)| async move {
            let mut buf = vec![0u8; CHUNK_SIZE];
            let read = file.read(&mut buf).await?;
            if read == 0 {
                return Ok::<_, io::Error>(None);
            }
            buf.truncate(read);
            Ok(Some((Bytes::from(buf), (file, guard))))
        });
        Ok(Body::from_stream(stream))
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed artifact {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove artifact {}: {e}", self.path.display()),
        }
    }
}
