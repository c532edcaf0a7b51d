//! Staging of inbound archives in the uploads directory.

use crate::names::validate_document_name;
use crate::traits::{StorageError, StorageResult};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Longest client name suffix kept in a staged file name. Together with the
/// 33-byte unique prefix this stays under the common 255-byte name limit.
const MAX_STAGED_SUFFIX_BYTES: usize = 200;

/// Trailing part of `name` of at most `MAX_STAGED_SUFFIX_BYTES`, cut on a char
/// boundary so the extension survives.
fn staged_suffix(name: &str) -> &str {
    if name.len() <= MAX_STAGED_SUFFIX_BYTES {
        return name;
    }
    let mut start = name.len() - MAX_STAGED_SUFFIX_BYTES;
    while !name.is_char_boundary(start) {
        start += 1;
    }
    &name[start..]
}

/// Writes uploaded archives into a staging directory
#[derive(Debug, Clone)]
pub struct ArchiveStager {
    dir: PathBuf,
}

impl ArchiveStager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist `stream` as a staged archive.
    ///
    /// `origin_name` is the client-supplied file name; it is validated but the
    /// staged file itself gets a unique name so concurrent stagings never collide.
    pub async fn stage<S, E>(&self, origin_name: &str, mut stream: S) -> StorageResult<StagedArchive>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin + Send,
        E: Display,
    {
        validate_document_name(origin_name)?;
        let start = Instant::now();

        fs::create_dir_all(&self.dir).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to create uploads directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let path = self
            .dir
            .join(format!("{}-{}", Uuid::new_v4().simple(), staged_suffix(origin_name)));
        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        // From here on the guard owns the file and removes it on any early return.
        let mut staged = StagedArchive {
            origin_name: origin_name.to_string(),
            path,
            len: 0,
            removed: false,
        };

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| StorageError::StreamFailed(e.to_string()))?;
            file.write_all(&chunk).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to write file {}: {}",
                    staged.path.display(),
                    e
                ))
            })?;
            staged.len += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to sync file {}: {}",
                staged.path.display(),
                e
            ))
        })?;

        tracing::info!(
            path = %staged.path.display(),
            origin_name = %staged.origin_name,
            size_bytes = staged.len,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Archive staged"
        );

        Ok(staged)
    }

    #[cfg(test)]
    pub(crate) async fn stage_bytes(&self, origin_name: &str, data: Bytes) -> StorageResult<StagedArchive> {
        let stream = futures::stream::iter([Ok::<_, std::io::Error>(data)]);
        self.stage(origin_name, stream).await
    }
}

/// Archive persisted in the uploads directory.
///
/// The file is removed by [`StagedArchive::discard`], or on drop if discard
/// was never reached.
#[derive(Debug)]
pub struct StagedArchive {
    origin_name: String,
    path: PathBuf,
    len: u64,
    removed: bool,
}

impl StagedArchive {
    pub fn origin_name(&self) -> &str {
        &self.origin_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub async fn discard(mut self) {
        self.removed = true;
        if let Err(e) = fs::remove_file(&self.path).await {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove staged archive"
            );
        }
    }
}

impl Drop for StagedArchive {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove staged archive"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_stage_writes_all_chunks() {
        let dir = tempdir().unwrap();
        let stager = ArchiveStager::new(dir.path().join("uploads"));
        let chunks = vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"PK\x03\x04")),
            Ok(Bytes::from_static(b"rest")),
        ];

        let staged = stager
            .stage("docs.zip", futures::stream::iter(chunks))
            .await
            .unwrap();

        assert_eq!(staged.origin_name(), "docs.zip");
        assert_eq!(staged.len(), 8);
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"PK\x03\x04rest");
        assert!(staged.path().starts_with(dir.path().join("uploads")));

        let path = staged.path().to_path_buf();
        staged.discard().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_stage_stream_error_removes_partial_file() {
        let dir = tempdir().unwrap();
        let stager = ArchiveStager::new(dir.path());
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err("connection reset"),
        ];

        let result = stager.stage("docs.zip", futures::stream::iter(chunks)).await;

        match result {
            Err(StorageError::StreamFailed(msg)) => assert!(msg.contains("connection reset")),
            other => panic!("expected StreamFailed, got {:?}", other),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_staged_archive_is_removed() {
        let dir = tempdir().unwrap();
        let stager = ArchiveStager::new(dir.path());

        let staged = stager
            .stage_bytes("docs.zip", Bytes::from_static(b"data"))
            .await
            .unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_stage_long_client_name() {
        let dir = tempdir().unwrap();
        let stager = ArchiveStager::new(dir.path());
        let long_name = format!("{}.tar.gz", "é".repeat(120));

        let staged = stager
            .stage_bytes(&long_name, Bytes::from_static(b"data"))
            .await
            .unwrap();

        assert_eq!(staged.origin_name(), long_name);
        let file_name = staged.path().file_name().unwrap().to_str().unwrap();
        assert!(file_name.len() <= 33 + MAX_STAGED_SUFFIX_BYTES);
        assert!(file_name.ends_with(".tar.gz"));
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"data");
    }

    #[test]
    fn test_staged_suffix_keeps_short_names() {
        assert_eq!(staged_suffix("docs.zip"), "docs.zip");
        let long = "a".repeat(300);
        assert_eq!(staged_suffix(&long).len(), MAX_STAGED_SUFFIX_BYTES);
    }

    #[tokio::test]
    async fn test_stage_rejects_traversal_name() {
        let dir = tempdir().unwrap();
        let stager = ArchiveStager::new(dir.path());

        let result = stager
            .stage_bytes("../escape.zip", Bytes::from_static(b"x"))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidName(_))));
    }
}
