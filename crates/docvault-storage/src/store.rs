use crate::names::{validate_document_name, write_document};
use crate::shadow::ShadowStore;
use crate::traits::{DocumentSink, StorageError, StorageResult};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use uuid::Uuid;

const SHADOW_MARKER: &str = "shadow";
const RETIRED_MARKER: &str = "retired";

/// Stream of document bytes
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// An opened document ready to be streamed to a client
pub struct DocumentBody {
    pub size: u64,
    pub stream: ByteStream,
}

/// Flat directory of documents.
///
/// The store root is replaced as a whole by [`DocumentStore::commit`]: a fully
/// populated [`ShadowStore`] (a sibling directory) is renamed into place while
/// the previous generation is renamed aside and then deleted. Reads and
/// in-place writes hold the generation lock shared and the swap holds it
/// exclusively, so readers never observe the moment between the two renames.
#[derive(Clone)]
pub struct DocumentStore {
    root: PathBuf,
    parent: PathBuf,
    root_name: String,
    generation: Arc<RwLock<()>>,
}

impl DocumentStore {
    /// Open (and create if needed) the store rooted at `root`.
    ///
    /// Leftovers of an interrupted swap are cleaned up: stale shadow
    /// directories are removed, and if the root itself is missing while a
    /// retired generation exists, that generation is restored.
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        let root_name = root
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                StorageError::ConfigError(format!(
                    "Document store root {} must end in a directory name",
                    root.display()
                ))
            })?
            .to_string();
        let parent = root
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let store = DocumentStore {
            root,
            parent,
            root_name,
            generation: Arc::new(RwLock::new(())),
        };

        store.recover().await?;

        fs::create_dir_all(&store.root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create document directory {}: {}",
                store.root.display(),
                e
            ))
        })?;

        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sibling_prefix(&self, marker: &str) -> String {
        format!(".{}.{}-", self.root_name, marker)
    }

    fn sibling_path(&self, marker: &str) -> PathBuf {
        self.parent.join(format!(
            "{}{}",
            self.sibling_prefix(marker),
            Uuid::new_v4().simple()
        ))
    }

    fn document_path(&self, name: &str) -> StorageResult<PathBuf> {
        validate_document_name(name)?;
        Ok(self.root.join(name))
    }

    async fn recover(&self) -> StorageResult<()> {
        if !fs::try_exists(&self.parent).await.unwrap_or(false) {
            return Ok(());
        }

        let shadow_prefix = self.sibling_prefix(SHADOW_MARKER);
        let retired_prefix = self.sibling_prefix(RETIRED_MARKER);
        let mut shadows = Vec::new();
        let mut retired = Vec::new();

        let mut entries = fs::read_dir(&self.parent).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with(&shadow_prefix) {
                shadows.push(entry.path());
            } else if name.starts_with(&retired_prefix) {
                retired.push(entry.path());
            }
        }

        if !fs::try_exists(&self.root).await.unwrap_or(false) {
            if let Some(previous) = retired.pop() {
                fs::rename(&previous, &self.root).await.map_err(|e| {
                    StorageError::SwapFailed(format!(
                        "Failed to restore {}: {}",
                        previous.display(),
                        e
                    ))
                })?;
                tracing::warn!(
                    restored_from = %previous.display(),
                    root = %self.root.display(),
                    "Restored document store from an interrupted swap"
                );
            }
        }

        for leftover in shadows.into_iter().chain(retired) {
            match fs::remove_dir_all(&leftover).await {
                Ok(()) => tracing::info!(
                    path = %leftover.display(),
                    "Removed leftover directory from an interrupted upload"
                ),
                Err(e) => tracing::warn!(
                    path = %leftover.display(),
                    error = %e,
                    "Failed to remove leftover directory"
                ),
            }
        }

        Ok(())
    }

    /// Remove every file directly inside the store. Subdirectories are skipped.
    pub async fn purge(&self) -> StorageResult<usize> {
        let _generation = self.generation.read().await;
        let start = Instant::now();

        let mut entries = fs::read_dir(&self.root).await.map_err(|e| {
            StorageError::ReadFailed(format!(
                "Failed to list {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                tracing::debug!(path = %path.display(), "Skipping subdirectory during purge");
                continue;
            }
            fs::remove_file(&path).await.map_err(|e| {
                StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            removed += 1;
        }

        tracing::info!(
            root = %self.root.display(),
            removed,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Document store purged"
        );

        Ok(removed)
    }

    /// Write `data` as document `name`, replacing any existing document with that name.
    pub async fn put(&self, name: &str, data: Vec<u8>) -> StorageResult<()> {
        let path = self.document_path(name)?;
        let _generation = self.generation.read().await;
        let start = Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Document written"
        );

        Ok(())
    }

    pub async fn exists(&self, name: &str) -> StorageResult<bool> {
        let path = self.document_path(name)?;
        let _generation = self.generation.read().await;
        Ok(fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false))
    }

    pub async fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.document_path(name)?;
        let _generation = self.generation.read().await;

        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(StorageError::ReadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Open a document for streaming.
    ///
    /// The file handle is taken under the generation lock; the stream stays
    /// valid even if a swap retires this generation while it is being sent.
    pub async fn read_stream(&self, name: &str) -> StorageResult<DocumentBody> {
        let path = self.document_path(name)?;
        let _generation = self.generation.read().await;

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to open file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(StorageError::NotFound(name.to_string()));
        }

        let stream = tokio_util::io::ReaderStream::new(file).map(|chunk| {
            chunk.map_err(|e| StorageError::ReadFailed(format!("Failed to read chunk: {}", e)))
        });

        Ok(DocumentBody {
            size: meta.len(),
            stream: Box::pin(stream),
        })
    }

    /// Names of all documents, sorted.
    pub async fn list(&self) -> StorageResult<Vec<String>> {
        let _generation = self.generation.read().await;

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();

        Ok(names)
    }

    /// Sink writing straight into the live directory.
    ///
    /// Bypasses the generation lock; callers serialize access themselves.
    pub fn live_sink(&self) -> LiveSink {
        LiveSink {
            root: self.root.clone(),
        }
    }

    /// Create an empty shadow directory next to the root.
    pub async fn begin_replacement(&self) -> StorageResult<ShadowStore> {
        let path = self.sibling_path(SHADOW_MARKER);
        fs::create_dir(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to create shadow directory {}: {}",
                path.display(),
                e
            ))
        })?;
        tracing::debug!(path = %path.display(), "Shadow directory created");
        Ok(ShadowStore::new(path))
    }

    /// Swap `shadow` into place as the new document set.
    ///
    /// Returns the number of documents in the retired generation. Once started
    /// the swap runs to completion on the blocking pool even if the caller
    /// stops waiting for it.
    pub async fn commit(&self, shadow: ShadowStore) -> StorageResult<usize> {
        let generation = self.generation.clone().write_owned().await;
        let root = self.root.clone();
        let retired = self.sibling_path(RETIRED_MARKER);

        tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let swapped = swap_into_place(&root, &retired, shadow);
            drop(generation);
            let retired_present = swapped?;

            tracing::info!(
                root = %root.display(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Document set swapped into place"
            );

            if !retired_present {
                return Ok(0);
            }
            let retired_count = count_files(&retired);
            if let Err(e) = std::fs::remove_dir_all(&retired) {
                tracing::warn!(
                    path = %retired.display(),
                    error = %e,
                    "Failed to delete retired document set"
                );
            }
            Ok(retired_count)
        })
        .await
        .map_err(|e| StorageError::SwapFailed(format!("Swap task failed: {}", e)))?
    }
}

/// Rename `root` aside and `shadow` into its place. Returns whether a previous
/// generation was retired.
fn swap_into_place(root: &Path, retired: &Path, mut shadow: ShadowStore) -> StorageResult<bool> {
    let retired_present = match std::fs::rename(root, retired) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            return Err(StorageError::SwapFailed(format!(
                "Failed to retire {}: {}",
                root.display(),
                e
            )))
        }
    };

    if let Err(e) = std::fs::rename(shadow.path(), root) {
        if retired_present {
            if let Err(restore) = std::fs::rename(retired, root) {
                tracing::error!(
                    root = %root.display(),
                    retired = %retired.display(),
                    error = %restore,
                    "Failed to restore previous documents after a failed swap"
                );
            }
        }
        return Err(StorageError::SwapFailed(format!(
            "Failed to move {} into place: {}",
            shadow.path().display(),
            e
        )));
    }

    shadow.mark_committed();
    Ok(retired_present)
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().map(|t| !t.is_dir()).unwrap_or(false))
                .count()
        })
        .unwrap_or(0)
}

/// Sink that writes directly into the live store directory
pub struct LiveSink {
    root: PathBuf,
}

impl DocumentSink for LiveSink {
    fn put_reader(&mut self, name: &str, reader: &mut dyn Read) -> StorageResult<u64> {
        write_document(&self.root, name, reader)
    }
}
