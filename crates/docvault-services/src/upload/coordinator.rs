use super::{PipelineError, UploadLock};
use crate::archive::{flatten_name, ArchiveExtractor, DEFAULT_MAX_UNPACKED_BYTES};
use bytes::Bytes;
use docvault_core::{Config, ReplaceStrategy, UploadResult};
use docvault_storage::{ArchiveStager, DocumentSink, DocumentStore, StagedArchive};
use futures::Stream;
use std::fmt::Display;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_ARCHIVE_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_SWAP_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives one upload from the inbound byte stream to a replaced document set.
///
/// With [`ReplaceStrategy::Swap`] the archive is extracted into a shadow
/// directory that replaces the store only after every entry was written, so a
/// failed or cancelled upload leaves the previous documents in place. With
/// [`ReplaceStrategy::Purge`] the store is emptied first and the archive is
/// extracted straight into it.
#[derive(Clone)]
pub struct UploadCoordinator {
    store: DocumentStore,
    stager: ArchiveStager,
    lock: UploadLock,
    strategy: ReplaceStrategy,
    archive_timeout: Duration,
    swap_timeout: Duration,
    max_unpacked_bytes: u64,
}

impl UploadCoordinator {
    pub fn new(
        store: DocumentStore,
        stager: ArchiveStager,
        lock: UploadLock,
        strategy: ReplaceStrategy,
    ) -> Self {
        Self {
            store,
            stager,
            lock,
            strategy,
            archive_timeout: DEFAULT_ARCHIVE_TIMEOUT,
            swap_timeout: DEFAULT_SWAP_TIMEOUT,
            max_unpacked_bytes: DEFAULT_MAX_UNPACKED_BYTES,
        }
    }

    pub fn from_config(config: &Config, store: DocumentStore) -> Self {
        Self::new(
            store,
            ArchiveStager::new(config.uploads_dir()),
            UploadLock::new(config.upload_lock_timeout()),
            config.replace_strategy(),
        )
        .with_timeouts(config.archive_timeout(), config.swap_timeout())
        .with_extraction_limit(config.max_extracted_size_bytes())
    }

    pub fn with_timeouts(mut self, archive_timeout: Duration, swap_timeout: Duration) -> Self {
        self.archive_timeout = archive_timeout;
        self.swap_timeout = swap_timeout;
        self
    }

    /// Cap on the total decompressed size of one archive. Larger archives
    /// fail as corrupt.
    pub fn with_extraction_limit(mut self, max_unpacked_bytes: u64) -> Self {
        self.max_unpacked_bytes = max_unpacked_bytes;
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Replace the document set with the contents of the archive in `content`.
    ///
    /// `file_name` is the client-supplied archive name; only its final path
    /// component is used.
    pub async fn process<S, E>(
        &self,
        file_name: &str,
        content: S,
    ) -> Result<UploadResult, PipelineError>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin + Send,
        E: Display,
    {
        let origin_name = flatten_name(file_name)
            .ok_or_else(|| {
                PipelineError::InvalidInput(format!("Unusable archive file name: {:?}", file_name))
            })?
            .to_string();

        let _permit = self.lock.acquire().await?;
        let start = Instant::now();

        let written = match self.strategy {
            ReplaceStrategy::Swap => self.replace_with_swap(&origin_name, content).await?,
            ReplaceStrategy::Purge => self.replace_in_place(&origin_name, content).await?,
        };

        let result = UploadResult::from_written(&written);
        tracing::info!(
            archive = %origin_name,
            strategy = %self.strategy,
            files_written = result.count,
            last_written = ?result.last_written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload processed"
        );

        Ok(result)
    }

    /// [`UploadCoordinator::process`] for an archive already held in memory.
    #[cfg(test)]
    pub(crate) async fn process_bytes(
        &self,
        file_name: &str,
        data: Bytes,
    ) -> Result<UploadResult, PipelineError> {
        let stream = futures::stream::iter([Ok::<_, std::convert::Infallible>(data)]);
        self.process(file_name, stream).await
    }

    async fn replace_in_place<S, E>(
        &self,
        origin_name: &str,
        content: S,
    ) -> Result<Vec<String>, PipelineError>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin + Send,
        E: Display,
    {
        let purged = self.store.purge().await?;
        tracing::debug!(purged, "Live documents purged before extraction");

        let staged = self.stager.stage(origin_name, content).await?;
        let extracted = self.extract(&staged, self.store.live_sink()).await;
        staged.discard().await;

        let (written, _) = extracted?;
        Ok(written)
    }

    async fn replace_with_swap<S, E>(
        &self,
        origin_name: &str,
        content: S,
    ) -> Result<Vec<String>, PipelineError>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin + Send,
        E: Display,
    {
        let staged = self.stager.stage(origin_name, content).await?;
        let shadow = self.store.begin_replacement().await?;
        let extracted = self.extract(&staged, shadow).await;
        staged.discard().await;

        let (written, shadow) = extracted?;
        let retired = tokio::time::timeout(self.swap_timeout, self.store.commit(shadow))
            .await
            .map_err(|_| PipelineError::Timeout {
                stage: "Document swap",
                limit: self.swap_timeout,
            })??;
        tracing::debug!(retired, "Previous document set retired");

        Ok(written)
    }

    /// Run extraction on the blocking pool, bounded by the archive timeout.
    /// The sink is handed back on success.
    async fn extract<K>(
        &self,
        staged: &StagedArchive,
        sink: K,
    ) -> Result<(Vec<String>, K), PipelineError>
    where
        K: DocumentSink + 'static,
    {
        let path = staged.path().to_path_buf();
        let file_name = staged.origin_name().to_string();
        tracing::debug!(archive = %file_name, size_bytes = staged.len(), "Extracting staged archive");
        let max_unpacked_bytes = self.max_unpacked_bytes;
        let cancel = CancelOnDrop::new();
        let cancelled = cancel.flag();

        let task = tokio::task::spawn_blocking(move || {
            let mut sink = sink;
            let written =
                extract_into(&path, &file_name, max_unpacked_bytes, &mut sink, &cancelled)?;
            Ok::<_, PipelineError>((written, sink))
        });

        match tokio::time::timeout(self.archive_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PipelineError::Io(format!("Extraction task failed: {}", e))),
            Err(_) => Err(PipelineError::Timeout {
                stage: "Archive extraction",
                limit: self.archive_timeout,
            }),
        }
    }
}

/// Stream every file entry of the archive into `sink` under its flattened
/// name, in archive order. Returns the names written, duplicates included.
fn extract_into(
    path: &Path,
    file_name: &str,
    max_unpacked_bytes: u64,
    sink: &mut dyn DocumentSink,
    cancelled: &AtomicBool,
) -> Result<Vec<String>, PipelineError> {
    let mut extractor = ArchiveExtractor::open(path, file_name)?.with_limit(max_unpacked_bytes);
    let format = extractor.format();
    let mut written = Vec::new();

    extractor.for_each_entry(|mut entry| {
        if cancelled.load(Ordering::Relaxed) {
            return Err(PipelineError::Cancelled);
        }
        if entry.is_dir {
            return Ok(());
        }
        let Some(name) = entry.flattened_name().map(String::from) else {
            tracing::warn!(entry = %entry.path, "Skipping archive entry without a usable file name");
            return Ok(());
        };

        let mut content = Cancellable {
            inner: entry.reader(),
            cancelled,
        };
        let size_bytes = sink.put_reader(&name, &mut content).map_err(|e| {
            if cancelled.load(Ordering::Relaxed) {
                PipelineError::Cancelled
            } else {
                PipelineError::from(e)
            }
        })?;

        tracing::debug!(entry = %entry.path, name = %name, size_bytes, "Document extracted");
        written.push(name);
        Ok(())
    })?;

    tracing::debug!(format = %format, files_written = written.len(), "Archive extracted");
    Ok(written)
}

/// Entry reader that stops yielding data once the upload is cancelled.
struct Cancellable<'a, R: ?Sized> {
    inner: &'a mut R,
    cancelled: &'a AtomicBool,
}

impl<R: Read + ?Sized> Read for Cancellable<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(io::Error::other("upload cancelled"));
        }
        self.inner.read(buf)
    }
}

/// Raises the cancellation flag of a blocking extraction when the awaiting
/// side goes away (timeout or a dropped request).
struct CancelOnDrop(Arc<AtomicBool>);

impl CancelOnDrop {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    fn flag(&self) -> Arc<AtomicBool> {
        self.0.clone()
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}
