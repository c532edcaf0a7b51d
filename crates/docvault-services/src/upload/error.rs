use crate::archive::ArchiveError;
use docvault_core::AppError;
use docvault_storage::StorageError;
use std::time::Duration;
use thiserror::Error;

/// Failure of one pipeline run. Nothing is reported as success once one of
/// these is returned.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O failure: {0}")]
    Io(String),

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Invalid upload: {0}")]
    InvalidInput(String),

    #[error("Another upload is in progress")]
    Busy,

    #[error("{stage} timed out after {limit:?}")]
    Timeout {
        stage: &'static str,
        limit: Duration,
    },

    #[error("Upload was cancelled")]
    Cancelled,
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName(name) => {
                PipelineError::InvalidInput(format!("Invalid file name: {}", name))
            }
            StorageError::StreamFailed(msg) => PipelineError::InvalidInput(msg),
            other => PipelineError::Io(other.to_string()),
        }
    }
}

impl From<ArchiveError> for PipelineError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Io(e) => PipelineError::Io(format!("Failed to read staged archive: {}", e)),
            ArchiveError::Corrupt(msg) => PipelineError::CorruptArchive(msg),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Io(msg) => AppError::Storage(msg),
            PipelineError::CorruptArchive(msg) => AppError::CorruptArchive(msg),
            PipelineError::InvalidInput(msg) => AppError::InvalidInput(msg),
            busy @ PipelineError::Busy => AppError::Busy(busy.to_string()),
            timeout @ PipelineError::Timeout { .. } => AppError::Timeout(timeout.to_string()),
            PipelineError::Cancelled => AppError::Internal("Upload was cancelled".to_string()),
        }
    }
}
