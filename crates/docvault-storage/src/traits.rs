//! Storage error type and the document sink abstraction

use std::io::Read;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid document name: {0}")]
    InvalidName(String),

    #[error("Swap failed: {0}")]
    SwapFailed(String),

    #[error("Upload stream failed: {0}")]
    StreamFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Synchronous destination for extracted documents.
///
/// Archive decoders are blocking, so extraction runs on the blocking pool and
/// writes through this trait. Writing a name that already exists replaces it.
pub trait DocumentSink: Send {
    /// Write the full contents of `reader` as document `name`, returning the byte count.
    fn put_reader(&mut self, name: &str, reader: &mut dyn Read) -> StorageResult<u64>;
}
