//! Docvault Services Layer
//!
//! Business logic of the upload-and-replace pipeline. The archive module
//! decodes staged archives into flattened entries; the upload module
//! serializes pipeline runs and drives staging, extraction and the document
//! store replacement. HTTP handling stays in docvault-api.

pub mod archive;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use archive::{flatten_name, ArchiveEntry, ArchiveError, ArchiveExtractor, ArchiveFormat};
pub use upload::{PipelineError, UploadCoordinator, UploadLock};
