//! Docvault Storage Library
//!
//! This crate owns everything that touches the filesystem on behalf of the
//! upload pipeline:
//!
//! - [`DocumentStore`]: the flat, authoritative directory of documents. It
//!   supports in-place purge/put as well as whole-set replacement through a
//!   [`ShadowStore`] that is swapped into place atomically.
//! - [`ArchiveStager`]: persists an inbound archive stream to the uploads
//!   directory as a [`StagedArchive`] that removes itself when dropped.
//!
//! # Document names
//!
//! Documents are addressed by a flat file name. Names must not be empty, `.`
//! or `..`, and must not contain path separators or NUL bytes; see
//! [`validate_document_name`].

pub(crate) mod names;
pub mod shadow;
pub mod staging;
pub mod store;
pub mod traits;

// Re-export commonly used types
pub use names::validate_document_name;
pub use shadow::ShadowStore;
pub use staging::{ArchiveStager, StagedArchive};
pub use store::{ByteStream, DocumentBody, DocumentStore, LiveSink};
pub use traits::{DocumentSink, StorageError, StorageResult};
