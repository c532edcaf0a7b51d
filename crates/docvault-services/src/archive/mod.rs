//! Archive decoding for the upload pipeline

mod extractor;
mod format;

pub use extractor::{
    flatten_name, ArchiveEntry, ArchiveError, ArchiveExtractor, DEFAULT_MAX_UNPACKED_BYTES,
};
pub use format::ArchiveFormat;
