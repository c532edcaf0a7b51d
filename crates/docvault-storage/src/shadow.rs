//! Shadow directory that collects the next document set before it goes live.

use crate::names::write_document;
use crate::traits::{DocumentSink, StorageResult};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Directory being populated with a replacement document set.
///
/// Created by [`crate::DocumentStore::begin_replacement`] and handed back to
/// [`crate::DocumentStore::commit`]. Dropping a shadow that was never committed
/// deletes it, so an aborted or cancelled upload leaves nothing behind.
#[derive(Debug)]
pub struct ShadowStore {
    path: PathBuf,
    committed: bool,
}

impl ShadowStore {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn mark_committed(&mut self) {
        self.committed = true;
    }
}

impl DocumentSink for ShadowStore {
    fn put_reader(&mut self, name: &str, reader: &mut dyn Read) -> StorageResult<u64> {
        write_document(&self.path, name, reader)
    }
}

impl Drop for ShadowStore {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Discarded shadow directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove shadow directory"
            ),
        }
    }
}
