//! Document name validation and shared write helper.

use crate::traits::{StorageError, StorageResult};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Check that `name` is a plain file name that stays inside the store directory.
pub fn validate_document_name(name: &str) -> StorageResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Write `reader` to `dir/name`, truncating any existing file. A failed copy
/// leaves no file behind.
pub(crate) fn write_document(dir: &Path, name: &str, reader: &mut dyn Read) -> StorageResult<u64> {
    validate_document_name(name)?;
    let path = dir.join(name);

    let mut file = fs::File::create(&path).map_err(|e| {
        StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
    })?;
    let written = match io::copy(reader, &mut file) {
        Ok(written) => written,
        Err(e) => {
            drop(file);
            if let Err(remove) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %remove, "Failed to remove partial document");
            }
            return Err(StorageError::WriteFailed(format!(
                "Failed to write file {}: {}",
                path.display(),
                e
            )));
        }
    };
    file.sync_all().map_err(|e| {
        StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
    })?;

    Ok(written)
}
