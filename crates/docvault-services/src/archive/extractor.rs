use crate::archive::format::{ArchiveFormat, SNIFF_LEN};
use docvault_storage::validate_document_name;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;
use zip::ZipArchive;

/// Default cap on the bytes an archive may decompress to, across all entries.
pub const DEFAULT_MAX_UNPACKED_BYTES: u64 = 1024 * 1024 * 1024;

/// Archive decoding errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to read staged archive: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Corrupt(String),
}

/// One item enumerated from an archive.
///
/// The payload is decompressed as it is read from [`ArchiveEntry::reader`];
/// nothing is buffered ahead of the consumer.
pub struct ArchiveEntry<'a> {
    /// Path as recorded in the archive, directory components included
    pub path: String,
    pub is_dir: bool,
    reader: &'a mut (dyn Read + 'a),
}

impl<'a> ArchiveEntry<'a> {
    pub fn flattened_name(&self) -> Option<&str> {
        flatten_name(&self.path)
    }

    /// Decompressed contents; empty for directories.
    pub fn reader(&mut self) -> &mut (dyn Read + 'a) {
        &mut *self.reader
    }
}

/// Strip every directory component from an archive path.
///
/// Both `/` and `\` count as separators. Returns `None` when nothing usable
/// remains (directory markers, `.`, `..`).
pub fn flatten_name(path: &str) -> Option<&str> {
    path.rsplit(['/', '\\'])
        .next()
        .filter(|name| validate_document_name(name).is_ok())
}

enum Decoder {
    Zip(ZipArchive<File>),
    Tar(tar::Archive<Box<dyn Read + Send>>),
}

/// Decompressed-size accounting for one pass over an archive.
struct Budget {
    limit: u64,
    used: u64,
    exceeded: bool,
    decode_error: Option<String>,
}

impl Budget {
    /// Turn a failed visit into a corrupt-archive error when the failure came
    /// from the decoder or the size cap rather than from the consumer.
    fn settle<E: From<ArchiveError>>(&mut self, outcome: Result<(), E>, path: &str) -> Result<(), E> {
        let Err(err) = outcome else {
            return Ok(());
        };
        if self.exceeded {
            return Err(ArchiveError::Corrupt(format!(
                "Archive expands beyond the {} byte extraction limit at {}",
                self.limit, path
            ))
            .into());
        }
        match self.decode_error.take() {
            Some(msg) => {
                Err(ArchiveError::Corrupt(format!("Failed to decompress {}: {}", path, msg)).into())
            }
            None => Err(err),
        }
    }
}

/// Reader that charges every decompressed byte against a [`Budget`].
struct Metered<'b, R> {
    inner: R,
    budget: &'b mut Budget,
}

impl<R: Read> Read for Metered<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = match self.inner.read(buf) {
            Ok(n) => n,
            Err(e) => {
                if e.kind() != io::ErrorKind::Interrupted && self.budget.decode_error.is_none() {
                    self.budget.decode_error = Some(e.to_string());
                }
                return Err(e);
            }
        };

        self.budget.used += n as u64;
        if self.budget.used > self.budget.limit {
            self.budget.exceeded = true;
            return Err(io::Error::other("decompressed size limit exceeded"));
        }
        Ok(n)
    }
}

/// Reads entries out of a staged archive.
///
/// Decoding is blocking; run it on the blocking pool.
pub struct ArchiveExtractor {
    format: ArchiveFormat,
    decoder: Decoder,
    max_unpacked_bytes: u64,
}

impl ArchiveExtractor {
    /// Open the archive at `path`. `file_name` is only used as a format hint
    /// when the content is not recognised.
    pub fn open(path: &Path, file_name: &str) -> Result<Self, ArchiveError> {
        let mut file = File::open(path)?;

        let mut header = Vec::with_capacity(SNIFF_LEN);
        (&mut file).take(SNIFF_LEN as u64).read_to_end(&mut header)?;
        file.seek(SeekFrom::Start(0))?;

        let format = ArchiveFormat::detect(&header, file_name);
        let decoder = match format {
            ArchiveFormat::Zip => Decoder::Zip(ZipArchive::new(file).map_err(|e| {
                ArchiveError::Corrupt(format!("Failed to open ZIP archive: {}", e))
            })?),
            ArchiveFormat::Tar => Decoder::Tar(tar::Archive::new(Box::new(file))),
            ArchiveFormat::TarGz => {
                Decoder::Tar(tar::Archive::new(Box::new(GzDecoder::new(file))))
            }
        };

        tracing::debug!(path = %path.display(), format = %format, "Archive opened");

        Ok(Self {
            format,
            decoder,
            max_unpacked_bytes: DEFAULT_MAX_UNPACKED_BYTES,
        })
    }

    /// Cap the total number of bytes all entries may decompress to.
    pub fn with_limit(mut self, max_unpacked_bytes: u64) -> Self {
        self.max_unpacked_bytes = max_unpacked_bytes;
        self
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Hand every entry to `visit` in container order.
    ///
    /// TAR entries other than regular files and directories (links, devices)
    /// are not visited. Stops at the first error. Decoder failures and
    /// exceeding the size cap are reported as [`ArchiveError::Corrupt`] even
    /// when they surface through the visitor's own reads.
    pub fn for_each_entry<E, F>(&mut self, mut visit: F) -> Result<(), E>
    where
        E: From<ArchiveError>,
        F: FnMut(ArchiveEntry<'_>) -> Result<(), E>,
    {
        let mut budget = Budget {
            limit: self.max_unpacked_bytes,
            used: 0,
            exceeded: false,
            decode_error: None,
        };

        match &mut self.decoder {
            Decoder::Zip(zip) => {
                for index in 0..zip.len() {
                    let file = zip.by_index(index).map_err(|e| {
                        ArchiveError::Corrupt(format!("Failed to read ZIP entry {}: {}", index, e))
                    })?;
                    let path = file.name().to_string();
                    let is_dir = file.is_dir();

                    let mut reader = Metered {
                        inner: file,
                        budget: &mut budget,
                    };
                    let outcome = visit(ArchiveEntry {
                        path: path.clone(),
                        is_dir,
                        reader: &mut reader,
                    });
                    drop(reader);
                    budget.settle(outcome, &path)?;
                }
            }
            Decoder::Tar(archive) => {
                let entries = archive.entries().map_err(|e| {
                    ArchiveError::Corrupt(format!("Failed to read TAR archive: {}", e))
                })?;

                for entry in entries {
                    let entry = entry.map_err(|e| {
                        ArchiveError::Corrupt(format!("Failed to read TAR entry: {}", e))
                    })?;
                    let path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
                    let entry_type = entry.header().entry_type();
                    if !entry_type.is_dir() && !entry_type.is_file() {
                        tracing::debug!(path = %path, "Skipping non-regular TAR entry");
                        continue;
                    }

                    let mut reader = Metered {
                        inner: entry,
                        budget: &mut budget,
                    };
                    let outcome = visit(ArchiveEntry {
                        path: path.clone(),
                        is_dir: entry_type.is_dir(),
                        reader: &mut reader,
                    });
                    drop(reader);
                    budget.settle(outcome, &path)?;
                }
            }
        }

        tracing::debug!(
            format = %self.format,
            unpacked_bytes = budget.used,
            "Archive fully read"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tar_archive, tar_gz_archive, write_archive, zip_archive};
    use std::io::{Cursor, Write};
    use tempfile::tempdir;
    use zip::write::{FileOptions, ZipWriter};

    struct Collected {
        path: String,
        is_dir: bool,
        payload: Vec<u8>,
    }

    fn collect(extractor: &mut ArchiveExtractor) -> Result<Vec<Collected>, ArchiveError> {
        let mut seen = Vec::new();
        extractor.for_each_entry(|mut entry| {
            let mut payload = Vec::new();
            entry.reader().read_to_end(&mut payload)?;
            seen.push(Collected {
                path: entry.path.clone(),
                is_dir: entry.is_dir,
                payload,
            });
            Ok::<_, ArchiveError>(())
        })?;
        Ok(seen)
    }

    #[test]
    fn test_flatten_name() {
        assert_eq!(flatten_name("a/b/notes.pdf"), Some("notes.pdf"));
        assert_eq!(flatten_name("report.pdf"), Some("report.pdf"));
        assert_eq!(flatten_name("win\\dir\\scan.pdf"), Some("scan.pdf"));
        assert_eq!(flatten_name("../../etc/passwd"), Some("passwd"));
        assert_eq!(flatten_name("skip/"), None);
        assert_eq!(flatten_name("a/.."), None);
        assert_eq!(flatten_name(""), None);
    }

    #[test]
    fn test_zip_entries_in_archive_order() {
        let dir = tempdir().unwrap();
        let bytes = zip_archive(&[
            ("a/report.pdf", Some(b"report".as_slice())),
            ("skip/", None),
            ("a/b/notes.pdf", Some(b"notes".as_slice())),
        ]);
        let path = write_archive(dir.path(), "docs.zip", &bytes);

        let mut extractor = ArchiveExtractor::open(&path, "docs.zip").unwrap();
        assert_eq!(extractor.format(), ArchiveFormat::Zip);

        let entries = collect(&mut extractor).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a/report.pdf", "skip/", "a/b/notes.pdf"]);
        assert!(entries[1].is_dir);
        assert_eq!(entries[2].payload, b"notes");
        assert_eq!(flatten_name(&entries[2].path), Some("notes.pdf"));
    }

    #[test]
    fn test_tar_and_tar_gz_entries() {
        let dir = tempdir().unwrap();
        let files: &[(&str, Option<&[u8]>)] = &[
            ("nested/", None),
            ("nested/one.pdf", Some(b"one")),
            ("two.pdf", Some(b"two")),
        ];

        let tar_path = write_archive(dir.path(), "upload.bin", &tar_archive(files));
        let mut extractor = ArchiveExtractor::open(&tar_path, "upload.bin").unwrap();
        assert_eq!(extractor.format(), ArchiveFormat::Tar);
        let entries = collect(&mut extractor).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_dir);
        assert_eq!(entries[1].payload, b"one");

        let gz_path = write_archive(dir.path(), "upload.tgz", &tar_gz_archive(files));
        let mut extractor = ArchiveExtractor::open(&gz_path, "upload.tgz").unwrap();
        assert_eq!(extractor.format(), ArchiveFormat::TarGz);
        let names: Vec<_> = collect(&mut extractor)
            .unwrap()
            .iter()
            .filter_map(|e| flatten_name(&e.path).map(String::from))
            .collect();
        assert_eq!(names, vec!["one.pdf", "two.pdf"]);
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = write_archive(dir.path(), "docs.zip", b"this is not an archive");

        let result = ArchiveExtractor::open(&path, "docs.zip");
        assert!(matches!(result, Err(ArchiveError::Corrupt(_))));
    }

    #[test]
    fn test_truncated_zip_is_corrupt() {
        let dir = tempdir().unwrap();
        let bytes = zip_archive(&[("a.pdf", Some(vec![1u8; 4096].as_slice()))]);
        let path = write_archive(dir.path(), "docs.zip", &bytes[..bytes.len() / 2]);

        let outcome = ArchiveExtractor::open(&path, "docs.zip")
            .and_then(|mut extractor| collect(&mut extractor));
        assert!(matches!(outcome, Err(ArchiveError::Corrupt(_))));
    }

    #[test]
    fn test_damaged_entry_data_is_corrupt() {
        let dir = tempdir().unwrap();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        zip.start_file("a.pdf", stored).unwrap();
        zip.write_all(b"hello world").unwrap();
        let mut bytes = zip.finish().unwrap().into_inner();
        let data_at = bytes
            .windows(11)
            .position(|window| window == b"hello world")
            .unwrap();
        bytes[data_at] ^= 0xff;
        let path = write_archive(dir.path(), "docs.zip", &bytes);

        let mut extractor = ArchiveExtractor::open(&path, "docs.zip").unwrap();
        match collect(&mut extractor) {
            Err(ArchiveError::Corrupt(msg)) => assert!(msg.contains("a.pdf")),
            Err(other) => panic!("expected Corrupt, got {:?}", other),
            Ok(_) => panic!("expected Corrupt, got entries"),
        }
    }

    #[test]
    fn test_highly_compressed_entry_hits_size_cap() {
        let dir = tempdir().unwrap();
        let zeros = vec![0u8; 1024 * 1024];
        let bytes = zip_archive(&[("bomb.pdf", Some(zeros.as_slice()))]);
        assert!(bytes.len() < 64 * 1024);
        let path = write_archive(dir.path(), "docs.zip", &bytes);

        let mut extractor = ArchiveExtractor::open(&path, "docs.zip")
            .unwrap()
            .with_limit(64 * 1024);
        let mut copied = 0u64;
        let outcome = extractor.for_each_entry(|mut entry| {
            copied += io::copy(entry.reader(), &mut io::sink())?;
            Ok::<_, ArchiveError>(())
        });

        match outcome {
            Err(ArchiveError::Corrupt(msg)) => assert!(msg.contains("extraction limit")),
            other => panic!("expected Corrupt, got {:?}", other.err()),
        }
        assert_eq!(copied, 0);
    }

    #[test]
    fn test_size_cap_counts_all_entries() {
        let dir = tempdir().unwrap();
        let chunk = vec![7u8; 40 * 1024];
        let bytes = tar_archive(&[
            ("one.pdf", Some(chunk.as_slice())),
            ("two.pdf", Some(chunk.as_slice())),
        ]);
        let path = write_archive(dir.path(), "docs.tar", &bytes);

        let mut extractor = ArchiveExtractor::open(&path, "docs.tar")
            .unwrap()
            .with_limit(64 * 1024);
        let mut finished = Vec::new();
        let outcome = extractor.for_each_entry(|mut entry| {
            io::copy(entry.reader(), &mut io::sink())?;
            finished.push(entry.path.clone());
            Ok::<_, ArchiveError>(())
        });

        assert!(matches!(outcome, Err(ArchiveError::Corrupt(ref msg)) if msg.contains("two.pdf")));
        assert_eq!(finished, vec!["one.pdf"]);
    }

    #[test]
    fn test_visitor_error_is_passed_through() {
        let dir = tempdir().unwrap();
        let bytes = zip_archive(&[("a.pdf", Some(b"a".as_slice())), ("b.pdf", Some(b"b".as_slice()))]);
        let path = write_archive(dir.path(), "docs.zip", &bytes);

        let mut extractor = ArchiveExtractor::open(&path, "docs.zip").unwrap();
        let mut visited = 0;
        let outcome = extractor.for_each_entry(|_entry| {
            visited += 1;
            Err(ArchiveError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied")))
        });

        assert!(matches!(outcome, Err(ArchiveError::Io(_))));
        assert_eq!(visited, 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = ArchiveExtractor::open(&dir.path().join("gone.zip"), "gone.zip");
        assert!(matches!(result, Err(ArchiveError::Io(_))));
    }
}
