//! Archive builders shared by unit tests

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::{FileOptions, ZipWriter};

/// Entries as `(path, payload)`; `None` marks a directory.
pub(crate) type Entries<'a> = &'a [(&'a str, Option<&'a [u8]>)];

pub(crate) fn zip_archive(entries: Entries<'_>) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    for (path, payload) in entries {
        match payload {
            Some(data) => {
                zip.start_file(*path, options).unwrap();
                zip.write_all(data).unwrap();
            }
            None => zip.add_directory(*path, options).unwrap(),
        }
    }
    zip.finish().unwrap().into_inner()
}

pub(crate) fn tar_archive(entries: Entries<'_>) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, payload) in entries {
        let mut header = tar::Header::new_gnu();
        match payload {
            Some(data) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                builder.append_data(&mut header, path, *data).unwrap();
            }
            None => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                builder.append_data(&mut header, path, std::io::empty()).unwrap();
            }
        }
    }
    builder.into_inner().unwrap()
}

pub(crate) fn tar_gz_archive(entries: Entries<'_>) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_archive(entries)).unwrap();
    encoder.finish().unwrap()
}

pub(crate) fn write_archive(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
