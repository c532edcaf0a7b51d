//! Test fixtures: in-memory archives and multipart forms.

use axum_test::multipart::{MultipartForm, Part};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

/// Minimal PDF-looking payload; the service never inspects document contents.
pub fn pdf_bytes(label: &str) -> Vec<u8> {
    format!("%PDF-1.4\n% {}\n%%EOF\n", label).into_bytes()
}

/// Build a ZIP archive. `None` content marks a directory entry.
pub fn zip_archive(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();

    for (name, content) in entries {
        match content {
            Some(content) => {
                writer.start_file(*name, options).expect("start zip entry");
                writer.write_all(content).expect("write zip entry");
            }
            None => {
                writer.add_directory(*name, options).expect("add zip directory");
            }
        }
    }

    writer.finish().expect("finish zip").into_inner()
}

/// Multipart form carrying `data` in the `file` field.
pub fn archive_form(file_name: &str, data: Vec<u8>) -> MultipartForm {
    let part = Part::bytes(bytes::Bytes::from(data))
        .file_name(file_name)
        .mime_type("application/zip");
    MultipartForm::new().add_part("file", part)
}
