use std::fmt::{Display, Formatter, Result as FmtResult};

/// Bytes needed to recognise every supported format.
pub(crate) const SNIFF_LEN: usize = 262;

const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_ARCHIVE: &[u8] = b"PK\x05\x06";
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const USTAR_MAGIC: &[u8] = b"ustar";
const USTAR_OFFSET: usize = 257;

/// Archive container format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveFormat {
    /// Detect the format from the leading bytes of the archive, falling back
    /// to the file extension and finally to ZIP.
    pub fn detect(header: &[u8], file_name: &str) -> Self {
        if header.starts_with(ZIP_LOCAL_HEADER) || header.starts_with(ZIP_EMPTY_ARCHIVE) {
            return ArchiveFormat::Zip;
        }
        if header.starts_with(GZIP_MAGIC) {
            return ArchiveFormat::TarGz;
        }
        if header.get(USTAR_OFFSET..USTAR_OFFSET + USTAR_MAGIC.len()) == Some(USTAR_MAGIC) {
            return ArchiveFormat::Tar;
        }
        Self::from_file_name(file_name).unwrap_or(ArchiveFormat::Zip)
    }

    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if lower.ends_with(".tar") {
            Some(ArchiveFormat::Tar)
        } else if lower.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else {
            None
        }
    }
}

impl Display for ArchiveFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ArchiveFormat::Zip => write!(f, "zip"),
            ArchiveFormat::Tar => write!(f, "tar"),
            ArchiveFormat::TarGz => write!(f, "tar.gz"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_magic_bytes() {
        assert_eq!(ArchiveFormat::detect(b"PK\x03\x04rest", "x.bin"), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::detect(b"PK\x05\x06", "x.tar"), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::detect(&[0x1f, 0x8b, 8], "x.zip"), ArchiveFormat::TarGz);

        let mut tar_header = vec![0u8; SNIFF_LEN];
        tar_header[257..262].copy_from_slice(b"ustar");
        assert_eq!(ArchiveFormat::detect(&tar_header, "upload"), ArchiveFormat::Tar);
    }

    #[test]
    fn test_detect_falls_back_to_extension_then_zip() {
        let zeros = vec![0u8; 1024];
        assert_eq!(ArchiveFormat::detect(&zeros, "empty.TAR"), ArchiveFormat::Tar);
        assert_eq!(ArchiveFormat::detect(b"junk", "docs.tgz"), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::detect(b"junk", "docs.pdf"), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::detect(b"", "docs"), ArchiveFormat::Zip);
    }
}
