use std::io::{self, Read, Seek};

/// Tar headers are one 512-byte block; the `ustar` magic sits at offset 257.
const TAR_BLOCK: usize = 512;
const USTAR_MAGIC: std::ops::Range<usize> = 257..262;

/// Container formats an uploaded archive can be walked as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
        }
    }
}

/// Identify a format from the leading bytes of an upload.
///
/// Only magic bytes are consulted, never the uploaded file name.
pub fn detect_format(data: &[u8]) -> Option<ArchiveFormat> {
    match data {
        [0x50, 0x4B, 0x03, 0x04, ..] | [0x50, 0x4B, 0x05, 0x06, ..] => Some(ArchiveFormat::Zip),
        [0x1F, 0x8B, ..] => Some(ArchiveFormat::TarGz),
        _ if is_tar_header(data) => Some(ArchiveFormat::Tar),
        _ => None,
    }
}

fn is_tar_header(data: &[u8]) -> bool {
    // Matches both "ustar\0" (POSIX) and "ustar " (GNU).
    data.len() >= TAR_BLOCK && data[USTAR_MAGIC] == *b"ustar"
}

/// Sniff the format and rewind, leaving `reader` ready for the archive library.
///
/// Short inputs are fine; they simply match nothing that needs more bytes.
pub fn detect_from_reader<R: Read + Seek>(reader: &mut R) -> io::Result<Option<ArchiveFormat>> {
    let mut header = Vec::with_capacity(TAR_BLOCK);
    reader.by_ref().take(TAR_BLOCK as u64).read_to_end(&mut header)?;
    reader.rewind()?;
    Ok(detect_format(&header))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_zip_format() {
        let zip_header = [0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x00, 0x00];
        assert_eq!(detect_format(&zip_header), Some(ArchiveFormat::Zip));
    }

    #[test]
    fn detect_empty_zip() {
        let end_of_central_directory = [0x50, 0x4B, 0x05, 0x06, 0x00, 0x00];
        assert_eq!(detect_format(&end_of_central_directory), Some(ArchiveFormat::Zip));
    }

    #[test]
    fn detect_gzip_as_tar_gz() {
        assert_eq!(detect_format(&[0x1F, 0x8B, 0x08, 0x00]), Some(ArchiveFormat::TarGz));
    }

    #[test]
    fn detect_posix_and_gnu_tar() {
        let mut header = [0u8; TAR_BLOCK];
        header[257..263].copy_from_slice(b"ustar\0");
        assert_eq!(detect_format(&header), Some(ArchiveFormat::Tar));

        header[257..263].copy_from_slice(b"ustar ");
        assert_eq!(detect_format(&header), Some(ArchiveFormat::Tar));
    }

    #[test]
    fn detect_unknown_or_truncated() {
        assert_eq!(detect_format(&[0xDE, 0xAD, 0xBE, 0xEF]), None);
        assert_eq!(detect_format(&[0u8; 256]), None);
        assert_eq!(detect_format(&[]), None);
    }

    #[test]
    fn reader_is_rewound() {
        let mut data = vec![0x50, 0x4B, 0x03, 0x04];
        data.extend_from_slice(&[0u8; 1000]);
        let mut cursor = io::Cursor::new(data);

        assert_eq!(detect_from_reader(&mut cursor).unwrap(), Some(ArchiveFormat::Zip));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn short_reader_is_not_an_error() {
        let mut cursor = io::Cursor::new(vec![0x1F, 0x8B]);
        assert_eq!(detect_from_reader(&mut cursor).unwrap(), Some(ArchiveFormat::TarGz));
    }

    #[test]
    fn format_names() {
        assert_eq!(ArchiveFormat::TarGz.as_str(), "tar.gz");
        assert_eq!(ArchiveFormat::Zip.as_str(), "zip");
    }
}
