use std::io;
#[cfg(any(feature = "zip", feature = "tar"))]
use std::io::Read;

#[cfg(feature = "tar")]
use crate::error::SecurityError;

/// Size and name of an archive entry as the archive claims them.
///
/// Nothing here is trusted: sizes only feed the early-reject fast path,
/// the streamed byte count is what bounds resources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntryMetadata {
    pub name: String,
    /// Negative when the archive does not record it.
    pub declared_uncompressed_size: i64,
    /// Negative when the archive does not record it.
    pub declared_compressed_size: i64,
}

impl ArchiveEntryMetadata {
    pub const UNKNOWN_SIZE: i64 = -1;

    pub fn new(
        name: impl Into<String>,
        declared_uncompressed_size: i64,
        declared_compressed_size: i64,
    ) -> Self {
        Self {
            name: name.into(),
            declared_uncompressed_size,
            declared_compressed_size,
        }
    }

    /// Build from unsigned sizes as archive libraries report them.
    ///
    /// `None` maps to [`Self::UNKNOWN_SIZE`]; values past `i64::MAX` clamp
    /// to `i64::MAX`, which every size cap rejects.
    pub fn from_sizes(
        name: impl Into<String>,
        uncompressed: Option<u64>,
        compressed: Option<u64>,
    ) -> Self {
        Self::new(name, to_declared(uncompressed), to_declared(compressed))
    }
}

fn to_declared(size: Option<u64>) -> i64 {
    size.map_or(ArchiveEntryMetadata::UNKNOWN_SIZE, |s| {
        i64::try_from(s).unwrap_or(i64::MAX)
    })
}

/// Uniform access to entry metadata across archive libraries.
///
/// The validator only ever sees [`ArchiveEntryMetadata`], never a
/// library-specific entry type.
pub trait EntryMetadataSource {
    fn entry_metadata(&self) -> io::Result<ArchiveEntryMetadata>;
}

impl EntryMetadataSource for ArchiveEntryMetadata {
    fn entry_metadata(&self) -> io::Result<ArchiveEntryMetadata> {
        Ok(self.clone())
    }
}

/// Uses the raw stored name, not `enclosed_name()`, so hostile names
/// reach the validator unmodified.
#[cfg(feature = "zip")]
impl<R: Read> EntryMetadataSource for zip::read::ZipFile<'_, R> {
    fn entry_metadata(&self) -> io::Result<ArchiveEntryMetadata> {
        Ok(ArchiveEntryMetadata::from_sizes(
            self.name(),
            Some(self.size()),
            Some(self.compressed_size()),
        ))
    }
}

/// Tar does not compress per entry, so the compressed size is unknown and
/// the ratio check does not apply; the outer stream is bounded by the
/// streamed byte count instead.
///
/// Names must be UTF-8. Anything else fails with
/// [`SecurityError::InvalidEncoding`] wrapped in the `io::Error`, so two
/// distinct raw names never collapse into one validated name.
#[cfg(feature = "tar")]
impl<R: Read> EntryMetadataSource for tar::Entry<'_, R> {
    fn entry_metadata(&self) -> io::Result<ArchiveEntryMetadata> {
        let raw = self.path_bytes();
        let Ok(name) = std::str::from_utf8(&raw) else {
            let err = SecurityError::InvalidEncoding {
                name: String::from_utf8_lossy(&raw).into_owned(),
            };
            tracing::warn!(kind = err.kind(), "{err}");
            return Err(err.into());
        };
        Ok(ArchiveEntryMetadata::from_sizes(name, Some(self.size()), None))
    }
}
