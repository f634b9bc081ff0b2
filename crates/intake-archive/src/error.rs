use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Longest attacker-controlled excerpt embedded in a message.
const MAX_EXCERPT_CHARS: usize = 128;

/// An archive failed a security check; extraction must be aborted.
///
/// Variants keep the raw offending values for programmatic use. The
/// `Display` output neutralizes them so it is safe to log or return.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SecurityError {
    #[error("archive has {count} entries, limit is {limit}")]
    TooManyEntries { count: usize, limit: usize },

    #[error("entry name is blank")]
    BlankEntryName,

    #[error("entry name '{}' is {length} characters long, limit is {limit}", neutralize(.name))]
    EntryNameTooLong {
        name: String,
        length: usize,
        limit: usize,
    },

    #[error("entry name '{}' is not valid UTF-8", neutralize(.name))]
    InvalidEncoding { name: String },

    #[error("entry name '{}' contains control characters", neutralize(.name))]
    ControlCharacter { name: String },

    #[error("path traversal in entry '{}'", neutralize(.name))]
    PathTraversal { name: String },

    #[error("absolute path in entry '{}'", neutralize(.name))]
    AbsolutePath { name: String },

    #[error("encoded path traversal in entry '{}'", neutralize(.name))]
    EncodedTraversal { name: String },

    #[error("entry '{}' looks like a symbolic link", neutralize(.name))]
    SymlinkEntry { name: String },

    #[error("entry '{}' does not declare its size", neutralize(.name))]
    UnknownEntrySize { name: String },

    #[error("entry '{}' declares {size} bytes, limit is {limit}", neutralize(.name))]
    EntryTooLarge { name: String, size: u64, limit: u64 },

    #[error("entry '{}' has compression ratio {ratio}:1, limit is {limit}:1", neutralize(.name))]
    CompressionRatio { name: String, ratio: u64, limit: u64 },

    #[error("duplicate entry '{}'", neutralize(.name))]
    DuplicateEntry { name: String },

    #[error(
        "entry path '{}' escapes target directory '{}'",
        neutralize_path(.entry),
        neutralize_path(.target)
    )]
    EscapesTarget { entry: PathBuf, target: PathBuf },

    #[error("entry '{}' expanded past {limit} bytes ({bytes} read)", neutralize(.name))]
    ExtractedSizeExceeded { name: String, bytes: u64, limit: u64 },

    #[error("archive expanded to {total} bytes, limit is {limit}")]
    TotalSizeExceeded { total: u64, limit: u64 },
}

impl SecurityError {
    /// Stable identifier for mapping failures to responses or metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TooManyEntries { .. } => "too_many_entries",
            Self::BlankEntryName => "blank_entry_name",
            Self::EntryNameTooLong { .. } => "entry_name_too_long",
            Self::InvalidEncoding { .. } => "invalid_encoding",
            Self::ControlCharacter { .. } => "control_character",
            Self::PathTraversal { .. } => "path_traversal",
            Self::AbsolutePath { .. } => "absolute_path",
            Self::EncodedTraversal { .. } => "encoded_traversal",
            Self::SymlinkEntry { .. } => "symlink_entry",
            Self::UnknownEntrySize { .. } => "unknown_entry_size",
            Self::EntryTooLarge { .. } => "entry_too_large",
            Self::CompressionRatio { .. } => "compression_ratio",
            Self::DuplicateEntry { .. } => "duplicate_entry",
            Self::EscapesTarget { .. } => "escapes_target",
            Self::ExtractedSizeExceeded { .. } => "extracted_size_exceeded",
            Self::TotalSizeExceeded { .. } => "total_size_exceeded",
        }
    }

    /// Raw name of the offending entry, when the failure concerns one.
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Self::EntryNameTooLong { name, .. }
            | Self::InvalidEncoding { name }
            | Self::ControlCharacter { name }
            | Self::PathTraversal { name }
            | Self::AbsolutePath { name }
            | Self::EncodedTraversal { name }
            | Self::SymlinkEntry { name }
            | Self::UnknownEntrySize { name }
            | Self::EntryTooLarge { name, .. }
            | Self::CompressionRatio { name, .. }
            | Self::DuplicateEntry { name }
            | Self::ExtractedSizeExceeded { name, .. } => Some(name.as_str()),
            Self::EscapesTarget { entry, .. } => entry.to_str(),
            Self::TooManyEntries { .. }
            | Self::BlankEntryName
            | Self::TotalSizeExceeded { .. } => None,
        }
    }

    /// Recover a failure raised inside a [`GuardedReader`](crate::GuardedReader).
    pub fn from_io(err: &io::Error) -> Option<&Self> {
        err.get_ref()?.downcast_ref::<Self>()
    }
}

impl From<SecurityError> for io::Error {
    fn from(e: SecurityError) -> Self {
        io::Error::other(e)
    }
}

pub type Result<T> = std::result::Result<T, SecurityError>;

/// Make an untrusted string safe to embed in a log line or response.
///
/// Control characters, quotes and bidi overrides are escaped, and the
/// result is capped at 128 characters.
pub fn neutralize(value: &str) -> String {
    let mut out = String::with_capacity(value.len().min(MAX_EXCERPT_CHARS));
    for (i, c) in value.chars().enumerate() {
        if i == MAX_EXCERPT_CHARS {
            out.push_str("[...]");
            break;
        }
        if c.is_control() || is_bidi_control(c) || c == '\'' || c == '"' {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}

fn neutralize_path(path: &Path) -> String {
    neutralize(&path.to_string_lossy())
}

fn is_bidi_control(c: char) -> bool {
    matches!(c, '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}')
}
