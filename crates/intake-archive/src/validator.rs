use std::io::Read;
use std::path::{Component, Path, PathBuf};

use intake_config::Limits;
use tracing::warn;

use crate::entry::ArchiveEntryMetadata;
use crate::error::{Result, SecurityError, neutralize};
use crate::session::ExtractionSession;
use crate::stream::GuardedReader;

/// Percent-encoded forms of `..`, matched case-insensitively.
const ENCODED_TRAVERSAL: [&str; 2] = ["%2e%2e", "%252e"];

/// Security checks for archive entries.
///
/// Holds only limits, so one validator can serve any number of concurrent
/// extractions; per-archive state lives in [`ExtractionSession`].
///
/// Callers must run, per archive: [`validate_entry_count`] once, then per
/// entry [`validate_entry_name`], [`validate_entry_size`] and
/// [`validate_duplicate_entry`] before writing anything,
/// [`validate_actual_extracted_size`] while streaming and
/// [`validate_total_decompressed_size`] as the total grows.
/// [`begin`], [`admit_entry`] and [`guard_reader`] bundle that sequence.
///
/// [`validate_entry_count`]: Self::validate_entry_count
/// [`validate_entry_name`]: Self::validate_entry_name
/// [`validate_entry_size`]: Self::validate_entry_size
/// [`validate_duplicate_entry`]: Self::validate_duplicate_entry
/// [`validate_actual_extracted_size`]: Self::validate_actual_extracted_size
/// [`validate_total_decompressed_size`]: Self::validate_total_decompressed_size
/// [`begin`]: Self::begin
/// [`admit_entry`]: Self::admit_entry
/// [`guard_reader`]: Self::guard_reader
#[derive(Clone, Copy, Debug, Default)]
pub struct ArchiveEntryValidator {
    limits: Limits,
}

impl ArchiveEntryValidator {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn validate_entry_count(&self, count: usize) -> Result<()> {
        if count > self.limits.max_entry_count {
            return reject(SecurityError::TooManyEntries {
                count,
                limit: self.limits.max_entry_count,
            });
        }
        Ok(())
    }

    pub fn validate_entry_name(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return reject(SecurityError::BlankEntryName);
        }

        let length = name.chars().count();
        if length > self.limits.max_entry_name_length {
            return reject(SecurityError::EntryNameTooLong {
                name: name.to_owned(),
                length,
                limit: self.limits.max_entry_name_length,
            });
        }

        if name.chars().any(is_forbidden_control) {
            return reject(SecurityError::ControlCharacter {
                name: name.to_owned(),
            });
        }

        let Some(normalized) = normalize_entry_name(name) else {
            return reject(SecurityError::PathTraversal {
                name: name.to_owned(),
            });
        };

        if is_absolute_entry_name(name) {
            return reject(SecurityError::AbsolutePath {
                name: name.to_owned(),
            });
        }

        if normalized.contains("..") {
            return reject(SecurityError::PathTraversal {
                name: name.to_owned(),
            });
        }

        let lowered = normalized.to_ascii_lowercase();
        if ENCODED_TRAVERSAL.iter().any(|seq| lowered.contains(seq)) {
            return reject(SecurityError::EncodedTraversal {
                name: name.to_owned(),
            });
        }

        if name.contains("->") {
            return reject(SecurityError::SymlinkEntry {
                name: name.to_owned(),
            });
        }

        Ok(())
    }

    /// Early reject on declared sizes. Not a resource bound on its own:
    /// declared sizes can lie, see [`Self::validate_actual_extracted_size`].
    pub fn validate_entry_size(&self, meta: &ArchiveEntryMetadata) -> Result<()> {
        // Negative means unknown, which cannot be bounded upfront.
        let Ok(declared) = u64::try_from(meta.declared_uncompressed_size) else {
            return reject(SecurityError::UnknownEntrySize {
                name: meta.name.clone(),
            });
        };

        if declared > self.limits.max_entry_size {
            return reject(SecurityError::EntryTooLarge {
                name: meta.name.clone(),
                size: declared,
                limit: self.limits.max_entry_size,
            });
        }

        if let Ok(compressed) = u64::try_from(meta.declared_compressed_size) {
            if declared > 0 && compressed > 0 && compressed >= self.limits.ratio_check_threshold {
                let ratio = declared / compressed;
                if ratio > self.limits.max_compression_ratio {
                    return reject(SecurityError::CompressionRatio {
                        name: meta.name.clone(),
                        ratio,
                        limit: self.limits.max_compression_ratio,
                    });
                }
            }
        }

        Ok(())
    }

    /// Fails if `name` was already seen in this session, otherwise records it.
    ///
    /// Names are compared in normalized form, so `a/b`, `a//b` and `a\b`
    /// count as the same entry.
    pub fn validate_duplicate_entry(
        &self,
        name: &str,
        session: &mut ExtractionSession,
    ) -> Result<()> {
        let key = normalize_entry_name(name).unwrap_or_else(|| name.to_owned());
        if !session.record_name(&key) {
            return reject(SecurityError::DuplicateEntry {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    /// Check that `entry_path` stays inside `target_dir` and return the
    /// normalized destination.
    ///
    /// A relative `entry_path` is resolved against `target_dir`. The check
    /// is lexical and component-wise: `/srv/out-evil` is not inside `/srv/out`.
    /// A relative `target_dir` works too; `..` that climbs out of it is kept
    /// during normalization and rejected.
    pub fn validate_path_traversal(
        &self,
        entry_path: &Path,
        target_dir: &Path,
    ) -> Result<PathBuf> {
        let target = normalize_path(target_dir);
        let resolved = normalize_path(&target_dir.join(entry_path));

        let contained = resolved
            .strip_prefix(&target)
            .is_ok_and(|rest| !rest.components().any(|c| c == Component::ParentDir));
        if !contained {
            return reject(SecurityError::EscapesTarget {
                entry: entry_path.to_path_buf(),
                target: target_dir.to_path_buf(),
            });
        }
        Ok(resolved)
    }

    /// Authoritative per-entry bound, fed with the bytes actually streamed.
    pub fn validate_actual_extracted_size(&self, streamed_bytes: u64, name: &str) -> Result<()> {
        if streamed_bytes > self.limits.max_entry_size {
            return reject(SecurityError::ExtractedSizeExceeded {
                name: name.to_owned(),
                bytes: streamed_bytes,
                limit: self.limits.max_entry_size,
            });
        }
        Ok(())
    }

    pub fn validate_total_decompressed_size(&self, cumulative_bytes: u64) -> Result<()> {
        if cumulative_bytes > self.limits.max_total_size {
            return reject(SecurityError::TotalSizeExceeded {
                total: cumulative_bytes,
                limit: self.limits.max_total_size,
            });
        }
        Ok(())
    }

    /// Validate the archive's entry count and open a session for it.
    pub fn begin(&self, entry_count: usize) -> Result<ExtractionSession> {
        self.validate_entry_count(entry_count)?;
        Ok(ExtractionSession::new())
    }

    /// Run every pre-write check for one entry and count it.
    ///
    /// The count is re-checked here so streaming formats, whose entry
    /// count is unknown upfront, are bounded as well.
    pub fn admit_entry(
        &self,
        meta: &ArchiveEntryMetadata,
        session: &mut ExtractionSession,
    ) -> Result<()> {
        self.validate_entry_count(session.entry_count().saturating_add(1))?;
        self.validate_entry_name(&meta.name)?;
        self.validate_entry_size(meta)?;
        self.validate_duplicate_entry(&meta.name, session)?;
        session.record_entry();
        Ok(())
    }

    /// Add a finished entry's byte count to the session and check the total.
    ///
    /// Only for callers that count bytes themselves; a [`GuardedReader`]
    /// already adds its bytes to the session.
    pub fn finish_entry(&self, bytes: u64, session: &mut ExtractionSession) -> Result<u64> {
        let total = session.record_bytes(bytes);
        self.validate_total_decompressed_size(total)?;
        Ok(total)
    }

    /// Wrap an entry's byte stream so both size bounds hold while copying.
    pub fn guard_reader<'a, R: Read>(
        &'a self,
        reader: R,
        name: &str,
        session: &'a mut ExtractionSession,
    ) -> GuardedReader<'a, R> {
        GuardedReader::new(reader, name, self, session)
    }
}

fn reject<T>(err: SecurityError) -> Result<T> {
    let entry = err.entry_name().map(neutralize);
    warn!(kind = err.kind(), entry = entry.as_deref(), "{err}");
    Err(err)
}

fn is_forbidden_control(c: char) -> bool {
    c.is_control() && !matches!(c, '\n' | '\r' | '\t')
}

/// Treat `\` as `/` and drop empty and `.` components.
///
/// Returns `None` if any component is `..`.
fn normalize_entry_name(name: &str) -> Option<String> {
    let mut parts = Vec::new();
    for part in name.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => return None,
            part => parts.push(part),
        }
    }
    Some(parts.join("/"))
}

fn is_absolute_entry_name(name: &str) -> bool {
    match name.as_bytes() {
        [b'/' | b'\\', ..] => true,
        [drive, b':', ..] => drive.is_ascii_alphabetic(),
        _ => false,
    }
}

/// Resolve `.` and `..` lexically without touching the filesystem.
///
/// `..` at the root of an absolute path is dropped. On a relative path a
/// `..` with nothing left to pop is kept, so `../x` never becomes `x`.
fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                let last = result.components().next_back();
                match last {
                    Some(Component::Normal(_)) => {
                        result.pop();
                    }
                    Some(Component::RootDir | Component::Prefix(_)) => {}
                    _ => result.push(Component::ParentDir.as_os_str()),
                }
            }
            Component::Normal(part) => result.push(part),
            Component::RootDir => result.push(Component::RootDir.as_os_str()),
            Component::Prefix(prefix) => result.push(prefix.as_os_str()),
            Component::CurDir => {}
        }
    }

    result
}
