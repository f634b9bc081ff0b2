use std::io::{self, Read};

use crate::error::SecurityError;
use crate::session::ExtractionSession;
use crate::validator::ArchiveEntryValidator;

/// Reader adapter that enforces the per-entry and per-archive byte limits
/// on what an entry actually decompresses to.
///
/// Reads are capped so at most one byte past a limit is ever pulled from
/// the inner reader, and that byte is never handed to the caller. A
/// violation surfaces as an [`io::Error`] wrapping a [`SecurityError`];
/// use [`SecurityError::from_io`] to get it back.
#[derive(Debug)]
pub struct GuardedReader<'a, R> {
    inner: R,
    validator: &'a ArchiveEntryValidator,
    session: &'a mut ExtractionSession,
    name: String,
    streamed: u64,
}

impl<'a, R: Read> GuardedReader<'a, R> {
    pub fn new(
        inner: R,
        name: &str,
        validator: &'a ArchiveEntryValidator,
        session: &'a mut ExtractionSession,
    ) -> Self {
        Self {
            inner,
            validator,
            session,
            name: name.to_owned(),
            streamed: 0,
        }
    }

    /// Bytes produced by this entry so far.
    pub fn streamed(&self) -> u64 {
        self.streamed
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn check(&self) -> Result<(), SecurityError> {
        self.validator
            .validate_actual_extracted_size(self.streamed, &self.name)?;
        self.validator
            .validate_total_decompressed_size(self.session.cumulative_decompressed_bytes())
    }

    fn read_budget(&self) -> u64 {
        let limits = self.validator.limits();
        let entry_left = limits.max_entry_size.saturating_sub(self.streamed);
        let total_left = limits
            .max_total_size
            .saturating_sub(self.session.cumulative_decompressed_bytes());
        entry_left.min(total_left).saturating_add(1)
    }
}

impl<R: Read> Read for GuardedReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.check()?;

        let len = usize::try_from(self.read_budget())
            .map_or(buf.len(), |budget| budget.min(buf.len()));
        let n = self.inner.read(&mut buf[..len])?;

        self.streamed = self.streamed.saturating_add(n as u64);
        self.session.record_bytes(n as u64);
        self.check()?;

        Ok(n)
    }
}
