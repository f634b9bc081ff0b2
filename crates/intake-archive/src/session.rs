use std::collections::HashSet;

/// Aggregate state of one archive extraction.
///
/// Create one per archive and drop it when that extraction ends. Counters
/// only grow; there is no way to reset or share a session, so it cannot
/// carry state over from an unrelated archive.
#[derive(Debug, Default)]
pub struct ExtractionSession {
    entry_count: usize,
    seen_names: HashSet<String>,
    cumulative_decompressed_bytes: u64,
}

impl ExtractionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries admitted so far.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Bytes streamed out of all entries so far.
    pub fn cumulative_decompressed_bytes(&self) -> u64 {
        self.cumulative_decompressed_bytes
    }

    pub fn has_seen(&self, name: &str) -> bool {
        self.seen_names.contains(name)
    }

    pub fn record_entry(&mut self) -> usize {
        self.entry_count = self.entry_count.saturating_add(1);
        self.entry_count
    }

    /// Returns `false` if `name` was already recorded.
    pub fn record_name(&mut self, name: &str) -> bool {
        if self.seen_names.contains(name) {
            return false;
        }
        self.seen_names.insert(name.to_owned())
    }

    pub fn record_bytes(&mut self, bytes: u64) -> u64 {
        self.cumulative_decompressed_bytes =
            self.cumulative_decompressed_bytes.saturating_add(bytes);
        self.cumulative_decompressed_bytes
    }
}
