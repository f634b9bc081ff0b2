//! Validation of untrusted archive entries before and during extraction.
//!
//! # Architecture
//!
//! - `validator.rs` - Per-entry and per-archive checks
//! - `session.rs` - Aggregate state owned by one extraction
//! - `stream.rs` - Byte-level guard for entry streams
//! - `entry.rs` - Library-independent entry metadata and adapters
//! - `format.rs` - Format detection
//! - `error.rs` - Security failures and log neutralization
//!
//! # Call sequence
//!
//! ```no_run
//! use std::io::Read;
//! use intake_archive::{ArchiveEntryMetadata, ArchiveEntryValidator};
//!
//! # fn entries() -> Vec<(ArchiveEntryMetadata, Box<dyn Read>)> { Vec::new() }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let validator = ArchiveEntryValidator::default();
//! let entries = entries();
//! let mut session = validator.begin(entries.len())?;
//!
//! for (meta, reader) in entries {
//!     validator.admit_entry(&meta, &mut session)?;
//!     let mut guarded = validator.guard_reader(reader, &meta.name, &mut session);
//!     std::io::copy(&mut guarded, &mut std::io::sink())?;
//! }
//! # Ok(())
//! # }
//! ```

pub use entry::{ArchiveEntryMetadata, EntryMetadataSource};
pub use error::{Result, SecurityError, neutralize};
pub use format::{ArchiveFormat, detect_format, detect_from_reader};
pub use session::ExtractionSession;
pub use stream::GuardedReader;
pub use validator::ArchiveEntryValidator;

pub use intake_config::Limits;

pub mod entry;
mod error;
mod format;
mod session;
mod stream;
mod validator;
