//! Filename sanitization for files arriving from untrusted sources.
//!
//! # Architecture
//!
//! - `path.rs` - Lexical, platform-independent path parsing
//! - `sanitize.rs` - The sanitization pipeline
//!
//! Sanitization never fails. Inputs that cannot be reduced to a usable name
//! become [`FALLBACK_FILENAME`].

pub use sanitize::{FALLBACK_FILENAME, FilenameSanitizer, sanitize};

mod path;
mod sanitize;
