//! Validation limits shared by the filename sanitizer and the archive entry validator.
//!
//! Limits come from three layers, later layers winning:
//!
//! 1. Built-in defaults ([`Limits::default`])
//! 2. An optional TOML file
//! 3. `INTAKE_`-prefixed environment variables (`INTAKE_MAX_ENTRY_SIZE=1048576`)

pub use error::{Error, Result};
pub use limits::{ENV_PREFIX, Limits};

mod error;
mod limits;
