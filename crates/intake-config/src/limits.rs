use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Prefix of the environment variables that override individual limits.
pub const ENV_PREFIX: &str = "INTAKE_";

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Bounds applied to untrusted filenames and archive contents.
///
/// Every field can be overridden from a TOML file or from the environment,
/// e.g. `INTAKE_MAX_TOTAL_SIZE=2147483648`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Longest sanitized filename, in characters.
    pub max_filename_length: usize,
    /// Longest extension preserved when a filename has to be truncated.
    /// Longer extensions are cut together with the rest of the name.
    pub max_extension_length: usize,
    /// Longest archive entry name accepted, in characters.
    pub max_entry_name_length: usize,
    /// Largest single entry, checked against both declared and streamed bytes.
    pub max_entry_size: u64,
    /// Largest cumulative decompressed size of one archive.
    pub max_total_size: u64,
    /// Most entries one archive may contain.
    pub max_entry_count: usize,
    /// Highest tolerated `declared / compressed` ratio.
    pub max_compression_ratio: u64,
    /// Compressed size from which the ratio check applies. Tiny entries
    /// compress unpredictably and are bounded by the size caps instead.
    pub ratio_check_threshold: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_filename_length: 200,
            max_extension_length: 10,
            max_entry_name_length: 4096,
            max_entry_size: 512 * MIB,
            max_total_size: GIB,
            max_entry_count: 10_000,
            max_compression_ratio: 100,
            ratio_check_threshold: 1_000,
        }
    }
}

impl Limits {
    /// Load limits from defaults, an optional TOML file and the environment.
    ///
    /// A missing file is not an error; figment treats it as an empty layer.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let limits: Self = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
        limits.validate()?;
        Ok(limits)
    }

    /// Load limits from defaults and the environment only.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Reject combinations that would make the validators meaningless.
    pub fn validate(&self) -> Result<()> {
        let non_zero = [
            ("max_filename_length", self.max_filename_length as u64),
            ("max_entry_name_length", self.max_entry_name_length as u64),
            ("max_entry_size", self.max_entry_size),
            ("max_total_size", self.max_total_size),
            ("max_entry_count", self.max_entry_count as u64),
            ("max_compression_ratio", self.max_compression_ratio),
        ];
        for (field, value) in non_zero {
            if value == 0 {
                return Err(Error::InvalidLimit {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        // base + '.' + extension must still leave room for a one-char base.
        if self.max_extension_length.saturating_add(2) > self.max_filename_length {
            return Err(Error::InvalidLimit {
                field: "max_extension_length",
                reason: format!(
                    "{} leaves no room for a base name within max_filename_length {}",
                    self.max_extension_length, self.max_filename_length
                ),
            });
        }

        if self.max_entry_size > self.max_total_size {
            return Err(Error::InvalidLimit {
                field: "max_entry_size",
                reason: format!(
                    "{} exceeds max_total_size {}",
                    self.max_entry_size, self.max_total_size
                ),
            });
        }

        Ok(())
    }

    pub fn max_filename_length(mut self, n: usize) -> Self {
        self.max_filename_length = n;
        self
    }

    pub fn max_extension_length(mut self, n: usize) -> Self {
        self.max_extension_length = n;
        self
    }

    pub fn max_entry_name_length(mut self, n: usize) -> Self {
        self.max_entry_name_length = n;
        self
    }

    pub fn max_entry_size(mut self, bytes: u64) -> Self {
        self.max_entry_size = bytes;
        self
    }

    pub fn max_total_size(mut self, bytes: u64) -> Self {
        self.max_total_size = bytes;
        self
    }

    pub fn max_entry_count(mut self, n: usize) -> Self {
        self.max_entry_count = n;
        self
    }

    pub fn max_compression_ratio(mut self, ratio: u64) -> Self {
        self.max_compression_ratio = ratio;
        self
    }

    pub fn ratio_check_threshold(mut self, bytes: u64) -> Self {
        self.ratio_check_threshold = bytes;
        self
    }
}
