use intake_config::Limits;
use tracing::debug;

use crate::path;

/// Returned whenever an input cannot be reduced to a usable name.
pub const FALLBACK_FILENAME: &str = "unnamed_file";

/// Longest input still considered a plausible filesystem path.
const MAX_PATH_INPUT: usize = 4096;

/// Characters that never appear in a legitimate path but do in injection payloads.
const SHELL_METACHARACTERS: [char; 7] = [';', '<', '>', '|', '&', '$', '`'];

/// How an input is treated before character filtering.
#[derive(Debug, PartialEq, Eq)]
enum Classification<'a> {
    /// A real path; only its final segment is kept.
    Path(Option<&'a str>),
    /// Adversarial input; traversal and separators are stripped wholesale.
    Malicious,
}

/// Turns untrusted filenames into names safe to store, list or use as a key.
///
/// The output is never empty, at most `max_filename_length` characters, made of
/// `[a-zA-Z0-9._-]` only, free of `..` and never a hidden (leading-dot) file.
#[derive(Clone, Copy, Debug)]
pub struct FilenameSanitizer {
    max_length: usize,
    max_extension_length: usize,
}

impl Default for FilenameSanitizer {
    fn default() -> Self {
        Self::new(&Limits::default())
    }
}

impl FilenameSanitizer {
    pub fn new(limits: &Limits) -> Self {
        Self {
            max_length: limits.max_filename_length,
            max_extension_length: limits.max_extension_length,
        }
    }

    /// Sanitize `raw`. Never fails; falls back to [`FALLBACK_FILENAME`].
    pub fn sanitize(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return FALLBACK_FILENAME.to_string();
        }

        let flattened = match classify(raw) {
            Classification::Path(Some(name)) if !name.trim().is_empty() => name.to_string(),
            Classification::Path(_) => {
                debug!(input_len = raw.len(), "filename has no final segment");
                return FALLBACK_FILENAME.to_string();
            }
            Classification::Malicious => {
                debug!(input_len = raw.len(), "filename treated as malicious pattern");
                flatten(raw)
            }
        };

        let normalized = path::normalize(&flattened).unwrap_or(flattened);
        let visible = unhide(normalized);
        let filtered = whitelist(&visible);
        let collapsed = collapse_dots(filtered);
        // Cutting the base can butt a trailing dot against the extension dot.
        let result = collapse_dots(self.truncate(collapsed));

        if is_unusable(&result) {
            debug!(input_len = raw.len(), "filename reduced to nothing usable");
            return FALLBACK_FILENAME.to_string();
        }
        result
    }

    /// Sanitize an optional name, treating `None` like a blank one.
    pub fn sanitize_option(&self, raw: Option<&str>) -> String {
        raw.map_or_else(|| FALLBACK_FILENAME.to_string(), |raw| self.sanitize(raw))
    }

    /// Fit `name` into `max_length`, keeping a short extension intact.
    ///
    /// Only ever called on whitelisted (ASCII) names, so byte offsets are char offsets.
    fn truncate(&self, name: String) -> String {
        if name.len() <= self.max_length {
            return name;
        }

        match name.rsplit_once('.') {
            Some((base, ext)) if !ext.is_empty() && ext.len() <= self.max_extension_length => {
                let keep = self
                    .max_length
                    .saturating_sub(ext.len() + 1)
                    .min(base.len());
                format!("{}.{}", &base[..keep], ext)
            }
            _ => name[..self.max_length].to_string(),
        }
    }
}

/// Sanitize `raw` with the default limits.
///
/// ```
/// use intake_filename::sanitize;
///
/// assert_eq!(sanitize("report.pdf"), "report.pdf");
/// assert_eq!(sanitize("C:\\Users\\admin\\doc.txt"), "doc.txt");
/// assert!(sanitize(".htaccess").starts_with('_'));
/// ```
pub fn sanitize(raw: &str) -> String {
    FilenameSanitizer::default().sanitize(raw)
}

fn classify(raw: &str) -> Classification<'_> {
    if raw.chars().count() > MAX_PATH_INPUT || raw.contains(SHELL_METACHARACTERS) {
        return Classification::Malicious;
    }

    match path::parse(raw) {
        Some(parsed) if !parsed.render().contains("..") => {
            Classification::Path(parsed.file_name())
        }
        _ => Classification::Malicious,
    }
}

/// Drop traversal sequences and separators, leaving a single segment.
fn flatten(raw: &str) -> String {
    raw.replace("..", "").replace(['/', '\\'], "")
}

/// Rewrite a leading-dot name so it is no longer a hidden file.
///
/// `.sh` looks like a bare extension and becomes `_.sh`; `.htaccess`
/// becomes `_htaccess`; a name of only dots becomes `_`.
fn unhide(name: String) -> String {
    if !name.starts_with('.') {
        return name;
    }

    let stripped = name.trim_start_matches('.');
    let len = stripped.chars().count();
    if stripped.is_empty() {
        "_".to_string()
    } else if (2..=5).contains(&len) && stripped.chars().all(|c| c.is_ascii_alphanumeric()) {
        format!("_.{stripped}")
    } else {
        format!("_{stripped}")
    }
}

fn whitelist(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn collapse_dots(mut name: String) -> String {
    while name.contains("..") {
        name = name.replace("..", ".");
    }
    name
}

fn is_unusable(name: &str) -> bool {
    name.trim().is_empty()
        || name == "."
        || name.starts_with('.')
        || name.chars().all(|c| c == '_')
}
