//! Lexical path handling that treats `/` and `\` alike on every platform.
//!
//! Uploaded names come from browsers and clients on any OS, so a name like
//! `C:\Users\admin\doc.txt` has to split the same way on a Linux server.

const SEPARATORS: [char; 2] = ['/', '\\'];

/// A path split into its root and normalized segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ParsedPath<'a> {
    /// Literal root text: `/`, `\`, `C:`, `C:\` or empty.
    pub root: &'a str,
    pub segments: Vec<&'a str>,
}

impl<'a> ParsedPath<'a> {
    /// Final segment, if any.
    pub fn file_name(&self) -> Option<&'a str> {
        self.segments.last().copied()
    }

    /// Render the normalized form, keeping the root verbatim.
    pub fn render(&self) -> String {
        let mut out = String::from(self.root);
        out.push_str(&self.segments.join("/"));
        out
    }
}

/// Parse `raw` lexically, resolving `.` and `name/..` pairs.
///
/// A `..` that has nothing left to cancel is kept so callers can see it.
/// Returns `None` when the input could never name a real file (embedded NUL).
pub(crate) fn parse(raw: &str) -> Option<ParsedPath<'_>> {
    if raw.contains('\0') {
        return None;
    }

    let (root, rest) = split_root(raw);
    let mut segments: Vec<&str> = Vec::new();

    for part in rest.split(SEPARATORS) {
        match part {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            part => segments.push(part),
        }
    }

    Some(ParsedPath { root, segments })
}

/// Normalize `raw`, returning `None` if it cannot be parsed.
pub(crate) fn normalize(raw: &str) -> Option<String> {
    parse(raw).map(|parsed| parsed.render())
}

fn split_root(raw: &str) -> (&str, &str) {
    let bytes = raw.as_bytes();
    let root_len = match bytes {
        [drive, b':', sep, ..] if drive.is_ascii_alphabetic() && is_separator(*sep) => 3,
        [drive, b':', ..] if drive.is_ascii_alphabetic() => 2,
        [sep, ..] if is_separator(*sep) => 1,
        _ => 0,
    };
    raw.split_at(root_len)
}

fn is_separator(b: u8) -> bool {
    b == b'/' || b == b'\\'
}
