//! File path / file-URI conversion
//!
//! Build-file system identifiers travel as `file:` URIs. A `#` in a path
//! must be escaped to `%23` before the URI is handed to entity resolution
//! and unescaped again when the URI is turned back into a local path; the
//! two transforms round-trip exactly.

use std::path::{Path, PathBuf};

fn escape_component(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for ch in path.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '#' => out.push_str("%23"),
            ' ' => out.push_str("%20"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_component(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let bytes = escaped.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16)),
                bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16)),
            ) {
                out.push((hi * 16 + lo) as u8 as char);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

/// Convert a path to a `file:` URI, escaping reserved characters.
pub fn to_file_uri(path: &Path) -> String {
    let text = path.display().to_string().replace('\\', "/");
    let escaped = escape_component(&text);
    if escaped.starts_with('/') {
        format!("file://{escaped}")
    } else {
        format!("file:///{escaped}")
    }
}

/// Convert a `file:` URI back to a local path, unescaping reserved
/// characters. Returns `None` for non-file URIs.
pub fn from_file_uri(uri: &str) -> Option<PathBuf> {
    let rest = uri
        .strip_prefix("file://")
        .or_else(|| uri.strip_prefix("file:"))?;
    // "file:///absolute" leaves a leading slash in place; "file:///C:/x"
    // style authorities are not handled beyond stripping the empty host.
    Some(PathBuf::from(unescape_component(rest)))
}
