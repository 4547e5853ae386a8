//! Generators for test documents of known size.

use minihttp::ResourcePath;

const ASCII_PATTERN: &str = "<p>mesh</p> ";
const MULTIBYTE_PATTERN: &str = "<p>é€🦀</p> ";

/// HTML-like ASCII text of exactly `len` bytes.
///
/// The text needs no JSON escaping, so full chunks encode within the
/// envelope limit.
#[must_use]
pub fn ascii_document(len: usize) -> String {
    ASCII_PATTERN.chars().cycle().take(len).collect()
}

/// HTML-like text mixing 1-, 2-, 3- and 4-byte characters, at least
/// `min_len` bytes long.
#[must_use]
pub fn multibyte_document(min_len: usize) -> String {
    let mut document = String::with_capacity(min_len + MULTIBYTE_PATTERN.len());
    while document.len() < min_len {
        document.push_str(MULTIBYTE_PATTERN);
    }
    document
}

/// Parse a path literal used in tests.
///
/// # Panics
///
/// Panics if `value` is not a valid resource path.
#[must_use]
pub fn path(value: &str) -> ResourcePath {
    ResourcePath::new(value).unwrap_or_else(|error| panic!("invalid test path {value:?}: {error}"))
}
