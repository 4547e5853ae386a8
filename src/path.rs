//! Resource identifiers carried in every envelope.
//!
//! [`ResourcePath`] only enforces the structural rules (non-empty, leading
//! `/`, printable). The 12-byte wire budget is checked by the codec and the
//! fragmenter so that an over-budget path is reported where it would be
//! transmitted.

use std::fmt;

use thiserror::Error;

/// Default path requested when the caller supplies none.
pub const DEFAULT_PATH: &str = "/index.html";

/// Reasons a string cannot be used as a [`ResourcePath`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// The path was empty.
    #[error("resource path is empty")]
    Empty,
    /// The path did not begin with `/`.
    #[error("resource path must start with '/': {0:?}")]
    MissingLeadingSlash(String),
    /// The path contained a control character.
    #[error("resource path contains a non-printable character: {0:?}")]
    NotPrintable(String),
}

/// Identifier of a content resource, such as `/index.html`.
///
/// # Examples
///
/// ```
/// use minihttp::ResourcePath;
///
/// let path = ResourcePath::new("/index.html").expect("valid path");
/// assert_eq!(path.as_str(), "/index.html");
/// assert!(ResourcePath::new("index.html").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourcePath(String);

impl ResourcePath {
    /// Validate and wrap `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if the path is empty, lacks the leading `/`, or
    /// contains control characters.
    pub fn new(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        if !path.starts_with('/') {
            return Err(PathError::MissingLeadingSlash(path));
        }
        if path.chars().any(char::is_control) {
            return Err(PathError::NotPrintable(path));
        }
        Ok(Self(path))
    }

    /// Normalise user input into a request path.
    ///
    /// Surrounding whitespace is trimmed, empty input falls back to
    /// `default`, and a missing leading `/` is added.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if the normalised path is still invalid.
    pub fn normalize(input: &str, default: &str) -> Result<Self, PathError> {
        let trimmed = input.trim();
        let trimmed = if trimmed.is_empty() {
            default.trim()
        } else {
            trimmed
        };
        if trimmed.starts_with('/') {
            Self::new(trimmed)
        } else {
            Self::new(format!("/{trimmed}"))
        }
    }

    /// The root path `/`.
    #[must_use]
    pub fn root() -> Self { Self("/".to_owned()) }

    /// Borrow the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }

    /// Number of bytes the path occupies on the wire.
    #[must_use]
    pub fn encoded_len(&self) -> usize { self.0.len() }

    /// Final path segment, used to name downloaded files.
    ///
    /// Returns `None` for directory-like paths such as `/` or `/docs/`.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.0.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl AsRef<str> for ResourcePath {
    fn as_ref(&self) -> &str { &self.0 }
}

impl TryFrom<&str> for ResourcePath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> { Self::new(value) }
}

impl TryFrom<String> for ResourcePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}
