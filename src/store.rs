//! Read-only lookup of resource content by path.
//!
//! The server reads a snapshot of the content once per request; later
//! changes to the store never affect a transfer already being emitted.

use std::{
    io,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use log::debug;
use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::ResourcePath;

/// File served for directory-like paths.
const INDEX_FILE: &str = "index.html";
/// Prefix stripped from request paths before resolving them on disk.
const HTML_PREFIX: &str = "/html/";

/// Errors raised by a [`ContentStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No resource exists at the path.
    #[error("resource not found: {0}")]
    NotFound(ResourcePath),
    /// The path cannot be resolved safely.
    #[error("invalid resource path {path}: {reason}")]
    InvalidPath {
        /// Offending path.
        path: ResourcePath,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// Reading the resource failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Resource being read.
        path: ResourcePath,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Source of resource content.
#[async_trait]
pub trait ContentStore: Send + Sync + 'static {
    /// Read the full content stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when nothing exists at `path`, and
    /// other variants when the lookup itself fails.
    async fn read(&self, path: &ResourcePath) -> Result<Bytes, StoreError>;
}

#[async_trait]
impl<S: ContentStore + ?Sized> ContentStore for Arc<S> {
    async fn read(&self, path: &ResourcePath) -> Result<Bytes, StoreError> {
        (**self).read(path).await
    }
}

/// In-memory store keyed by exact path.
///
/// Clones share the same map. Content is held as [`Bytes`], so a read hands
/// out a snapshot that later inserts cannot change.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<ResourcePath, Bytes>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Store `content` at `path`, replacing any previous value.
    pub fn insert(&self, path: ResourcePath, content: impl Into<Bytes>) {
        self.entries.insert(path, content.into());
    }

    /// Remove the content at `path`.
    pub fn remove(&self, path: &ResourcePath) -> Option<Bytes> {
        self.entries.remove(path).map(|(_, content)| content)
    }

    /// Number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl<P: Into<Bytes>> FromIterator<(ResourcePath, P)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (ResourcePath, P)>>(iter: I) -> Self {
        let store = Self::new();
        for (path, content) in iter {
            store.insert(path, content);
        }
        store
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn read(&self, path: &ResourcePath) -> Result<Bytes, StoreError> {
        self.entries
            .get(path)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(path.clone()))
    }
}

/// Serves files below a root directory.
///
/// Resolution rules:
/// - the path is percent-decoded first;
/// - a leading `/html/` is stripped, otherwise the leading `/`;
/// - `/` and paths ending in `/` resolve to `index.html` in that directory;
/// - `..`, absolute and prefix components are rejected;
/// - a missing file whose name has no extension is retried with `.html`.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Serve files below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    /// Directory content is served from.
    #[must_use]
    pub fn root(&self) -> &Path { &self.root }

    /// Map a request path to a file below the root.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] if the path would escape the root.
    pub fn resolve(&self, path: &ResourcePath) -> Result<PathBuf, StoreError> {
        let decoded = percent_decode_str(path.as_str()).decode_utf8_lossy();
        let raw = decoded.as_ref();
        let relative = raw
            .strip_prefix(HTML_PREFIX)
            .unwrap_or_else(|| raw.trim_start_matches('/'));
        let relative = if relative.is_empty() || relative.ends_with('/') {
            format!("{relative}{INDEX_FILE}")
        } else {
            relative.to_owned()
        };

        let relative = Path::new(&relative);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(StoreError::InvalidPath {
                        path: path.clone(),
                        reason: "parent directory components are not allowed",
                    });
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(StoreError::InvalidPath {
                        path: path.clone(),
                        reason: "absolute paths are not allowed",
                    });
                }
            }
        }
        Ok(self.root.join(relative))
    }

    async fn read_file(path: &ResourcePath, file: &Path) -> Result<Option<Bytes>, StoreError> {
        match tokio::fs::read(file).await {
            Ok(content) => Ok(Some(Bytes::from(content))),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                path: path.clone(),
                source,
            }),
        }
    }
}

#[async_trait]
impl ContentStore for DirectoryStore {
    async fn read(&self, path: &ResourcePath) -> Result<Bytes, StoreError> {
        let file = self.resolve(path)?;
        if let Some(content) = Self::read_file(path, &file).await? {
            debug!("resolved {path} to {}", file.display());
            return Ok(content);
        }
        if file.extension().is_none() {
            let fallback = file.with_extension("html");
            if let Some(content) = Self::read_file(path, &fallback).await? {
                debug!("resolved {path} to {} via .html fallback", fallback.display());
                return Ok(content);
            }
        }
        Err(StoreError::NotFound(path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use rstest::rstest;

    use super::{ContentStore, DirectoryStore, MemoryStore, StoreError};
    use crate::ResourcePath;

    fn path(value: &str) -> ResourcePath { ResourcePath::new(value).expect("valid path") }

    #[rstest]
    #[case("/", "index.html")]
    #[case("/index.html", "index.html")]
    #[case("/html/a.html", "a.html")]
    #[case("/docs/", "docs/index.html")]
    #[case("/html/", "index.html")]
    #[case("/./b.html", "b.html")]
    #[case("/a%20b.html", "a b.html")]
    #[case("/html%2Fc", "c")]
    fn directory_store_resolves_relative_to_root(#[case] request: &str, #[case] expected: &str) {
        let store = DirectoryStore::new("/srv/www");
        let resolved = store.resolve(&path(request)).expect("resolve");
        assert_eq!(resolved, PathBuf::from("/srv/www").join(expected));
    }

    #[rstest]
    #[case("/../etc/pwd")]
    #[case("/a/../../b")]
    #[case("/html//etc")]
    #[case("/%2e%2e/x")]
    #[case("/a/%2E%2E/%2E%2E/b")]
    fn directory_store_rejects_escaping_paths(#[case] request: &str) {
        let store = DirectoryStore::new("/srv/www");
        assert!(matches!(
            store.resolve(&path(request)),
            Err(StoreError::InvalidPath { .. })
        ));
    }

    #[tokio::test]
    async fn memory_store_reads_snapshot() {
        let store = MemoryStore::new();
        store.insert(path("/a.html"), "first");
        let snapshot = store.read(&path("/a.html")).await.expect("read");
        store.insert(path("/a.html"), "second");

        assert_eq!(&snapshot[..], b"first");
        assert_eq!(&store.read(&path("/a.html")).await.expect("read")[..], b"second");
    }

    #[tokio::test]
    async fn memory_store_reports_missing_path() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.read(&path("/nope")).await,
            Err(StoreError::NotFound(missing)) if missing == path("/nope")
        ));
    }
}
