//! Protocol messages exchanged over the transport.
//!
//! A [`Message`] is either a [`Request`] (`GET`), a content [`Fragment`]
//! (`RESP` with `1 <= frag <= of_frag`), or an [`ErrorResponse`] (`RESP` with
//! both counters zero). See [`crate::codec`] for the wire representation.

use std::fmt;

use crate::{
    ResourcePath,
    codec::{self, CodecError},
    fragment::FragmentIndex,
};

/// A `GET` for a resource, optionally narrowed to a single fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Resource being requested.
    pub path: ResourcePath,
    /// When set, only this fragment of the transfer is wanted.
    pub fragment: Option<FragmentIndex>,
}

impl Request {
    /// Request the whole resource at `path`.
    #[must_use]
    pub fn new(path: ResourcePath) -> Self {
        Self {
            path,
            fragment: None,
        }
    }

    /// Request a single fragment of the resource at `path`.
    #[must_use]
    pub fn single(path: ResourcePath, fragment: FragmentIndex) -> Self {
        Self {
            path,
            fragment: Some(fragment),
        }
    }
}

/// One content chunk of a transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    /// Resource the chunk belongs to.
    pub path: ResourcePath,
    /// One-based position within the transfer.
    pub seq: FragmentIndex,
    /// Number of fragments in the transfer.
    pub total: FragmentIndex,
    /// Chunk of the resource content.
    pub data: String,
}

impl Fragment {
    /// Whether this is the final fragment of its transfer.
    #[must_use]
    pub fn is_last(&self) -> bool { self.seq == self.total }
}

/// Outcome codes carried by an [`ErrorResponse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// The request path was rejected by the content store.
    BadRequest,
    /// No resource exists at the path.
    NotFound,
    /// The resource exceeds the 99-fragment ceiling.
    ContentTooLarge,
    /// The server could not read or encode the resource.
    InternalError,
}

impl Status {
    /// Numeric code placed in front of the reason text.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::ContentTooLarge => 413,
            Self::InternalError => 500,
        }
    }

    /// Map a numeric code back to a status.
    #[must_use]
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            400 => Some(Self::BadRequest),
            404 => Some(Self::NotFound),
            413 => Some(Self::ContentTooLarge),
            500 => Some(Self::InternalError),
            _ => None,
        }
    }

    /// Short label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::NotFound => "not_found",
            Self::ContentTooLarge => "content_too_large",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.code()) }
}

/// Bounded failure reply telling the client to stop waiting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Path of the failed request.
    pub path: ResourcePath,
    /// Failure category.
    pub status: Status,
    /// Human-readable detail.
    pub reason: String,
}

impl ErrorResponse {
    /// Construct a failure reply for `path`.
    #[must_use]
    pub fn new(path: ResourcePath, status: Status, reason: impl Into<String>) -> Self {
        Self {
            path,
            status,
            reason: reason.into(),
        }
    }

    /// Text placed in the envelope's `data` field, e.g. `404: not found`.
    #[must_use]
    pub fn data(&self) -> String { format!("{}: {}", self.status.code(), self.reason) }
}

/// Atomic unit exchanged over the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// A `GET` request.
    Request(Request),
    /// A content fragment.
    Fragment(Fragment),
    /// A failure reply.
    Error(ErrorResponse),
}

impl Message {
    /// Path the message refers to.
    #[must_use]
    pub fn path(&self) -> &ResourcePath {
        match self {
            Self::Request(request) => &request.path,
            Self::Fragment(fragment) => &fragment.path,
            Self::Error(response) => &response.path,
        }
    }

    /// Encode the message into wire bytes.
    ///
    /// # Errors
    ///
    /// See [`codec::encode`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> { codec::encode(self) }

    /// Decode a message from wire bytes.
    ///
    /// # Errors
    ///
    /// See [`codec::decode`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> { codec::decode(bytes) }
}

impl From<Request> for Message {
    fn from(value: Request) -> Self { Self::Request(value) }
}

impl From<Fragment> for Message {
    fn from(value: Fragment) -> Self { Self::Fragment(value) }
}

impl From<ErrorResponse> for Message {
    fn from(value: ErrorResponse) -> Self { Self::Error(value) }
}
